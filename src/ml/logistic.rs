//! Multinomial logistic regression over sparse features.
//!
//! The model minimizes the class-weighted mean cross-entropy plus an L2
//! penalty on the weights (intercepts are not penalized):
//!
//! ```text
//! f(W, b) = (1/n) * sum_i s_i * CE(softmax(W x_i + b), y_i) + ||W||^2 / (2 * C * n)
//! ```
//!
//! where `s_i` is the weight of the class of example `i`. With
//! [`ClassWeight::Balanced`] a class seen `n_c` times among `k` classes gets
//! weight `n / (k * n_c)`, so rare levels count as much as common ones.
//! The objective is minimized with L-BFGS and a backtracking line search.

use std::collections::VecDeque;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{LugatError, Result};
use crate::level::CefrLevel;
use crate::ml::tfidf::SparseVector;

/// Per-class weighting of the loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassWeight {
    /// Weights inversely proportional to class frequency.
    #[default]
    Balanced,
    /// Every example counts once.
    None,
}

/// Solver hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionParams {
    /// Inverse L2 regularization strength.
    pub c: f64,
    /// Maximum number of L-BFGS iterations.
    pub max_iter: usize,
    /// Convergence threshold on the largest absolute gradient component.
    pub tolerance: f64,
    pub class_weight: ClassWeight,
    /// Number of correction pairs kept by L-BFGS.
    pub history_size: usize,
}

impl Default for LogisticRegressionParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 4000,
            tolerance: 1e-4,
            class_weight: ClassWeight::Balanced,
            history_size: 10,
        }
    }
}

/// Outcome of a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub iterations: usize,
    pub converged: bool,
    pub final_loss: f64,
    /// Largest absolute gradient component at the solution.
    pub gradient_max: f64,
    /// Weight applied to each class, in class order.
    pub class_weights: Vec<(CefrLevel, f64)>,
}

/// Fitted multinomial logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    /// Classes seen during fitting, ascending.
    classes: Vec<CefrLevel>,
    n_features: usize,
    /// Row-major `classes x n_features` weight matrix.
    weights: Vec<f64>,
    intercepts: Vec<f64>,
}

/// Relative decrease of the objective below which progress has stalled.
const STALL_TOLERANCE: f64 = 64.0 * f64::EPSILON;
/// Sufficient decrease constant of the Armijo condition.
const ARMIJO: f64 = 1e-4;
const MIN_STEP: f64 = 1e-20;

/// Training problem: features, class indices and per-example weights.
struct Problem<'a> {
    x: &'a [SparseVector],
    y: Vec<usize>,
    sample_weight: Vec<f64>,
    n_classes: usize,
    n_features: usize,
    l2: f64,
}

impl Problem<'_> {
    fn n_params(&self) -> usize {
        self.n_classes * (self.n_features + 1)
    }

    /// Objective value and gradient at `theta`.
    fn evaluate(&self, theta: &[f64]) -> (f64, Vec<f64>) {
        let k = self.n_classes;
        let d = self.n_features;
        let (weights, intercepts) = theta.split_at(k * d);
        let n = self.x.len() as f64;

        let per_example: Vec<(f64, Vec<f64>)> = self
            .x
            .par_iter()
            .enumerate()
            .map(|(i, xi)| {
                let z = scores(weights, intercepts, d, xi);
                let (log_norm, mut probs) = log_softmax_probs(&z);
                let s = self.sample_weight[i];
                let loss = s * (log_norm - z[self.y[i]]);
                probs[self.y[i]] -= 1.0;
                for p in &mut probs {
                    *p *= s;
                }
                (loss, probs)
            })
            .collect();

        let mut loss = 0.0;
        let mut grad = vec![0.0; theta.len()];
        for (xi, (example_loss, residual)) in self.x.iter().zip(&per_example) {
            loss += example_loss;
            for (c, r) in residual.iter().enumerate() {
                if *r == 0.0 {
                    continue;
                }
                let row = &mut grad[c * d..(c + 1) * d];
                for (j, v) in xi.iter() {
                    row[j] += r * v;
                }
                grad[k * d + c] += r;
            }
        }

        loss /= n;
        for g in &mut grad {
            *g /= n;
        }

        let mut penalty = 0.0;
        for (g, w) in grad[..k * d].iter_mut().zip(weights) {
            *g += self.l2 * w;
            penalty += w * w;
        }
        loss += 0.5 * self.l2 * penalty;

        (loss, grad)
    }
}

fn scores(weights: &[f64], intercepts: &[f64], d: usize, x: &SparseVector) -> Vec<f64> {
    intercepts
        .iter()
        .enumerate()
        .map(|(c, b)| b + x.dot(&weights[c * d..(c + 1) * d]))
        .collect()
}

/// Log of the softmax normalizer and the softmax probabilities.
fn log_softmax_probs(scores: &[f64]) -> (f64, Vec<f64>) {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    let probs = exps.iter().map(|e| e / sum).collect();
    (max + sum.ln(), probs)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

/// L-BFGS two-loop recursion: returns `-H * grad`.
fn lbfgs_direction(grad: &[f64], history: &VecDeque<(Vec<f64>, Vec<f64>, f64)>) -> Vec<f64> {
    let mut q = grad.to_vec();
    let mut alphas = Vec::with_capacity(history.len());

    for (s, y, rho) in history.iter().rev() {
        let alpha = rho * dot(s, &q);
        for (qi, yi) in q.iter_mut().zip(y) {
            *qi -= alpha * yi;
        }
        alphas.push(alpha);
    }

    let gamma = match history.back() {
        Some((s, y, _)) => dot(s, y) / dot(y, y),
        None => 1.0,
    };
    for qi in &mut q {
        *qi *= gamma;
    }

    for ((s, y, rho), alpha) in history.iter().zip(alphas.iter().rev()) {
        let beta = rho * dot(y, &q);
        for (qi, si) in q.iter_mut().zip(s) {
            *qi += (alpha - beta) * si;
        }
    }

    for qi in &mut q {
        *qi = -*qi;
    }
    q
}

impl SoftmaxRegression {
    /// Fit on feature vectors `x` with labels `y`.
    ///
    /// The classes of the model are the distinct levels of `y`; at least two
    /// are required.
    pub fn fit(
        x: &[SparseVector],
        y: &[CefrLevel],
        n_features: usize,
        params: &LogisticRegressionParams,
    ) -> Result<(Self, FitSummary)> {
        if x.len() != y.len() {
            return Err(LugatError::other(format!(
                "feature/label length mismatch: {} vs {}",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(LugatError::EmptyDataset);
        }
        if params.c <= 0.0 {
            return Err(LugatError::invalid_config("C must be positive"));
        }

        let mut classes: Vec<CefrLevel> = y.to_vec();
        classes.sort();
        classes.dedup();
        if classes.len() < 2 {
            return Err(LugatError::TooFewClasses {
                found: classes.len(),
            });
        }

        let class_index = |level: &CefrLevel| classes.iter().position(|c| c == level);
        let y_idx: Vec<usize> = y.iter().filter_map(class_index).collect();

        let n = x.len() as f64;
        let k = classes.len();
        let mut counts = vec![0usize; k];
        for &c in &y_idx {
            counts[c] += 1;
        }
        let per_class: Vec<f64> = match params.class_weight {
            ClassWeight::Balanced => counts
                .iter()
                .map(|&count| n / (k as f64 * count as f64))
                .collect(),
            ClassWeight::None => vec![1.0; k],
        };

        let problem = Problem {
            x,
            sample_weight: y_idx.iter().map(|&c| per_class[c]).collect(),
            y: y_idx,
            n_classes: k,
            n_features,
            l2: 1.0 / (params.c * n),
        };

        let (theta, iterations, converged, final_loss, gradient_max) =
            Self::minimize(&problem, params);

        if converged {
            info!("Solver converged after {iterations} iterations (loss {final_loss:.6})");
        } else {
            warn!(
                "Solver stopped after {iterations} iterations without converging \
                 (max |gradient| {gradient_max:.3e}, tolerance {:.1e})",
                params.tolerance
            );
        }

        let (weights, intercepts) = theta.split_at(k * n_features);
        let model = SoftmaxRegression {
            classes: classes.clone(),
            n_features,
            weights: weights.to_vec(),
            intercepts: intercepts.to_vec(),
        };
        let summary = FitSummary {
            iterations,
            converged,
            final_loss,
            gradient_max,
            class_weights: classes.into_iter().zip(per_class).collect(),
        };

        Ok((model, summary))
    }

    /// Run L-BFGS from zero. Returns (theta, iterations, converged, loss, max |grad|).
    fn minimize(
        problem: &Problem<'_>,
        params: &LogisticRegressionParams,
    ) -> (Vec<f64>, usize, bool, f64, f64) {
        let mut theta = vec![0.0; problem.n_params()];
        let (mut loss, mut grad) = problem.evaluate(&theta);
        let mut history: VecDeque<(Vec<f64>, Vec<f64>, f64)> = VecDeque::new();
        let mut iterations = 0;

        while iterations < params.max_iter {
            if max_abs(&grad) < params.tolerance {
                return (theta, iterations, true, loss, max_abs(&grad));
            }
            iterations += 1;

            let mut direction = lbfgs_direction(&grad, &history);
            let mut slope = dot(&grad, &direction);
            if slope >= 0.0 {
                history.clear();
                direction = grad.iter().map(|g| -g).collect();
                slope = -dot(&grad, &grad);
            }

            let mut step = if history.is_empty() {
                (1.0 / dot(&grad, &grad).sqrt()).min(1.0)
            } else {
                1.0
            };

            let (next_theta, next_loss, next_grad) = loop {
                let candidate: Vec<f64> = theta
                    .iter()
                    .zip(&direction)
                    .map(|(t, d)| t + step * d)
                    .collect();
                let (candidate_loss, candidate_grad) = problem.evaluate(&candidate);
                if candidate_loss <= loss + ARMIJO * step * slope {
                    break (candidate, candidate_loss, candidate_grad);
                }
                step *= 0.5;
                if step < MIN_STEP {
                    debug!("Line search failed at iteration {iterations}");
                    let converged = max_abs(&grad) < params.tolerance;
                    return (theta, iterations, converged, loss, max_abs(&grad));
                }
            };

            let s: Vec<f64> = next_theta.iter().zip(&theta).map(|(a, b)| a - b).collect();
            let y: Vec<f64> = next_grad.iter().zip(&grad).map(|(a, b)| a - b).collect();
            let sy = dot(&s, &y);
            if sy > 1e-12 {
                history.push_back((s, y, 1.0 / sy));
                if history.len() > params.history_size.max(1) {
                    history.pop_front();
                }
            }

            let decrease = (loss - next_loss) / loss.abs().max(next_loss.abs()).max(1.0);
            theta = next_theta;
            loss = next_loss;
            grad = next_grad;

            if iterations % 100 == 0 {
                debug!(
                    "iteration {iterations}: loss {loss:.6}, max |gradient| {:.3e}",
                    max_abs(&grad)
                );
            }

            if decrease <= STALL_TOLERANCE {
                debug!("Objective stalled at iteration {iterations}");
                let gradient_max = max_abs(&grad);
                return (
                    theta,
                    iterations,
                    gradient_max < params.tolerance,
                    loss,
                    gradient_max,
                );
            }
        }

        let gradient_max = max_abs(&grad);
        (
            theta,
            iterations,
            gradient_max < params.tolerance,
            loss,
            gradient_max,
        )
    }

    /// Raw class scores `W x + b`, in class order.
    pub fn decision_function(&self, x: &SparseVector) -> Vec<f64> {
        scores(&self.weights, &self.intercepts, self.n_features, x)
    }

    /// Class probabilities, in class order.
    pub fn predict_proba(&self, x: &SparseVector) -> Vec<f64> {
        log_softmax_probs(&self.decision_function(x)).1
    }

    /// Most probable class; ties go to the lower level.
    pub fn predict(&self, x: &SparseVector) -> CefrLevel {
        let scores = self.decision_function(x);
        let mut best = 0;
        for (c, score) in scores.iter().enumerate() {
            if *score > scores[best] {
                best = c;
            }
        }
        self.classes[best]
    }

    pub fn classes(&self) -> &[CefrLevel] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Check internal consistency after deserialization.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.classes.len() < 2 {
            return Err(LugatError::serialization(format!(
                "classifier has {} class(es)",
                self.classes.len()
            )));
        }
        if self.weights.len() != self.classes.len() * self.n_features
            || self.intercepts.len() != self.classes.len()
        {
            return Err(LugatError::serialization(
                "classifier weight matrix does not match its dimensions",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_hot(idx: usize) -> SparseVector {
        SparseVector {
            indices: vec![idx],
            values: vec![1.0],
        }
    }

    #[test]
    fn test_separable_problem() {
        let x = vec![one_hot(0), one_hot(0), one_hot(1), one_hot(1), one_hot(2)];
        let y = vec![
            CefrLevel::A1,
            CefrLevel::A1,
            CefrLevel::C2,
            CefrLevel::C2,
            CefrLevel::B1,
        ];
        let (model, summary) =
            SoftmaxRegression::fit(&x, &y, 3, &LogisticRegressionParams::default()).unwrap();

        assert!(summary.converged);
        assert_eq!(model.classes(), &[CefrLevel::A1, CefrLevel::B1, CefrLevel::C2]);
        assert_eq!(model.predict(&one_hot(0)), CefrLevel::A1);
        assert_eq!(model.predict(&one_hot(1)), CefrLevel::C2);
        assert_eq!(model.predict(&one_hot(2)), CefrLevel::B1);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let x = vec![one_hot(0), one_hot(1), one_hot(0), one_hot(1)];
        let y = vec![CefrLevel::A2, CefrLevel::B2, CefrLevel::A2, CefrLevel::B2];
        let (model, _) =
            SoftmaxRegression::fit(&x, &y, 2, &LogisticRegressionParams::default()).unwrap();

        let proba = model.predict_proba(&one_hot(0));
        assert_eq!(proba.len(), 2);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(proba[0] > proba[1]);
    }

    #[test]
    fn test_balanced_weights() {
        let x = vec![one_hot(0), one_hot(0), one_hot(0), one_hot(1)];
        let y = vec![CefrLevel::A1, CefrLevel::A1, CefrLevel::A1, CefrLevel::C1];
        let (_, summary) =
            SoftmaxRegression::fit(&x, &y, 2, &LogisticRegressionParams::default()).unwrap();

        assert_eq!(summary.class_weights.len(), 2);
        assert!((summary.class_weights[0].1 - 4.0 / 6.0).abs() < 1e-12);
        assert!((summary.class_weights[1].1 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_features_fall_back_to_intercepts() {
        let x = vec![one_hot(0), one_hot(0), one_hot(1)];
        let y = vec![CefrLevel::A1, CefrLevel::A1, CefrLevel::B1];
        let params = LogisticRegressionParams {
            class_weight: ClassWeight::None,
            ..Default::default()
        };
        let (model, _) = SoftmaxRegression::fit(&x, &y, 2, &params).unwrap();

        // The more frequent class has the larger intercept.
        assert_eq!(model.predict(&SparseVector::default()), CefrLevel::A1);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = vec![one_hot(0), one_hot(1)];
        let y = vec![CefrLevel::A1, CefrLevel::A1];
        let err = SoftmaxRegression::fit(&x, &y, 2, &LogisticRegressionParams::default())
            .unwrap_err();
        assert!(matches!(err, LugatError::TooFewClasses { found: 1 }));
    }

    #[test]
    fn test_deterministic_fit() {
        let x = vec![one_hot(0), one_hot(1), one_hot(2), one_hot(0), one_hot(2)];
        let y = vec![
            CefrLevel::A1,
            CefrLevel::B2,
            CefrLevel::C1,
            CefrLevel::A1,
            CefrLevel::C1,
        ];
        let params = LogisticRegressionParams::default();
        let (first, _) = SoftmaxRegression::fit(&x, &y, 3, &params).unwrap();
        let (second, _) = SoftmaxRegression::fit(&x, &y, 3, &params).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_stalled_solver_reports_gradient_convergence() {
        let x = vec![one_hot(0), one_hot(1), one_hot(0), one_hot(1)];
        let y = vec![CefrLevel::A1, CefrLevel::B1, CefrLevel::A1, CefrLevel::B1];
        let params = LogisticRegressionParams {
            tolerance: 0.0,
            ..Default::default()
        };
        let (_, summary) = SoftmaxRegression::fit(&x, &y, 2, &params).unwrap();

        // No gradient is below zero, so the solver can only stall or run out.
        assert!(!summary.converged);
        assert!(summary.iterations <= params.max_iter);
    }
}
