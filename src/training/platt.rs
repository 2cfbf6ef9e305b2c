//! Platt scaling: maps raw margins to probabilities through a fitted sigmoid
//! `P(y=1|f) = 1 / (1 + exp(-(a*f + b)))`

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{ChurnError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlattScaling {
    a: Option<f64>,
    b: Option<f64>,
    max_iter: usize,
    tol: f64,
}

impl PlattScaling {
    pub fn new() -> Self {
        Self {
            a: None,
            b: None,
            max_iter: 100,
            tol: 1e-9,
        }
    }

    /// Set maximum Newton iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Fitted `(a, b)`
    pub fn parameters(&self) -> Option<(f64, f64)> {
        match (self.a, self.b) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    /// Fit the sigmoid to margins `scores` against 0/1 `labels`
    pub fn fit(&mut self, scores: &Array1<f64>, labels: &Array1<f64>) -> Result<()> {
        let n = scores.len();
        if n != labels.len() {
            return Err(ChurnError::ShapeMismatch {
                expected: format!("{} labels", n),
                actual: format!("{} labels", labels.len()),
            });
        }
        if n == 0 {
            return Err(ChurnError::TrainingError("cannot calibrate on empty input".to_string()));
        }

        // Smoothed targets keep the fit finite on separable data
        let n_pos = labels.iter().filter(|&&y| y > 0.5).count() as f64;
        let n_neg = n as f64 - n_pos;
        let target_pos = (n_pos + 1.0) / (n_pos + 2.0);
        let target_neg = 1.0 / (n_neg + 2.0);
        let targets: Vec<f64> = labels
            .iter()
            .map(|&y| if y > 0.5 { target_pos } else { target_neg })
            .collect();

        let mut a = 1.0;
        let mut b = 0.0;

        for _ in 0..self.max_iter {
            let (mut grad_a, mut grad_b) = (0.0, 0.0);
            let (mut hess_aa, mut hess_ab, mut hess_bb) = (1e-6, 0.0, 1e-6);

            for (&f, &t) in scores.iter().zip(&targets) {
                let p = Self::sigmoid(a * f + b);
                let d1 = p - t;
                let d2 = p * (1.0 - p);
                grad_a += f * d1;
                grad_b += d1;
                hess_aa += f * f * d2;
                hess_ab += f * d2;
                hess_bb += d2;
            }

            let det = hess_aa * hess_bb - hess_ab * hess_ab;
            if det.abs() < 1e-12 {
                break;
            }

            let delta_a = (hess_bb * grad_a - hess_ab * grad_b) / det;
            let delta_b = (hess_aa * grad_b - hess_ab * grad_a) / det;
            a -= delta_a;
            b -= delta_b;

            if delta_a.abs() < self.tol && delta_b.abs() < self.tol {
                break;
            }
        }

        if !a.is_finite() || !b.is_finite() {
            return Err(ChurnError::TrainingError("Platt scaling diverged".to_string()));
        }

        self.a = Some(a);
        self.b = Some(b);
        Ok(())
    }

    pub fn calibrate(&self, scores: &Array1<f64>) -> Result<Array1<f64>> {
        let (a, b) = self
            .parameters()
            .ok_or_else(|| ChurnError::not_fitted("PlattScaling::calibrate"))?;
        Ok(scores.mapv(|f| Self::sigmoid(a * f + b)))
    }
}

impl Default for PlattScaling {
    fn default() -> Self {
        Self::new()
    }
}
