//! Evaluation metrics and the classifier trait

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metrics for one evaluated classifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    /// Support-weighted precision over classes
    pub precision: f64,
    /// Support-weighted recall over classes
    pub recall: f64,
    /// Support-weighted F1 over classes
    pub f1_score: f64,
    /// Area under the ROC curve, when probabilities were available
    pub roc_auc: Option<f64>,
    /// Training time in seconds
    pub training_time_secs: f64,
    /// Number of evaluation samples
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Compute classification metrics.
    ///
    /// Precision, recall and F1 are computed per class and averaged with
    /// weights equal to each class's support in `y_true`. A class with an
    /// undefined ratio contributes 0.
    pub fn compute_classification(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        y_prob: Option<&Array1<f64>>,
    ) -> Self {
        let n = y_true.len();
        let mut metrics = Self {
            n_samples: n,
            ..Self::default()
        };
        if n == 0 {
            return metrics;
        }

        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (*t - *p).abs() < 0.5)
            .count();
        metrics.accuracy = correct as f64 / n as f64;

        // class -> (tp, fp, fn, support)
        let mut counts: BTreeMap<i64, (usize, usize, usize, usize)> = BTreeMap::new();
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            let t = t.round() as i64;
            let p = p.round() as i64;
            counts.entry(t).or_default().3 += 1;
            if t == p {
                counts.entry(t).or_default().0 += 1;
            } else {
                counts.entry(p).or_default().1 += 1;
                counts.entry(t).or_default().2 += 1;
            }
        }

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let (mut precision, mut recall, mut f1) = (0.0, 0.0, 0.0);
        for &(tp, fp, fn_, support) in counts.values() {
            let p = ratio(tp, tp + fp);
            let r = ratio(tp, tp + fn_);
            let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };
            let w = support as f64 / n as f64;
            precision += w * p;
            recall += w * r;
            f1 += w * f;
        }
        metrics.precision = precision;
        metrics.recall = recall;
        metrics.f1_score = f1;
        metrics.roc_auc = y_prob.and_then(|prob| roc_auc(y_true, prob));

        metrics
    }
}

/// Rank-based ROC AUC for binary labels; `None` when only one class is present
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> Option<f64> {
    let mut pairs: Vec<(f64, bool)> = scores
        .iter()
        .zip(y_true.iter())
        .map(|(&s, &t)| (s, t > 0.5))
        .collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let n_pos = pairs.iter().filter(|(_, t)| *t).count();
    let n_neg = pairs.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    // Average ranks over ties
    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < pairs.len() {
        let mut j = i;
        while j + 1 < pairs.len() && pairs[j + 1].0 == pairs[i].0 {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        rank_sum += pairs[i..=j].iter().filter(|(_, t)| *t).count() as f64 * avg_rank;
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    Some((rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

/// A binary classifier over a dense feature matrix
pub trait Classifier: Send + Sync {
    /// Human-readable model name
    fn name(&self) -> &'static str;

    /// Fit the model to training data; labels are 0.0 / 1.0
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Probability of the positive class for each row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Class labels, thresholded at 0.5
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    fn is_fitted(&self) -> bool;

    /// Get feature importances (if available)
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classification_metrics() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];

        let metrics = ModelMetrics::compute_classification(&y_true, &y_pred, None);
        assert!((metrics.accuracy - 0.75).abs() < 1e-12);
        // Both classes: p = r = 0.75, support 4 each
        assert!((metrics.precision - 0.75).abs() < 1e-12);
        assert!((metrics.recall - 0.75).abs() < 1e-12);
        assert!((metrics.f1_score - 0.75).abs() < 1e-12);
        assert!(metrics.roc_auc.is_none());
    }

    #[test]
    fn test_weighted_metrics_unbalanced() {
        // class 0: support 3, tp 3, fp 1 -> p 0.75, r 1.0
        // class 1: support 1, tp 0, fn 1 -> p 0, r 0
        let y_true = array![0.0, 0.0, 0.0, 1.0];
        let y_pred = array![0.0, 0.0, 0.0, 0.0];

        let m = ModelMetrics::compute_classification(&y_true, &y_pred, None);
        assert!((m.precision - 0.75 * 0.75).abs() < 1e-12);
        assert!((m.recall - 0.75).abs() < 1e-12);
        let f1_class0 = 2.0 * 0.75 / 1.75;
        assert!((m.f1_score - 0.75 * f1_class0).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        let perfect = array![0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&y, &perfect), Some(1.0));

        let ties = array![0.5, 0.5, 0.5, 0.5];
        assert_eq!(roc_auc(&y, &ties), Some(0.5));
    }

    #[test]
    fn test_empty_metrics() {
        let empty = Array1::<f64>::zeros(0);
        let m = ModelMetrics::compute_classification(&empty, &empty, None);
        assert_eq!(m.n_samples, 0);
        assert_eq!(m.f1_score, 0.0);
    }
}
