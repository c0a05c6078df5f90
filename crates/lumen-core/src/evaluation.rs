//! Top-k evaluation of predicted label sets against ground truth.
//!
//! Predictions arrive as ranked label lists (best first); the top `k` of
//! each are compared with the sample's true label set to produce aggregate
//! precision, recall, and F1.

use serde::Serialize;
use std::collections::HashSet;

/// Aggregate evaluation scores. Computed per call, not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scores {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
}

/// One evaluation pass over a prediction set.
pub struct Evaluation<'a> {
    truth: &'a [Vec<String>],
    predictions: &'a [Vec<String>],
    k: usize,
}

impl<'a> Evaluation<'a> {
    /// Create an evaluation over aligned truth and prediction slices.
    ///
    /// `predictions[i]` is the ranked label list for the sample whose true
    /// labels are `truth[i]`.
    pub fn new(truth: &'a [Vec<String>], predictions: &'a [Vec<String>], k: usize) -> Self {
        assert_eq!(
            truth.len(),
            predictions.len(),
            "truth and predictions must align"
        );
        Self {
            truth,
            predictions,
            k,
        }
    }

    /// Compute aggregate precision, recall, and F1.
    ///
    /// Per sample: the top-k predictions are intersected with the truth set;
    /// precision is hits/k, recall is hits/|truth|. Samples with an empty
    /// truth set are skipped for recall. F1 is the harmonic mean of the
    /// aggregate precision and recall.
    pub fn evaluate(&self) -> Scores {
        if self.truth.is_empty() || self.k == 0 {
            return Scores {
                precision: 0.0,
                recall: 0.0,
                f1: 0.0,
            };
        }

        let mut precision_sum = 0.0f32;
        let mut recall_sum = 0.0f32;
        let mut recall_count = 0usize;

        for (truth, ranked) in self.truth.iter().zip(self.predictions) {
            let truth_set: HashSet<&str> = truth.iter().map(|t| t.as_str()).collect();
            let hits = ranked
                .iter()
                .take(self.k)
                .filter(|p| truth_set.contains(p.as_str()))
                .count() as f32;

            precision_sum += hits / self.k as f32;
            if !truth_set.is_empty() {
                recall_sum += hits / truth_set.len() as f32;
                recall_count += 1;
            }
        }

        let precision = precision_sum / self.truth.len() as f32;
        let recall = if recall_count > 0 {
            recall_sum / recall_count as f32
        } else {
            0.0
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Scores {
            precision,
            recall,
            f1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_perfect_predictions() {
        let truth = vec![labels(&["a", "b"])];
        let predictions = vec![labels(&["a", "b"])];
        let scores = Evaluation::new(&truth, &predictions, 2).evaluate();
        assert!((scores.precision - 1.0).abs() < 1e-6);
        assert!((scores.recall - 1.0).abs() < 1e-6);
        assert!((scores.f1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_disjoint_predictions() {
        let truth = vec![labels(&["a", "b"])];
        let predictions = vec![labels(&["x", "y"])];
        let scores = Evaluation::new(&truth, &predictions, 2).evaluate();
        assert_eq!(scores.precision, 0.0);
        assert_eq!(scores.recall, 0.0);
        assert_eq!(scores.f1, 0.0);
    }

    #[test]
    fn test_only_top_k_counts() {
        // "b" is ranked below the cutoff, so it never scores a hit.
        let truth = vec![labels(&["b"])];
        let predictions = vec![labels(&["x", "b"])];
        let scores = Evaluation::new(&truth, &predictions, 1).evaluate();
        assert_eq!(scores.precision, 0.0);
        assert_eq!(scores.recall, 0.0);
    }

    #[test]
    fn test_partial_hits() {
        let truth = vec![labels(&["a", "b", "c", "d"])];
        let predictions = vec![labels(&["a", "b", "x", "y"])];
        let scores = Evaluation::new(&truth, &predictions, 4).evaluate();
        assert!((scores.precision - 0.5).abs() < 1e-6);
        assert!((scores.recall - 0.5).abs() < 1e-6);
        assert!((scores.f1 - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_empty_truth_skipped_for_recall() {
        let truth = vec![labels(&[]), labels(&["a"])];
        let predictions = vec![labels(&["x"]), labels(&["a"])];
        let scores = Evaluation::new(&truth, &predictions, 1).evaluate();
        // Recall averaged over the single non-empty sample
        assert!((scores.recall - 1.0).abs() < 1e-6);
        // Precision averaged over both
        assert!((scores.precision - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_averages_across_samples() {
        let truth = vec![labels(&["a"]), labels(&["b"])];
        let predictions = vec![labels(&["a"]), labels(&["x"])];
        let scores = Evaluation::new(&truth, &predictions, 1).evaluate();
        assert!((scores.precision - 0.5).abs() < 1e-6);
        assert!((scores.recall - 0.5).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "must align")]
    fn test_misaligned_inputs_panic() {
        let truth = vec![labels(&["a"])];
        let predictions: Vec<Vec<String>> = vec![];
        Evaluation::new(&truth, &predictions, 1);
    }
}
