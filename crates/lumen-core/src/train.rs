//! The train/evaluate driver.
//!
//! Sequential and synchronous: one session, one model, one dataset pass at a
//! time. Epochs draw non-overlapping batches, apply one optimization step
//! each, and report the arithmetic-mean batch loss. No early stopping or
//! convergence checks — the epoch count is fixed upfront, and any step
//! failure aborts the run.

use ndarray::Array2;

use crate::dataset::Dataset;
use crate::error::{ModelError, Result};
use crate::evaluation::{Evaluation, Scores};
use crate::model::{Batch, Model, Session, EVAL_TOP_K};

/// Held-out inputs and truth for mid-training evaluation.
pub struct MidEval {
    pub inputs: Array2<f32>,
    pub truth: Vec<Vec<String>>,
}

/// Train the model on a single batch, returning the batch loss.
pub fn train_batch(session: &mut Session, model: &dyn Model, batch: &Batch) -> Result<f32> {
    Ok(model.fit(session, batch)?)
}

/// Train for a single epoch over `dataset` with the given batch size.
///
/// Returns the average (arithmetic mean) training loss over the epoch's
/// batches. An epoch that yields no batches — the dataset is smaller than
/// the batch size, or the batch size is zero — is an error, not a NaN.
pub fn train_epoch(
    session: &mut Session,
    model: &dyn Model,
    dataset: &Dataset,
    batch_size: usize,
) -> Result<f32> {
    let mut losses = Vec::new();
    for batch in model.iter_batches(dataset, batch_size) {
        let batch = batch?;
        losses.push(train_batch(session, model, &batch)?);
    }

    if losses.is_empty() {
        return Err(ModelError::EmptyEpoch {
            samples: dataset.len(),
            batch_size,
        }
        .into());
    }
    Ok(losses.iter().sum::<f32>() / losses.len() as f32)
}

/// Train for `num_epochs` epochs.
///
/// Every `epoch_verbosity` epochs the average loss is logged and recorded in
/// the returned history, and — when a mid-evaluation set was supplied — the
/// model is evaluated against held-out truth.
pub fn train(
    session: &mut Session,
    model: &dyn Model,
    num_epochs: usize,
    dataset: &Dataset,
    batch_size: usize,
    epoch_verbosity: usize,
    mid_eval: Option<&MidEval>,
) -> Result<Vec<f32>> {
    let mut history = Vec::new();
    for epoch in 0..num_epochs {
        let avg_loss = train_epoch(session, model, dataset, batch_size)?;
        if epoch_verbosity > 0 && epoch % epoch_verbosity == 0 {
            tracing::info!("Finished epoch {} (avg training loss: {:.6})", epoch, avg_loss);
            history.push(avg_loss);
            if let Some(mid) = mid_eval {
                evaluate(session, model, &mid.inputs, &mid.truth)?;
            }
        }
    }
    Ok(history)
}

/// Predict on held-out inputs and score against truth at the fixed cutoff.
pub fn evaluate(
    session: &Session,
    model: &dyn Model,
    inputs: &Array2<f32>,
    truth: &[Vec<String>],
) -> Result<Scores> {
    let raw = model.predict(session, inputs)?;
    let predictions = model.post_predict(&raw);
    let scores = Evaluation::new(truth, &predictions, EVAL_TOP_K).evaluate();
    tracing::info!(
        "Evaluation (precision, recall, f1): ({:.4}, {:.4}, {:.4})",
        scores.precision,
        scores.recall,
        scores.f1
    );
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LumenError;
    use crate::model::tests_support::{toy_dataset, toy_vocab};
    use crate::model::{LabelVocab, TrainOptions};
    use std::cell::RefCell;
    use std::path::Path;

    /// Scripted model: records batch counts, returns queued losses.
    struct ScriptedModel {
        vocab: LabelVocab,
        losses: RefCell<Vec<f32>>,
        fits: RefCell<usize>,
    }

    impl ScriptedModel {
        fn new(losses: Vec<f32>) -> Self {
            Self {
                vocab: toy_vocab(),
                losses: RefCell::new(losses),
                fits: RefCell::new(0),
            }
        }

        fn fit_count(&self) -> usize {
            *self.fits.borrow()
        }
    }

    impl Model for ScriptedModel {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn vocab(&self) -> &LabelVocab {
            &self.vocab
        }

        fn initialize(&self, _session: &mut Session) {}

        fn fit(&self, _session: &mut Session, _batch: &Batch) -> std::result::Result<f32, ModelError> {
            *self.fits.borrow_mut() += 1;
            let mut losses = self.losses.borrow_mut();
            if losses.is_empty() {
                Ok(0.0)
            } else {
                Ok(losses.remove(0))
            }
        }

        fn predict(
            &self,
            _session: &Session,
            images: &Array2<f32>,
        ) -> std::result::Result<Array2<f32>, ModelError> {
            Ok(Array2::zeros((images.nrows(), self.vocab.len())))
        }

        fn post_predict(&self, raw: &Array2<f32>) -> Vec<Vec<String>> {
            (0..raw.nrows()).map(|_| Vec::new()).collect()
        }

        fn make_targets(&self, _dataset: &Dataset, indices: &[usize]) -> Array2<f32> {
            Array2::zeros((indices.len(), self.vocab.len()))
        }

        fn save(&self, _session: &Session, _path: &Path) -> std::result::Result<(), ModelError> {
            Ok(())
        }

        fn load(&self, _session: &mut Session, _path: &Path) -> std::result::Result<(), ModelError> {
            Ok(())
        }
    }

    #[test]
    fn test_epoch_yields_exact_batch_count() {
        // 4 samples, batch size 2 → exactly 2 batches per epoch.
        let (_dir, dataset) = toy_dataset();
        let model = ScriptedModel::new(vec![]);
        let mut session = Session::with_seed(1);

        train_epoch(&mut session, &model, &dataset, 2).unwrap();
        assert_eq!(model.fit_count(), 2);
    }

    #[test]
    fn test_epoch_average_is_arithmetic_mean() {
        let (_dir, dataset) = toy_dataset();
        let model = ScriptedModel::new(vec![1.0, 3.0]);
        let mut session = Session::with_seed(1);

        let avg = train_epoch(&mut session, &model, &dataset, 2).unwrap();
        assert!((avg - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_epoch_is_an_error() {
        // Batch size larger than the dataset: zero batches drawn.
        let (_dir, dataset) = toy_dataset();
        let model = ScriptedModel::new(vec![]);
        let mut session = Session::with_seed(1);

        let err = train_epoch(&mut session, &model, &dataset, 100).unwrap_err();
        assert!(matches!(
            err,
            LumenError::Model(ModelError::EmptyEpoch {
                samples: 4,
                batch_size: 100
            })
        ));
        assert_eq!(model.fit_count(), 0);
    }

    #[test]
    fn test_history_follows_verbosity_schedule() {
        let (_dir, dataset) = toy_dataset();
        let model = ScriptedModel::new(vec![]);
        let mut session = Session::with_seed(1);

        // 10 epochs at verbosity 3 → recorded at epochs 0, 3, 6, 9.
        let history = train(&mut session, &model, 10, &dataset, 2, 3, None).unwrap();
        assert_eq!(history.len(), 4);
        // 2 batches per epoch × 10 epochs
        assert_eq!(model.fit_count(), 20);
    }

    #[test]
    fn test_mid_eval_runs_only_on_verbose_epochs() {
        let (_dir, dataset) = toy_dataset();
        let model = ScriptedModel::new(vec![]);
        let mut session = Session::with_seed(1);

        let mid = MidEval {
            inputs: dataset.all_features().unwrap(),
            truth: dataset.all_tags().to_vec(),
        };
        // predict() is exercised once per verbose epoch without error
        let history = train(&mut session, &model, 4, &dataset, 2, 2, Some(&mid)).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_end_to_end_multihot_run() {
        // The full driver path against a real model: train, then evaluate.
        let (_dir, dataset) = toy_dataset();
        let model = crate::model::MultihotModel::new(
            toy_vocab(),
            2,
            &TrainOptions {
                learning_rate: 0.1,
                hidden_units: vec![8],
                ..TrainOptions::default()
            },
        );
        let mut session = Session::with_seed(2);
        model.initialize(&mut session);

        let history = train(&mut session, &model, 40, &dataset, 2, 10, None).unwrap();
        assert_eq!(history.len(), 4);
        assert!(
            history.last().unwrap() < history.first().unwrap(),
            "training should reduce loss: {:?}",
            history
        );

        let (inputs, truth) = model.prep_predict(&dataset).unwrap();
        let scores = evaluate(&session, &model, &inputs, &truth).unwrap();
        assert!(scores.recall > 0.5, "toy problem should be learnable");
    }
}
