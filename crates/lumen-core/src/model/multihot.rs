//! Multi-hot classification: image features project to one logit per
//! vocabulary label, trained with sigmoid cross-entropy against the sample's
//! multi-hot tag vector.

use ndarray::Array2;

use crate::dataset::Dataset;
use crate::error::ModelError;
use crate::math::sigmoid;

use super::mlp;
use super::session::Session;
use super::vocab::LabelVocab;
use super::{rank_labels, Batch, Model, TrainOptions, EVAL_TOP_K};

pub struct MultihotModel {
    vocab: LabelVocab,
    input_dim: usize,
    hidden_units: Vec<usize>,
    learning_rate: f32,
}

impl MultihotModel {
    pub fn new(vocab: LabelVocab, input_dim: usize, options: &TrainOptions) -> Self {
        Self {
            vocab,
            input_dim,
            hidden_units: options.hidden_units.clone(),
            learning_rate: options.learning_rate,
        }
    }
}

impl Model for MultihotModel {
    fn name(&self) -> &'static str {
        "multihot"
    }

    fn vocab(&self) -> &LabelVocab {
        &self.vocab
    }

    fn initialize(&self, session: &mut Session) {
        let layers = mlp::init_layers(
            self.input_dim,
            &self.hidden_units,
            self.vocab.len(),
            session.rng_mut(),
        );
        session.set_layers(layers);
    }

    fn fit(&self, session: &mut Session, batch: &Batch) -> Result<f32, ModelError> {
        session.ensure_initialized()?;
        let batch_len = batch.images.nrows() as f32;

        let pass = mlp::forward(session.layers(), &batch.images);

        // Sigmoid cross-entropy with logits, averaged over the batch.
        // The stable form max(z,0) - z*t + ln(1 + exp(-|z|)) avoids overflow.
        let mut loss = 0.0f32;
        ndarray::Zip::from(&pass.output)
            .and(&batch.targets)
            .for_each(|&z, &t| {
                loss += z.max(0.0) - z * t + (1.0 + (-z.abs()).exp()).ln();
            });
        loss /= batch_len;

        let mut grad = Array2::<f32>::zeros(pass.output.raw_dim());
        ndarray::Zip::from(&mut grad)
            .and(&pass.output)
            .and(&batch.targets)
            .for_each(|g, &z, &t| {
                *g = (sigmoid(z) - t) / batch_len;
            });

        mlp::backward(session.layers_mut(), &pass, &grad, self.learning_rate);
        Ok(loss)
    }

    fn predict(&self, session: &Session, images: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        session.ensure_initialized()?;
        Ok(mlp::forward(session.layers(), images).output)
    }

    fn post_predict(&self, raw: &Array2<f32>) -> Vec<Vec<String>> {
        rank_labels(raw, self.vocab.labels(), EVAL_TOP_K)
    }

    fn make_targets(&self, dataset: &Dataset, indices: &[usize]) -> Array2<f32> {
        let mut targets = Array2::<f32>::zeros((indices.len(), self.vocab.len()));
        for (row, &i) in indices.iter().enumerate() {
            for (col, v) in self.vocab.multihot(dataset.tags(i)).into_iter().enumerate() {
                targets[[row, col]] = v;
            }
        }
        targets
    }
}
