//! Naive-sum regression: image features project into word-vector space,
//! trained with mean-squared error against the normalized sum of the
//! sample's tag vectors. Predictions are ranked by similarity to the
//! vocabulary embeddings.

use ndarray::Array2;

use crate::dataset::Dataset;
use crate::error::ModelError;
use crate::math::l2_normalize_in_place;

use super::mlp;
use super::session::Session;
use super::vocab::LabelVocab;
use super::{rank_labels, Batch, Model, TrainOptions, EVAL_TOP_K};

pub struct NaiveSumModel {
    vocab: LabelVocab,
    input_dim: usize,
    hidden_units: Vec<usize>,
    learning_rate: f32,
}

impl NaiveSumModel {
    pub fn new(vocab: LabelVocab, input_dim: usize, options: &TrainOptions) -> Self {
        Self {
            vocab,
            input_dim,
            hidden_units: options.hidden_units.clone(),
            learning_rate: options.learning_rate,
        }
    }

    /// Target row: unit-normalized aggregate of the sample's tag vectors.
    /// A sample whose tags are all out of vocabulary gets a zero target.
    fn target_row(&self, tags: &[String]) -> Vec<f32> {
        aggregate_tag_vectors(&self.vocab, tags, |_| 1.0)
    }
}

/// Sum tag embeddings under a per-label weight, then L2-normalize.
pub(super) fn aggregate_tag_vectors(
    vocab: &LabelVocab,
    tags: &[String],
    weight: impl Fn(usize) -> f32,
) -> Vec<f32> {
    let mut row = vec![0.0f32; vocab.dim()];
    for tag in tags {
        if let Some(i) = vocab.index_of(tag) {
            let w = weight(i);
            for (slot, &v) in row.iter_mut().zip(vocab.embeddings().row(i).iter()) {
                *slot += w * v;
            }
        }
    }
    l2_normalize_in_place(&mut row);
    row
}

impl Model for NaiveSumModel {
    fn name(&self) -> &'static str {
        "naivesum"
    }

    fn vocab(&self) -> &LabelVocab {
        &self.vocab
    }

    fn initialize(&self, session: &mut Session) {
        let layers = mlp::init_layers(
            self.input_dim,
            &self.hidden_units,
            self.vocab.dim(),
            session.rng_mut(),
        );
        session.set_layers(layers);
    }

    fn fit(&self, session: &mut Session, batch: &Batch) -> Result<f32, ModelError> {
        session.ensure_initialized()?;
        let batch_len = batch.images.nrows() as f32;

        let pass = mlp::forward(session.layers(), &batch.images);

        let diff = &pass.output - &batch.targets;
        let loss = diff.mapv(|v| v * v).sum() / batch_len;
        let grad = diff * (2.0 / batch_len);

        mlp::backward(session.layers_mut(), &pass, &grad, self.learning_rate);
        Ok(loss)
    }

    fn predict(&self, session: &Session, images: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        session.ensure_initialized()?;
        Ok(mlp::forward(session.layers(), images).output)
    }

    fn post_predict(&self, raw: &Array2<f32>) -> Vec<Vec<String>> {
        // Embeddings are unit rows, so the dot against them orders labels
        // by cosine similarity to the predicted vector.
        let scores = raw.dot(&self.vocab.embeddings().t());
        rank_labels(&scores, self.vocab.labels(), EVAL_TOP_K)
    }

    fn make_targets(&self, dataset: &Dataset, indices: &[usize]) -> Array2<f32> {
        let mut targets = Array2::<f32>::zeros((indices.len(), self.vocab.dim()));
        for (row, &i) in indices.iter().enumerate() {
            for (col, v) in self.target_row(dataset.tags(i)).into_iter().enumerate() {
                targets[[row, col]] = v;
            }
        }
        targets
    }
}
