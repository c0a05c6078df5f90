//! Weighted document-vector regression: like naive-sum, but target vectors
//! aggregate tag embeddings under inverse corpus-frequency weights, so rare
//! tags pull the target harder than ubiquitous ones.

use ndarray::Array2;

use crate::dataset::Dataset;
use crate::error::ModelError;

use super::mlp;
use super::naivesum::aggregate_tag_vectors;
use super::session::Session;
use super::vocab::LabelVocab;
use super::{rank_labels, Batch, Model, TrainOptions, EVAL_TOP_K};

pub struct WdvModel {
    vocab: LabelVocab,
    input_dim: usize,
    hidden_units: Vec<usize>,
    learning_rate: f32,
}

impl WdvModel {
    pub fn new(vocab: LabelVocab, input_dim: usize, options: &TrainOptions) -> Self {
        Self {
            vocab,
            input_dim,
            hidden_units: options.hidden_units.clone(),
            learning_rate: options.learning_rate,
        }
    }
}

impl Model for WdvModel {
    fn name(&self) -> &'static str {
        "wdv"
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
        let scores = raw.dot(&self.vocab.embeddings().t());
        rank_labels(&scores, self.vocab.labels(), EVAL_TOP_K)
    }

    fn make_targets(&self, dataset: &Dataset, indices: &[usize]) -> Array2<f32> {
        let mut targets = Array2::<f32>::zeros((indices.len(), self.vocab.dim()));
        for (row, &i) in indices.iter().enumerate() {
            let weighted = aggregate_tag_vectors(&self.vocab, dataset.tags(i), |label| {
                self.vocab.inverse_freq_weight(label)
            });
            for (col, v) in weighted.into_iter().enumerate() {
                targets[[row, col]] = v;
            }
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests_support::toy_dataset;
    use crate::model::vocab::LabelVocab;

    fn skewed_vocab() -> LabelVocab {
        // "cat" is far more frequent than "dog", so it should be
        // down-weighted in aggregate targets.
        LabelVocab::from_raw(
            vec![
                ("cat".to_string(), vec![1.0, 0.0], 1000),
                ("dog".to_string(), vec![0.0, 1.0], 2),
                ("sun".to_string(), vec![0.7, 0.7], 2),
            ],
            2,
        )
    }

    #[test]
    fn test_targets_prefer_rare_tags() {
        let vocab = skewed_vocab();
        let row = aggregate_tag_vectors(&vocab, &["cat".to_string(), "dog".to_string()], |i| {
            vocab.inverse_freq_weight(i)
        });
        // The dog component dominates because cat's weight is tiny.
        assert!(row[1] > row[0]);
    }

    #[test]
    fn test_fit_reduces_loss() {
        let (_dir, dataset) = toy_dataset();
        let m = WdvModel::new(
            skewed_vocab(),
            2,
            &TrainOptions {
                learning_rate: 0.1,
                hidden_units: vec![8],
                ..TrainOptions::default()
            },
        );
        let mut session = Session::with_seed(17);
        m.initialize(&mut session);

        let batch = m.make_batch(&dataset, &[0, 1, 2, 3]).unwrap();
        let first = m.fit(&mut session, &batch).unwrap();
        let mut last = first;
        for _ in 0..200 {
            last = m.fit(&mut session, &batch).unwrap();
        }
        assert!(last < first);
    }
}
