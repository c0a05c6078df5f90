//! Negative-sampling projection: image features project into word-vector
//! space and are trained with a sampled logistic loss — each positive tag
//! embedding is pulled toward the projection while a handful of uniformly
//! sampled negative labels are pushed away. With `--optim-words` the label
//! embedding table itself receives the symmetric gradient.

use ndarray::Array2;
use rand::Rng;

use crate::dataset::Dataset;
use crate::error::ModelError;
use crate::math::sigmoid;

use super::mlp;
use super::session::Session;
use super::vocab::LabelVocab;
use super::{rank_labels, Batch, Model, TrainOptions, EVAL_TOP_K};

pub struct NegSampModel {
    vocab: LabelVocab,
    input_dim: usize,
    hidden_units: Vec<usize>,
    learning_rate: f32,
    negative_samples: usize,
    optim_words: bool,
}

impl NegSampModel {
    pub fn new(vocab: LabelVocab, input_dim: usize, options: &TrainOptions) -> Self {
        Self {
            vocab,
            input_dim,
            hidden_units: options.hidden_units.clone(),
            learning_rate: options.learning_rate,
            negative_samples: options.negative_samples,
            optim_words: options.optim_words,
        }
    }

    fn embeddings_missing() -> ModelError {
        ModelError::Shape("negsamp session is missing its label embedding table".to_string())
    }
}

impl Model for NegSampModel {
    fn name(&self) -> &'static str {
        "negsamp"
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
        // Trainable copy of the vocabulary embeddings; identical to the
        // static table unless joint optimization updates it.
        session.set_label_embeddings(self.vocab.embeddings().clone());
    }

    fn fit(&self, session: &mut Session, batch: &Batch) -> Result<f32, ModelError> {
        session.ensure_initialized()?;
        let batch_len = batch.images.nrows();
        let bf = batch_len as f32;
        let vocab_len = self.vocab.len();

        let pass = mlp::forward(session.layers(), &batch.images);

        let positives: Vec<Vec<usize>> = batch
            .targets
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(_, &v)| v > 0.5)
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();

        // Uniform rejection sampling; bounded so a vocabulary that is almost
        // entirely positive for a sample cannot spin forever.
        let negatives: Vec<Vec<usize>> = {
            let rng = session.rng_mut();
            positives
                .iter()
                .map(|pos| {
                    let want = pos.len() * self.negative_samples;
                    let mut drawn = Vec::with_capacity(want);
                    let mut attempts = 0usize;
                    while drawn.len() < want && attempts < want * 20 + 20 {
                        attempts += 1;
                        let candidate = rng.gen_range(0..vocab_len);
                        if !pos.contains(&candidate) {
                            drawn.push(candidate);
                        }
                    }
                    drawn
                })
                .collect()
        };

        let embeddings = session
            .label_embeddings()
            .ok_or_else(Self::embeddings_missing)?;

        let mut grad_output = Array2::<f32>::zeros((batch_len, self.vocab.dim()));
        let mut embedding_updates: Vec<(usize, Vec<f32>)> = Vec::new();
        let mut loss = 0.0f32;

        for (row, (pos, neg)) in positives.iter().zip(&negatives).enumerate() {
            let projection = pass.output.row(row);
            let labeled = pos
                .iter()
                .map(|p| (*p, 1.0f32))
                .chain(neg.iter().map(|n| (*n, 0.0f32)));

            for (label, target) in labeled {
                let embedding = embeddings.row(label);
                let s = sigmoid(projection.dot(&embedding));
                loss -= if target > 0.5 {
                    s.max(1e-7).ln()
                } else {
                    (1.0 - s).max(1e-7).ln()
                };

                let coeff = (s - target) / bf;
                for (g, &e) in grad_output.row_mut(row).iter_mut().zip(embedding.iter()) {
                    *g += coeff * e;
                }
                if self.optim_words {
                    embedding_updates
                        .push((label, projection.iter().map(|&v| coeff * v).collect()));
                }
            }
        }
        loss /= bf;

        mlp::backward(session.layers_mut(), &pass, &grad_output, self.learning_rate);

        if self.optim_words {
            if let Some(table) = session.label_embeddings_mut() {
                for (label, delta) in embedding_updates {
                    for (slot, d) in table.row_mut(label).iter_mut().zip(delta) {
                        *slot -= self.learning_rate * d;
                    }
                }
            }
        }

        Ok(loss)
    }

    fn predict(&self, session: &Session, images: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        session.ensure_initialized()?;
        let projected = mlp::forward(session.layers(), images).output;
        // Score against the session's table so jointly optimized words are
        // reflected at inference time.
        let table = session
            .label_embeddings()
            .ok_or_else(Self::embeddings_missing)?;
        Ok(projected.dot(&table.t()))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests_support::{toy_dataset, toy_vocab};

    fn model(optim_words: bool) -> NegSampModel {
        NegSampModel::new(
            toy_vocab(),
            2,
            &TrainOptions {
                learning_rate: 0.1,
                hidden_units: vec![8],
                optim_words,
                negative_samples: 2,
            },
        )
    }

    #[test]
    fn test_initialize_registers_embedding_table() {
        let m = model(false);
        let mut session = Session::with_seed(1);
        m.initialize(&mut session);
        let table = session.label_embeddings().unwrap();
        assert_eq!(table.nrows(), m.vocab().len());
        assert_eq!(table.ncols(), m.vocab().dim());
    }

    #[test]
    fn test_fit_reduces_sampled_loss() {
        let (_dir, dataset) = toy_dataset();
        let m = model(false);
        let mut session = Session::with_seed(23);
        m.initialize(&mut session);

        let batch = m.make_batch(&dataset, &[0, 1, 2, 3]).unwrap();
        // Sampling makes single-batch losses noisy; compare averages.
        let early: f32 = (0..10)
            .map(|_| m.fit(&mut session, &batch).unwrap())
            .sum::<f32>()
            / 10.0;
        for _ in 0..300 {
            m.fit(&mut session, &batch).unwrap();
        }
        let late: f32 = (0..10)
            .map(|_| m.fit(&mut session, &batch).unwrap())
            .sum::<f32>()
            / 10.0;
        assert!(late < early, "sampled loss should fall: {} -> {}", early, late);
    }

    #[test]
    fn test_word_table_static_without_optim_words() {
        let (_dir, dataset) = toy_dataset();
        let m = model(false);
        let mut session = Session::with_seed(7);
        m.initialize(&mut session);
        let before = session.label_embeddings().unwrap().clone();

        let batch = m.make_batch(&dataset, &[0, 1, 2, 3]).unwrap();
        for _ in 0..10 {
            m.fit(&mut session, &batch).unwrap();
        }
        assert_eq!(&before, session.label_embeddings().unwrap());
    }

    #[test]
    fn test_optim_words_updates_table() {
        let (_dir, dataset) = toy_dataset();
        let m = model(true);
        let mut session = Session::with_seed(7);
        m.initialize(&mut session);
        let before = session.label_embeddings().unwrap().clone();

        let batch = m.make_batch(&dataset, &[0, 1, 2, 3]).unwrap();
        for _ in 0..10 {
            m.fit(&mut session, &batch).unwrap();
        }
        assert_ne!(&before, session.label_embeddings().unwrap());
    }

    #[test]
    fn test_learned_ranking_matches_tags() {
        let (_dir, dataset) = toy_dataset();
        let m = model(false);
        let mut session = Session::with_seed(31);
        m.initialize(&mut session);

        let batch = m.make_batch(&dataset, &[0, 1, 2, 3]).unwrap();
        for _ in 0..500 {
            m.fit(&mut session, &batch).unwrap();
        }

        let raw = m.predict(&session, &batch.images).unwrap();
        let ranked = m.post_predict(&raw);
        assert_eq!(ranked[0][0], "cat");
    }
}
