//! Pluggable model variants behind one capability trait.
//!
//! A model type name selects one of four implementations; the training
//! driver only ever sees the `Model` trait. Parameters live in the
//! [`Session`], never in the model structs themselves, so a model value is
//! cheap configuration plus the label vocabulary.

pub mod mlp;
pub mod session;
pub mod vocab;

mod multihot;
mod naivesum;
mod negsamp;
mod wdv;

pub use multihot::MultihotModel;
pub use naivesum::NaiveSumModel;
pub use negsamp::NegSampModel;
pub use session::Session;
pub use vocab::LabelVocab;
pub use wdv::WdvModel;

use std::fmt;
use std::path::Path;

use ndarray::Array2;

use crate::dataset::Dataset;
use crate::error::{LumenError, ModelError};
use crate::wordvec::WordVectors;

/// Fixed evaluation cutoff: predictions are scored on their top 5 labels.
pub const EVAL_TOP_K: usize = 5;

/// The four model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Multihot,
    NaiveSum,
    Wdv,
    NegSamp,
}

impl ModelKind {
    /// Parse a model kind from its CLI spelling.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "multihot" => Some(Self::Multihot),
            "naivesum" => Some(Self::NaiveSum),
            "wdv" => Some(Self::Wdv),
            "negsamp" => Some(Self::NegSamp),
            _ => None,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Multihot => write!(f, "multihot"),
            Self::NaiveSum => write!(f, "naivesum"),
            Self::Wdv => write!(f, "wdv"),
            Self::NegSamp => write!(f, "negsamp"),
        }
    }
}

/// Options shared by all model constructors.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub learning_rate: f32,
    pub hidden_units: Vec<usize>,
    /// Jointly optimize the label embedding table (negsamp only)
    pub optim_words: bool,
    /// Negative samples drawn per positive label (negsamp only)
    pub negative_samples: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            hidden_units: vec![200, 200],
            optim_words: false,
            negative_samples: 5,
        }
    }
}

/// Parse a comma-separated hidden-layer spec like `"200,200"`.
pub fn parse_hidden_units(spec: &str) -> Result<Vec<usize>, ModelError> {
    spec.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    ModelError::Shape(format!("invalid hidden layer size {:?} in {:?}", part, spec))
                })
        })
        .collect()
}

/// A materialized training batch: image features plus model-specific targets.
pub struct Batch {
    /// batch × feature_dim image features
    pub images: Array2<f32>,
    /// batch × target_dim targets (meaning depends on the model)
    pub targets: Array2<f32>,
}

/// The capability set every model variant provides to the driver.
pub trait Model {
    /// CLI spelling of this variant.
    fn name(&self) -> &'static str;

    /// The label vocabulary this model ranks over.
    fn vocab(&self) -> &LabelVocab;

    /// Create this model's parameters in the session.
    fn initialize(&self, session: &mut Session);

    /// One optimization step on a batch; returns the batch loss.
    fn fit(&self, session: &mut Session, batch: &Batch) -> Result<f32, ModelError>;

    /// Raw prediction outputs for a matrix of image features.
    fn predict(&self, session: &Session, images: &Array2<f32>) -> Result<Array2<f32>, ModelError>;

    /// Convert raw outputs into ranked label sets (best first, top-k).
    fn post_predict(&self, raw: &Array2<f32>) -> Vec<Vec<String>>;

    /// Build this model's target rows for the given samples.
    fn make_targets(&self, dataset: &Dataset, indices: &[usize]) -> Array2<f32>;

    /// Materialize one batch from dataset indices.
    fn make_batch(&self, dataset: &Dataset, indices: &[usize]) -> Result<Batch, LumenError> {
        let images = dataset.features_for(indices)?;
        let targets = self.make_targets(dataset, indices);
        Ok(Batch { images, targets })
    }

    /// Prepare evaluation inputs and ground truth for a dataset.
    ///
    /// Truth is restricted to in-vocabulary labels — a label the model can
    /// never emit should not count against recall.
    fn prep_predict(&self, dataset: &Dataset) -> Result<(Array2<f32>, Vec<Vec<String>>), LumenError> {
        let inputs = dataset.all_features()?;
        let truth = dataset
            .all_tags()
            .iter()
            .map(|tags| self.vocab().known(tags))
            .collect();
        Ok((inputs, truth))
    }

    /// Persist session parameters with this model's vocabulary hash.
    fn save(&self, session: &Session, path: &Path) -> Result<(), ModelError> {
        session.save(path, &self.vocab().content_hash())
    }

    /// Restore session parameters, rejecting vocabulary mismatches.
    fn load(&self, session: &mut Session, path: &Path) -> Result<(), ModelError> {
        session.load_into(path, &self.vocab().content_hash())
    }
}

impl dyn Model + '_ {
    /// Iterate non-overlapping batches over a dataset, in order.
    ///
    /// Trailing samples that do not fill a whole batch are not drawn, so a
    /// dataset smaller than the batch size yields no batches at all.
    pub fn iter_batches<'a>(&'a self, dataset: &'a Dataset, batch_size: usize) -> Batches<'a> {
        Batches {
            model: self,
            dataset,
            batch_size,
            cursor: 0,
        }
    }
}

/// Iterator over one epoch's batches.
pub struct Batches<'a> {
    model: &'a dyn Model,
    dataset: &'a Dataset,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = Result<Batch, LumenError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.batch_size == 0 || self.cursor + self.batch_size > self.dataset.len() {
            return None;
        }
        let indices: Vec<usize> = (self.cursor..self.cursor + self.batch_size).collect();
        self.cursor += self.batch_size;
        Some(self.model.make_batch(self.dataset, &indices))
    }
}

/// Rank vocabulary labels by per-row score, best first, truncated to `k`.
pub(crate) fn rank_labels(scores: &Array2<f32>, labels: &[String], k: usize) -> Vec<Vec<String>> {
    scores
        .rows()
        .into_iter()
        .map(|row| {
            let mut indexed: Vec<(usize, f32)> = row.iter().copied().enumerate().collect();
            indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            indexed
                .into_iter()
                .take(k)
                .map(|(i, _)| labels[i].clone())
                .collect()
        })
        .collect()
}

/// Construct the model selected by `kind`.
///
/// The label vocabulary is built from the tags of `datasets` (train only
/// under `--cross-eval`, train plus test otherwise) intersected with the
/// word-vector vocabulary.
pub fn build_model(
    kind: ModelKind,
    word_vectors: &WordVectors,
    datasets: &[&Dataset],
    input_dim: usize,
    options: &TrainOptions,
) -> Result<Box<dyn Model>, ModelError> {
    let vocab = LabelVocab::build(word_vectors, datasets)?;
    tracing::info!("Selecting model class: {}", kind);

    Ok(match kind {
        ModelKind::Multihot => Box::new(MultihotModel::new(vocab, input_dim, options)),
        ModelKind::NaiveSum => Box::new(NaiveSumModel::new(vocab, input_dim, options)),
        ModelKind::Wdv => Box::new(WdvModel::new(vocab, input_dim, options)),
        ModelKind::NegSamp => Box::new(NegSampModel::new(vocab, input_dim, options)),
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_model_kind_parse() {
        assert_eq!(ModelKind::parse("multihot"), Some(ModelKind::Multihot));
        assert_eq!(ModelKind::parse("NEGSAMP"), Some(ModelKind::NegSamp));
        assert_eq!(ModelKind::parse("linear"), None);
    }

    #[test]
    fn test_parse_hidden_units() {
        assert_eq!(parse_hidden_units("200,200").unwrap(), vec![200, 200]);
        assert_eq!(parse_hidden_units(" 64 , 32 ").unwrap(), vec![64, 32]);
        assert!(parse_hidden_units("200,abc").is_err());
        assert!(parse_hidden_units("200,0").is_err());
    }

    #[test]
    fn test_rank_labels_orders_by_score() {
        let labels: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let scores = array![[0.1, 0.9, 0.5]];
        let ranked = rank_labels(&scores, &labels, 2);
        assert_eq!(ranked, vec![vec!["b".to_string(), "c".to_string()]]);
    }

    #[test]
    fn test_rank_labels_truncates_to_k() {
        let labels: Vec<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let scores = array![[1.0, 2.0]];
        let ranked = rank_labels(&scores, &labels, 5);
        assert_eq!(ranked[0].len(), 2);
    }
}
