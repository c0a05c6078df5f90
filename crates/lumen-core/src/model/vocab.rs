//! Label vocabulary shared by all model variants.
//!
//! The vocabulary is the set of dataset tags that survive the word-vector
//! lookup, sorted for determinism, with each label's (L2-normalized)
//! embedding stored as one row of a V×D matrix. Corpus frequencies are kept
//! for frequency-weighted target construction.

use std::collections::{BTreeMap, HashMap};

use ndarray::Array2;

use crate::dataset::Dataset;
use crate::error::ModelError;
use crate::math::l2_normalize;
use crate::wordvec::WordVectors;

/// An immutable label vocabulary with per-label embeddings and counts.
pub struct LabelVocab {
    labels: Vec<String>,
    by_label: HashMap<String, usize>,
    /// V × D, one L2-normalized word vector per label.
    embeddings: Array2<f32>,
    counts: Vec<usize>,
    dim: usize,
}

impl LabelVocab {
    /// Build the vocabulary from the tags of the given datasets.
    ///
    /// Tags without a word vector are dropped. Labels are sorted so the same
    /// inputs always produce the same vocabulary (and the same content hash).
    pub fn build(
        word_vectors: &WordVectors,
        datasets: &[&Dataset],
    ) -> Result<Self, ModelError> {
        let mut counted: BTreeMap<String, usize> = BTreeMap::new();
        let mut dropped = 0usize;
        for dataset in datasets {
            for tags in dataset.all_tags() {
                for tag in tags {
                    if word_vectors.contains(tag) {
                        *counted.entry(tag.clone()).or_default() += 1;
                    } else {
                        dropped += 1;
                    }
                }
            }
        }

        if counted.is_empty() {
            return Err(ModelError::EmptyVocabulary(
                "no dataset tag has a word vector".to_string(),
            ));
        }

        let dim = word_vectors.dim();
        let labels: Vec<String> = counted.keys().cloned().collect();
        let counts: Vec<usize> = counted.values().copied().collect();

        let mut embeddings = Array2::<f32>::zeros((labels.len(), dim));
        for (i, label) in labels.iter().enumerate() {
            if let Some(vector) = word_vectors.get(label) {
                for (j, &v) in l2_normalize(vector).iter().enumerate() {
                    embeddings[[i, j]] = v;
                }
            }
        }

        let by_label = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();

        tracing::info!(
            "Built label vocabulary: {} labels ({} tag occurrence(s) without word vectors dropped)",
            labels.len(),
            dropped
        );

        Ok(Self {
            labels,
            by_label,
            embeddings,
            counts,
            dim,
        })
    }

    /// Build a vocabulary directly from labeled vectors (for tests).
    pub fn from_raw(entries: Vec<(String, Vec<f32>, usize)>, dim: usize) -> Self {
        let labels: Vec<String> = entries.iter().map(|(l, _, _)| l.clone()).collect();
        let counts: Vec<usize> = entries.iter().map(|(_, _, c)| *c).collect();
        let mut embeddings = Array2::<f32>::zeros((labels.len(), dim));
        for (i, (_, vector, _)) in entries.iter().enumerate() {
            for (j, &v) in l2_normalize(vector).iter().enumerate() {
                embeddings[[i, j]] = v;
            }
        }
        let by_label = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        Self {
            labels,
            by_label,
            embeddings,
            counts,
            dim,
        }
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Word-vector dimensionality.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// All labels, in embedding row order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Row index for a label, `None` when out of vocabulary.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.by_label.get(label).copied()
    }

    /// The V×D embedding matrix.
    pub fn embeddings(&self) -> &Array2<f32> {
        &self.embeddings
    }

    /// Corpus frequency of the label at `index`.
    pub fn count(&self, index: usize) -> usize {
        self.counts[index]
    }

    /// Inverse-frequency weight for the label at `index`: rare labels pull
    /// targets harder than ubiquitous ones.
    pub fn inverse_freq_weight(&self, index: usize) -> f32 {
        1.0 / (1.0 + (self.counts[index] as f32).ln())
    }

    /// Filter a tag list down to in-vocabulary labels.
    pub fn known(&self, tags: &[String]) -> Vec<String> {
        tags.iter()
            .filter(|t| self.by_label.contains_key(t.as_str()))
            .cloned()
            .collect()
    }

    /// Multi-hot row over the vocabulary for a tag list.
    pub fn multihot(&self, tags: &[String]) -> Vec<f32> {
        let mut row = vec![0.0; self.labels.len()];
        for tag in tags {
            if let Some(i) = self.index_of(tag) {
                row[i] = 1.0;
            }
        }
        row
    }

    /// Compute a BLAKE3 hash of all labels in order.
    ///
    /// Stored in checkpoint sidecars — a checkpoint trained against a
    /// different vocabulary must not be loaded.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for label in &self.labels {
            hasher.update(label.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }
}
