//! The computation session owning all mutable model state.
//!
//! Parameters are created by `Model::initialize`, mutated by `fit`, persisted
//! via explicit `save`, and dropped with the session. Checkpoints are raw
//! little-endian f32 tensor data with a `.meta` sidecar recording shapes and
//! the label-vocabulary hash, so a checkpoint trained against a different
//! vocabulary is rejected at load time.

use std::path::Path;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::ModelError;

use super::mlp::Dense;

/// Mutable model state scoped to one training run.
pub struct Session {
    layers: Vec<Dense>,
    /// Trainable copy of the label embedding table (joint word optimization).
    label_embeddings: Option<Array2<f32>>,
    rng: StdRng,
}

impl Session {
    /// Create a session with an entropy-seeded RNG.
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            label_embeddings: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a session with a fixed RNG seed (deterministic runs and tests).
    pub fn with_seed(seed: u64) -> Self {
        Self {
            layers: Vec::new(),
            label_embeddings: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The layer stack. Empty until a model initializes the session.
    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Dense] {
        &mut self.layers
    }

    pub(crate) fn set_layers(&mut self, layers: Vec<Dense>) {
        self.layers = layers;
    }

    /// Trainable label embedding table, when the model registered one.
    pub fn label_embeddings(&self) -> Option<&Array2<f32>> {
        self.label_embeddings.as_ref()
    }

    pub(crate) fn label_embeddings_mut(&mut self) -> Option<&mut Array2<f32>> {
        self.label_embeddings.as_mut()
    }

    pub(crate) fn set_label_embeddings(&mut self, embeddings: Array2<f32>) {
        self.label_embeddings = Some(embeddings);
    }

    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Error unless a model has initialized this session.
    pub fn ensure_initialized(&self) -> Result<(), ModelError> {
        if self.layers.is_empty() {
            return Err(ModelError::Shape(
                "session has no parameters; call initialize first".to_string(),
            ));
        }
        Ok(())
    }

    /// Save all parameters to `path` as raw little-endian f32, with a
    /// `.meta` sidecar carrying shapes and the vocabulary hash.
    pub fn save(&self, path: &Path, vocab_hash: &str) -> Result<(), ModelError> {
        self.ensure_initialized()?;

        let mut bytes: Vec<u8> = Vec::new();
        for layer in &self.layers {
            for &v in layer.weights.iter() {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            for &v in layer.bias.iter() {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        }
        if let Some(embeddings) = &self.label_embeddings {
            for &v in embeddings.iter() {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        }

        std::fs::write(path, &bytes).map_err(|e| ModelError::Checkpoint {
            path: path.to_path_buf(),
            message: format!("write failed: {}", e),
        })?;

        let mut meta = format!("vocab_hash={}\nlayer_count={}\n", vocab_hash, self.layers.len());
        for (i, layer) in self.layers.iter().enumerate() {
            meta.push_str(&format!("layer{}={}x{}\n", i, layer.fan_in(), layer.fan_out()));
        }
        if let Some(embeddings) = &self.label_embeddings {
            meta.push_str(&format!(
                "label_embeddings={}x{}\n",
                embeddings.nrows(),
                embeddings.ncols()
            ));
        }
        let meta_path = path.with_extension("meta");
        std::fs::write(&meta_path, meta).map_err(|e| ModelError::Checkpoint {
            path: meta_path.clone(),
            message: format!("write failed: {}", e),
        })?;

        tracing::info!(
            "Saved checkpoint to {:?} ({:.1} MB)",
            path,
            bytes.len() as f64 / 1_000_000.0
        );
        Ok(())
    }

    /// Load a checkpoint into this (already initialized) session.
    ///
    /// The sidecar's vocabulary hash must equal `expected_vocab_hash` and
    /// every recorded shape must match the session's current parameters.
    pub fn load_into(&mut self, path: &Path, expected_vocab_hash: &str) -> Result<(), ModelError> {
        self.ensure_initialized()?;

        let meta_path = path.with_extension("meta");
        let meta = std::fs::read_to_string(&meta_path).map_err(|e| ModelError::Checkpoint {
            path: meta_path.clone(),
            message: format!("read failed: {}", e),
        })?;

        let found_hash = meta_field(&meta, "vocab_hash").unwrap_or_default();
        if found_hash != expected_vocab_hash {
            return Err(ModelError::VocabularyMismatch {
                path: path.to_path_buf(),
                expected: expected_vocab_hash.to_string(),
                found: found_hash.to_string(),
            });
        }

        let layer_count: usize = meta_field(&meta, "layer_count")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| checkpoint_error(path, "missing layer_count"))?;
        if layer_count != self.layers.len() {
            return Err(checkpoint_error(
                path,
                &format!(
                    "layer count mismatch: checkpoint has {}, model has {}",
                    layer_count,
                    self.layers.len()
                ),
            ));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            let expected = format!("{}x{}", layer.fan_in(), layer.fan_out());
            let found = meta_field(&meta, &format!("layer{}", i)).unwrap_or_default();
            if found != expected {
                return Err(checkpoint_error(
                    path,
                    &format!("layer {} shape mismatch: checkpoint {:?}, model {}", i, found, expected),
                ));
            }
        }
        let embeddings_declared = meta_field(&meta, "label_embeddings").is_some();
        if embeddings_declared != self.label_embeddings.is_some() {
            return Err(checkpoint_error(
                path,
                "label embedding table presence differs from model",
            ));
        }
        if let (Some(found), Some(embeddings)) =
            (meta_field(&meta, "label_embeddings"), &self.label_embeddings)
        {
            let expected = format!("{}x{}", embeddings.nrows(), embeddings.ncols());
            if found != expected {
                return Err(checkpoint_error(
                    path,
                    &format!(
                        "label embedding shape mismatch: checkpoint {:?}, model {}",
                        found, expected
                    ),
                ));
            }
        }

        let bytes = std::fs::read(path).map_err(|e| ModelError::Checkpoint {
            path: path.to_path_buf(),
            message: format!("read failed: {}", e),
        })?;
        let expected_len = self.parameter_count() * 4;
        if bytes.len() != expected_len {
            return Err(checkpoint_error(
                path,
                &format!("size mismatch: expected {} bytes, got {}", expected_len, bytes.len()),
            ));
        }

        let mut values = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]));
        for layer in &mut self.layers {
            for slot in layer.weights.iter_mut() {
                if let Some(v) = values.next() {
                    *slot = v;
                }
            }
            for slot in layer.bias.iter_mut() {
                if let Some(v) = values.next() {
                    *slot = v;
                }
            }
        }
        if let Some(embeddings) = &mut self.label_embeddings {
            for slot in embeddings.iter_mut() {
                if let Some(v) = values.next() {
                    *slot = v;
                }
            }
        }

        tracing::info!("Loaded checkpoint from {:?}", path);
        Ok(())
    }

    fn parameter_count(&self) -> usize {
        let layer_params: usize = self
            .layers
            .iter()
            .map(|l| l.weights.len() + l.bias.len())
            .sum();
        let embedding_params = self.label_embeddings.as_ref().map_or(0, |e| e.len());
        layer_params + embedding_params
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Look up a `key=value` line in a checkpoint sidecar.
fn meta_field<'a>(meta: &'a str, key: &str) -> Option<&'a str> {
    meta.lines()
        .find_map(|line| line.strip_prefix(key).and_then(|rest| rest.strip_prefix('=')))
}

fn checkpoint_error(path: &Path, message: &str) -> ModelError {
    ModelError::Checkpoint {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}
