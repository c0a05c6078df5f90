//! Error types for the Lumen training pipeline.
//!
//! Errors are organized by stage to provide clear, actionable error messages
//! that include relevant context (file paths, line numbers, shapes).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Lumen operations.
#[derive(Error, Debug)]
pub enum LumenError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Dataset loading and preparation errors
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Word-vector loading errors
    #[error("Word vector error: {0}")]
    WordVec(#[from] WordVecError),

    /// Model and training errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Dataset loading and preparation errors.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Failed to read a feature file
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// A feature file line failed to parse
    #[error("Parse error in {path} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Image- and text-feature files do not align one-to-one by sample id
    #[error("Feature files misaligned for {path}: {message}")]
    Misaligned { path: PathBuf, message: String },

    /// Feature vectors within one file differ in length
    #[error(
        "Feature dimension mismatch in {path}: expected {expected}, got {found} at line {line}"
    )]
    Dimension {
        path: PathBuf,
        expected: usize,
        found: usize,
        line: usize,
    },

    /// An annotation document could not be interpreted
    #[error("Malformed annotation: {0}")]
    Annotation(String),
}

/// Word-vector loading errors.
#[derive(Error, Debug)]
pub enum WordVecError {
    /// Failed to read the word-vector file
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// A record in the file is malformed
    #[error("Malformed record in {path} at entry {entry}: {message}")]
    Malformed {
        path: PathBuf,
        entry: usize,
        message: String,
    },

    /// A vector's length disagrees with the declared or inferred dimension
    #[error("Dimension mismatch in {path}: expected {expected}, got {found}")]
    Dimension {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    /// The file contains no vectors
    #[error("No word vectors found in {path}")]
    Empty { path: PathBuf },
}

/// Model construction, training, and checkpoint errors.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Incompatible tensor shapes reached an operation
    #[error("Shape error: {0}")]
    Shape(String),

    /// An epoch produced no batches (dataset smaller than batch size)
    #[error("Epoch yielded no batches: {samples} sample(s) with batch size {batch_size}")]
    EmptyEpoch { samples: usize, batch_size: usize },

    /// Checkpoint read/write failure
    #[error("Checkpoint error for {path}: {message}")]
    Checkpoint { path: PathBuf, message: String },

    /// A checkpoint was built against a different label vocabulary
    #[error("Checkpoint vocabulary mismatch for {path}: expected hash {expected}, got {found}")]
    VocabularyMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// The model's label vocabulary is empty (no dataset tag survived the word vectors)
    #[error("Empty label vocabulary: {0}")]
    EmptyVocabulary(String),
}

/// Convenience type alias for Lumen results.
pub type Result<T> = std::result::Result<T, LumenError>;
