//! Lumen Core - dataset preparation and train/evaluate driver for
//! image-to-text embedding models.
//!
//! Lumen pairs precomputed image feature files with tag annotations, wraps
//! pretrained word-vector models behind one lookup interface, and drives a
//! generic train/evaluate loop over pluggable model variants.
//!
//! # Architecture
//!
//! ```text
//! Feature files → Dataset ─┐
//! Word vectors  → WordVectors ─┤→ Model (multihot | naivesum | wdv | negsamp)
//!                              │        ↓ fit / predict (Session owns state)
//!                              └→ train → evaluate (top-k P/R/F1)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumen_core::dataset::Dataset;
//! use lumen_core::model::{build_model, ModelKind, Session, TrainOptions};
//! use lumen_core::wordvec::{WordVecFormat, WordVectors};
//! use lumen_core::train;
//!
//! let train_set = Dataset::load(&images, &text, true)?;
//! let words = WordVectors::load(&vectors, WordVecFormat::Glove)?;
//! let model = build_model(
//!     ModelKind::Multihot,
//!     &words,
//!     &[&train_set],
//!     train_set.feature_dim(),
//!     &TrainOptions::default(),
//! )?;
//!
//! let mut session = Session::new();
//! model.initialize(&mut session);
//! let history = train::train(&mut session, model.as_ref(), 200, &train_set, 128, 10, None)?;
//! ```

// Module declarations
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod math;
pub mod model;
pub mod tracking;
pub mod train;
pub mod wordvec;

// Re-exports for convenient access
pub use config::Config;
pub use dataset::Dataset;
pub use error::{ConfigError, DatasetError, LumenError, ModelError, Result, WordVecError};
pub use evaluation::{Evaluation, Scores};
pub use model::{build_model, Model, ModelKind, Session, TrainOptions};
pub use tracking::{RunConfig, Tracker};
pub use wordvec::{WordVecFormat, WordVectors};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config_matches_cli_defaults() {
        let config = Config::default();
        assert_eq!(config.training.batch_size, 128);
        assert_eq!(config.training.num_epochs, 200);
    }
}
