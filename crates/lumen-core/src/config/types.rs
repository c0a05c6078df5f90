//! Sub-configuration structs with defaults matching the CLI defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where downloaded corpora and converted feature files land
    pub data_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.lumen/data"),
        }
    }
}

/// Training defaults. CLI flags take precedence over these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// SGD learning rate
    pub learning_rate: f32,

    /// Number of epochs per run
    pub num_epochs: usize,

    /// Samples per optimization step
    pub batch_size: usize,

    /// Log (and optionally evaluate) every this many epochs
    pub epoch_verbosity: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            num_epochs: 200,
            batch_size: 128,
            epoch_verbosity: 10,
        }
    }
}

/// Experiment tracking settings.
///
/// Tracking activates only when both `enabled` is true and the environment
/// variable named by `uri_env` is set to an HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Master switch; set false to ignore the environment entirely
    pub enabled: bool,

    /// Name of the environment variable supplying the tracking endpoint URI
    pub uri_env: String,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            uri_env: "LUMEN_TRACKING_URI".to_string(),
            timeout_ms: 5000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
