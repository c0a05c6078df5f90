//! Optional experiment tracking over HTTP.
//!
//! A run reports two documents to the endpoint named by the tracking
//! environment variable: a start document carrying the fully declared run
//! configuration, and a finish document with the loss history and final
//! scores. When the variable is unset (or tracking is disabled in config),
//! the run proceeds without tracking. Failures after startup are logged and
//! never abort training.

use std::time::Duration;

use serde::Serialize;

use crate::config::TrackingConfig;
use crate::evaluation::Scores;

const EXPERIMENT: &str = "lumen";

/// The run configuration reported verbatim at run start.
///
/// Every knob the run honors is declared here — the tracking backend sees
/// the real configuration, not a partial or patched one.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub model_type: String,
    pub word_vector_format: String,
    pub learning_rate: f32,
    pub num_epochs: usize,
    pub batch_size: usize,
    pub epoch_verbosity: usize,
    pub hidden_units: Vec<usize>,
    pub in_memory: bool,
    pub cross_eval: bool,
    pub verbose_eval: bool,
    pub optim_words: bool,
    pub image_feature_file_train: String,
    pub text_feature_file_train: String,
    pub image_feature_file_test: String,
    pub text_feature_file_test: String,
    pub word_vector_file: String,
}

#[derive(Serialize)]
struct StartDocument<'a> {
    experiment: &'a str,
    event: &'a str,
    config: &'a RunConfig,
}

#[derive(Serialize)]
struct FinishDocument<'a> {
    experiment: &'a str,
    event: &'a str,
    loss_history: &'a [f32],
    scores: &'a Scores,
}

/// HTTP reporter for one training run.
pub struct Tracker {
    client: reqwest::Client,
    uri: String,
}

impl Tracker {
    /// Build a tracker from config and environment.
    ///
    /// Returns `None` when tracking is disabled in config or the URI
    /// environment variable is unset or empty — the run simply proceeds
    /// untracked.
    pub fn from_env(config: &TrackingConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let uri = match std::env::var(&config.uri_env) {
            Ok(uri) if !uri.trim().is_empty() => uri,
            _ => {
                tracing::debug!("{} not set; experiment tracking disabled", config.uri_env);
                return None;
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .ok()?;

        tracing::info!("Experiment tracking enabled ({})", uri);
        Some(Self { client, uri })
    }

    /// Report the start of a run with its full configuration.
    pub async fn report_start(&self, config: &RunConfig) {
        self.post(&StartDocument {
            experiment: EXPERIMENT,
            event: "start",
            config,
        })
        .await;
    }

    /// Report the end of a run with its loss history and final scores.
    pub async fn report_finish(&self, loss_history: &[f32], scores: &Scores) {
        self.post(&FinishDocument {
            experiment: EXPERIMENT,
            event: "finish",
            loss_history,
            scores,
        })
        .await;
    }

    async fn post<T: Serialize>(&self, document: &T) {
        match self.client.post(&self.uri).json(document).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!("Tracking endpoint returned {}", response.status());
            }
            Err(e) => {
                tracing::warn!("Tracking request failed: {}", e);
            }
        }
    }
}
