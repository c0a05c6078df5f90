//! Lumen CLI - training and dataset-prep driver for image-to-text embedding
//! models.
//!
//! Lumen pairs precomputed image feature files with tag annotations, wraps
//! pretrained word vectors, and trains one of four pluggable model variants,
//! reporting top-k precision/recall/F1 against a held-out test set.
//!
//! # Usage
//!
//! ```bash
//! # Train the default multihot model
//! lumen train train_img.jsonl train_txt.jsonl test_img.jsonl test_txt.jsonl \
//!     glove.txt --word-vector-format glove
//!
//! # Download and convert the IAPR TC-12 annotations
//! lumen prep iaprtc12
//!
//! # View configuration
//! lumen config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Lumen - train and evaluate image-to-text embedding models.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a model and evaluate it against a held-out test set
    Train(cli::train::TrainArgs),

    /// Download and convert annotation corpora
    Prep(cli::prep::PrepArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match lumen_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `lumen config path`."
            );
            lumen_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Lumen v{}", lumen_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Train(args) => cli::train::execute(args, &config).await,
        Commands::Prep(args) => cli::prep::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
