//! The `lumen train` command: the full train/evaluate run.
//!
//! Loads the train and test datasets and the word vectors, constructs the
//! selected model, opens a session, trains for a fixed number of epochs with
//! periodic logging (and optional mid-run evaluation), optionally
//! checkpoints, and always evaluates once at the end.

use clap::{Args, ValueEnum};
use std::path::PathBuf;

use lumen_core::dataset::Dataset;
use lumen_core::model::{build_model, parse_hidden_units, ModelKind, Session, TrainOptions};
use lumen_core::tracking::{RunConfig, Tracker};
use lumen_core::train::{self, MidEval};
use lumen_core::wordvec::{WordVecFormat, WordVectors};
use lumen_core::Config;

/// CLI spelling of the four model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelType {
    Multihot,
    Naivesum,
    Wdv,
    Negsamp,
}

impl From<ModelType> for ModelKind {
    fn from(value: ModelType) -> Self {
        match value {
            ModelType::Multihot => ModelKind::Multihot,
            ModelType::Naivesum => ModelKind::NaiveSum,
            ModelType::Wdv => ModelKind::Wdv,
            ModelType::Negsamp => ModelKind::NegSamp,
        }
    }
}

/// CLI spelling of the word-vector formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WordVectorType {
    W2v,
    Glove,
}

impl From<WordVectorType> for WordVecFormat {
    fn from(value: WordVectorType) -> Self {
        match value {
            WordVectorType::W2v => WordVecFormat::W2v,
            WordVectorType::Glove => WordVecFormat::Glove,
        }
    }
}

/// Arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Image feature file for the training set
    pub image_feature_file_train: PathBuf,

    /// Text feature file for the training set
    pub text_feature_file_train: PathBuf,

    /// Image feature file for the test set
    pub image_feature_file_test: PathBuf,

    /// Text feature file for the test set
    pub text_feature_file_test: PathBuf,

    /// File containing the word vectors
    pub word_vector_file: PathBuf,

    /// Learning rate (default from config, 0.001)
    #[arg(long)]
    pub learning_rate: Option<f32>,

    /// Number of epochs to run for (default from config, 200)
    #[arg(long)]
    pub num_epochs: Option<usize>,

    /// Batch size to use for training (default from config, 128)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Model variant to train
    #[arg(long, value_enum, default_value = "multihot")]
    pub model_type: ModelType,

    /// Load training image features into memory for faster training
    #[arg(long)]
    pub in_memory: bool,

    /// Checkpoint to load before training (to continue training)
    #[arg(long)]
    pub model_input_path: Option<PathBuf>,

    /// Checkpoint to write after training
    #[arg(long)]
    pub model_output_path: Option<PathBuf>,

    /// Comma-separated hidden layer sizes
    #[arg(long, default_value = "200,200")]
    pub hidden_units: String,

    /// Keep the test dataset's tags out of the label vocabulary
    #[arg(long)]
    pub cross_eval: bool,

    /// Format of word_vector_file
    #[arg(long, value_enum)]
    pub word_vector_format: WordVectorType,

    /// Log (and optionally evaluate) every this many epochs (default 10)
    #[arg(long)]
    pub epoch_verbosity: Option<usize>,

    /// Run evaluation against test data at every verbosity checkpoint
    #[arg(long)]
    pub verbose_eval: bool,

    /// With the negsamp model, jointly optimize word embeddings
    #[arg(long)]
    pub optim_words: bool,
}

/// Execute the train command.
pub async fn execute(args: TrainArgs, config: &Config) -> anyhow::Result<()> {
    let learning_rate = args.learning_rate.unwrap_or(config.training.learning_rate);
    let num_epochs = args.num_epochs.unwrap_or(config.training.num_epochs);
    let batch_size = args.batch_size.unwrap_or(config.training.batch_size);
    let epoch_verbosity = args
        .epoch_verbosity
        .unwrap_or(config.training.epoch_verbosity);
    let hidden_units = parse_hidden_units(&args.hidden_units)?;

    tracing::info!("Parsing train and test datasets.");
    let train_dataset = Dataset::load(
        &args.image_feature_file_train,
        &args.text_feature_file_train,
        args.in_memory,
    )?;
    let test_dataset = Dataset::load(
        &args.image_feature_file_test,
        &args.text_feature_file_test,
        false,
    )?;

    tracing::info!("Reading word vectors from file.");
    let word_vectors = WordVectors::load(&args.word_vector_file, args.word_vector_format.into())?;

    let options = TrainOptions {
        learning_rate,
        hidden_units: hidden_units.clone(),
        optim_words: args.optim_words,
        ..TrainOptions::default()
    };
    let vocab_datasets: Vec<&Dataset> = if args.cross_eval {
        vec![&train_dataset]
    } else {
        vec![&train_dataset, &test_dataset]
    };
    let model = build_model(
        args.model_type.into(),
        &word_vectors,
        &vocab_datasets,
        train_dataset.feature_dim(),
        &options,
    )?;

    tracing::info!("Preparing test dataset.");
    let (eval_inputs, eval_truth) = model.prep_predict(&test_dataset)?;

    let tracker = Tracker::from_env(&config.tracking);
    if let Some(tracker) = &tracker {
        tracker
            .report_start(&run_config(
                &args,
                learning_rate,
                num_epochs,
                batch_size,
                epoch_verbosity,
                &hidden_units,
            ))
            .await;
    }

    // Session scope: parameters live from here to the end of evaluation.
    let mut session = Session::new();
    model.initialize(&mut session);
    if let Some(path) = &args.model_input_path {
        model.load(&mut session, path)?;
    }

    tracing::info!("Starting training phase.");
    let mid_eval = args.verbose_eval.then(|| MidEval {
        inputs: eval_inputs.clone(),
        truth: eval_truth.clone(),
    });
    let loss_history = train::train(
        &mut session,
        model.as_ref(),
        num_epochs,
        &train_dataset,
        batch_size,
        epoch_verbosity,
        mid_eval.as_ref(),
    )?;

    if let Some(path) = &args.model_output_path {
        model.save(&session, path)?;
    }

    tracing::info!("Starting evaluation phase.");
    let scores = train::evaluate(&session, model.as_ref(), &eval_inputs, &eval_truth)?;

    if let Some(tracker) = &tracker {
        tracker.report_finish(&loss_history, &scores).await;
    }

    Ok(())
}

fn run_config(
    args: &TrainArgs,
    learning_rate: f32,
    num_epochs: usize,
    batch_size: usize,
    epoch_verbosity: usize,
    hidden_units: &[usize],
) -> RunConfig {
    RunConfig {
        model_type: ModelKind::from(args.model_type).to_string(),
        word_vector_format: WordVecFormat::from(args.word_vector_format).to_string(),
        learning_rate,
        num_epochs,
        batch_size,
        epoch_verbosity,
        hidden_units: hidden_units.to_vec(),
        in_memory: args.in_memory,
        cross_eval: args.cross_eval,
        verbose_eval: args.verbose_eval,
        optim_words: args.optim_words,
        image_feature_file_train: args.image_feature_file_train.display().to_string(),
        text_feature_file_train: args.text_feature_file_train.display().to_string(),
        image_feature_file_test: args.image_feature_file_test.display().to_string(),
        text_feature_file_test: args.text_feature_file_test.display().to_string(),
        word_vector_file: args.word_vector_file.display().to_string(),
    }
}
