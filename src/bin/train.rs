use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use fake_news_detector::{
    classification::{DEFAULT_ALPHA, DEFAULT_MAX_DF},
    observability,
    training::{
        self, TrainingOptions,
        pipeline::{DEFAULT_SEED, DEFAULT_TEST_FRACTION},
    },
};

/// Train the TF-IDF + Naive Bayes classifier and write the artifact pair.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV of genuine articles (must contain a `text` column)
    #[arg(long, env = "TRAIN_REAL_CORPUS", default_value = "dataset/True.csv")]
    real: PathBuf,

    /// CSV of fabricated articles (must contain a `text` column)
    #[arg(long, env = "TRAIN_FAKE_CORPUS", default_value = "dataset/Fake.csv")]
    fake: PathBuf,

    /// Output path of the classifier artifact
    #[arg(long, env = "TRAIN_MODEL_PATH", default_value = "model/fake_news_model.json")]
    model: PathBuf,

    /// Output path of the vectorizer artifact
    #[arg(long, env = "TRAIN_VECTORIZER_PATH", default_value = "model/vectorizer.json")]
    vectorizer: PathBuf,

    /// Seed for shuffling and splitting
    #[arg(long, env = "TRAIN_SEED", default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Held-out fraction, in (0, 1)
    #[arg(long, env = "TRAIN_TEST_SIZE", default_value_t = DEFAULT_TEST_FRACTION)]
    test_size: f64,

    /// Ignore terms present in more than this share of documents
    #[arg(long, env = "TRAIN_MAX_DF", default_value_t = DEFAULT_MAX_DF)]
    max_df: f64,

    /// Additive smoothing for the classifier
    #[arg(long, env = "TRAIN_ALPHA", default_value_t = DEFAULT_ALPHA)]
    alpha: f64,
}

impl From<Args> for TrainingOptions {
    fn from(args: Args) -> Self {
        Self {
            real_corpus: args.real,
            fake_corpus: args.fake,
            model_path: args.model,
            vectorizer_path: args.vectorizer,
            seed: args.seed,
            test_fraction: args.test_size,
            max_df: args.max_df,
            alpha: args.alpha,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    observability::tracing::init().context("failed to initialize tracing")?;

    let options = TrainingOptions::from(args);
    info!(
        real = %options.real_corpus.display(),
        fake = %options.fake_corpus.display(),
        seed = options.seed,
        test_fraction = options.test_fraction,
        "training started"
    );

    let job_options = options.clone();
    let outcome = tokio::task::spawn_blocking(move || training::run(&job_options))
        .await
        .context("training task panicked")?;
    let report = match outcome {
        Ok(report) => report,
        Err(error) => {
            error!(error = %format!("{error:#}"), "training failed");
            return Err(error);
        }
    };

    println!("Accuracy: {:.4}", report.accuracy);
    println!("{}", report.classification);
    println!(
        "run {} | train {} | test {} | vocabulary {}",
        report.run_id, report.train_size, report.test_size, report.vocabulary_size
    );
    println!(
        "Model saved to {} and vectorizer saved to {}",
        options.model_path.display(),
        options.vectorizer_path.display()
    );
    Ok(())
}
