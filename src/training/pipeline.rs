//! 学習パイプライン: 読み込み → シャッフル → 分割 → 学習 → 評価 → 保存。
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::corpus::{Corpus, CorpusRecord, load_corpus};
use super::split::train_test_split;
use crate::classification::{
    ArtifactPair, DEFAULT_ALPHA, DEFAULT_MAX_DF, Label, NaiveBayesModel, TfidfVectorizer,
    VectorizerOptions,
};
use crate::evaluation::{ClassificationReport, MetricsCalculator};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub real_corpus: PathBuf,
    pub fake_corpus: PathBuf,
    pub model_path: PathBuf,
    pub vectorizer_path: PathBuf,
    pub seed: u64,
    pub test_fraction: f64,
    pub max_df: f64,
    pub alpha: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            real_corpus: PathBuf::from("dataset/True.csv"),
            fake_corpus: PathBuf::from("dataset/Fake.csv"),
            model_path: PathBuf::from("model/fake_news_model.json"),
            vectorizer_path: PathBuf::from("model/vectorizer.json"),
            seed: DEFAULT_SEED,
            test_fraction: DEFAULT_TEST_FRACTION,
            max_df: DEFAULT_MAX_DF,
            alpha: DEFAULT_ALPHA,
        }
    }
}

/// インメモリ学習の結果。
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub pair: ArtifactPair,
    pub report: ClassificationReport,
    pub train_size: usize,
    /// 評価用に回したテキスト（分割の再現性確認用）。
    pub test_texts: Vec<String>,
}

/// 学習ジョブの報告。
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub run_id: Uuid,
    pub train_size: usize,
    pub test_size: usize,
    pub vocabulary_size: usize,
    pub accuracy: f64,
    pub classification: ClassificationReport,
}

impl TrainingOutcome {
    #[must_use]
    pub fn summary(&self) -> TrainingReport {
        TrainingReport {
            run_id: self.pair.run_id(),
            train_size: self.train_size,
            test_size: self.test_texts.len(),
            vocabulary_size: self.pair.vectorizer().vocabulary_size(),
            accuracy: self.report.accuracy,
            classification: self.report.clone(),
        }
    }
}

/// シャッフルと分割を行い、学習側だけでベクトライザと分類器を学習して評価する。
///
/// # Errors
/// 分割・語彙構築・分類器学習のいずれかに失敗した場合。
pub fn train(mut corpus: Corpus, options: &TrainingOptions) -> Result<TrainingOutcome> {
    let started = Instant::now();
    corpus.shuffle(options.seed);
    let split = train_test_split(corpus.into_records(), options.test_fraction, options.seed)
        .context("failed to split corpus")?;

    let (train_texts, train_labels): (Vec<String>, Vec<Label>) = split
        .train
        .into_iter()
        .map(|CorpusRecord { text, label }| (text, label))
        .unzip();
    let (test_texts, test_labels): (Vec<String>, Vec<Label>) = split
        .test
        .into_iter()
        .map(|CorpusRecord { text, label }| (text, label))
        .unzip();

    let vectorizer = TfidfVectorizer::fit(
        &train_texts,
        VectorizerOptions {
            max_df: options.max_df,
            remove_stop_words: true,
        },
    )
    .context("failed to fit vectorizer")?;
    let train_features = vectorizer.transform_batch(&train_texts);
    let model = NaiveBayesModel::fit(
        &train_features,
        &train_labels,
        vectorizer.vocabulary_size(),
        options.alpha,
    )
    .context("failed to fit classifier")?;

    let mut calculator = MetricsCalculator::new();
    for (features, expected) in vectorizer
        .transform_batch(&test_texts)
        .iter()
        .zip(&test_labels)
    {
        let predicted = model
            .predict(features)
            .context("failed to classify held-out document")?;
        calculator.push(*expected, predicted);
    }
    let report = calculator.finalize();

    info!(
        train = train_texts.len(),
        test = test_texts.len(),
        vocabulary = vectorizer.vocabulary_size(),
        accuracy = report.accuracy,
        elapsed_ms = started.elapsed().as_millis(),
        "training finished"
    );

    Ok(TrainingOutcome {
        pair: ArtifactPair::new(vectorizer, model).context("failed to assemble artifact pair")?,
        report,
        train_size: train_texts.len(),
        test_texts,
    })
}

/// 学習ジョブ全体。コーパスを読み込み、学習し、成果物ペアを保存する。
///
/// # Errors
/// コーパスの読み込み、学習、保存のいずれかに失敗した場合。再試行はしない。
pub fn run(options: &TrainingOptions) -> Result<TrainingReport> {
    let corpus = load_corpus(&options.real_corpus, &options.fake_corpus)
        .context("failed to load training corpus")?;
    let outcome = train(corpus, options)?;
    outcome
        .pair
        .save(&options.model_path, &options.vectorizer_path)
        .context("failed to persist artifact pair")?;
    Ok(outcome.summary())
}
