//! 統合テスト共通: 小さなコーパスを書き出して学習済みペアを作る。
#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use fake_news_detector::training::{self, TrainingOptions, TrainingReport};
use tempfile::TempDir;

const REAL_WORDS: [&str; 12] = [
    "nasa", "telescope", "orbit", "mission", "rover", "launch", "scientists", "study",
    "published", "agency", "satellite", "research",
];
const FAKE_WORDS: [&str; 12] = [
    "microchip", "hoax", "secret", "cabal", "vaccine", "conspiracy", "shocking", "exposed",
    "elites", "cover", "plot", "tracking",
];
pub const DOCS_PER_CLASS: usize = 30;

fn document(words: &[&str], idx: usize) -> String {
    (0..5)
        .map(|offset| words[(idx * 7 + offset * 5) % words.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

fn corpus_csv(words: &[&str], subject: &str) -> String {
    let mut csv = String::from("title,text,subject\n");
    for idx in 0..DOCS_PER_CLASS {
        writeln!(csv, "headline {idx},{},{subject}", document(words, idx)).expect("write row");
    }
    csv
}

/// `True.csv` と `Fake.csv` を書き出す。
pub fn write_corpus(dir: &Path) -> (PathBuf, PathBuf) {
    let real = dir.join("True.csv");
    let fake = dir.join("Fake.csv");
    fs::write(&real, corpus_csv(&REAL_WORDS, "science")).expect("write real corpus");
    fs::write(&fake, corpus_csv(&FAKE_WORDS, "politics")).expect("write fake corpus");
    (real, fake)
}

pub fn options(dir: &Path, real: PathBuf, fake: PathBuf) -> TrainingOptions {
    TrainingOptions {
        real_corpus: real,
        fake_corpus: fake,
        model_path: dir.join("model").join("fake_news_model.json"),
        vectorizer_path: dir.join("model").join("vectorizer.json"),
        ..TrainingOptions::default()
    }
}

pub struct TrainedArtifacts {
    pub dir: TempDir,
    pub model: PathBuf,
    pub vectorizer: PathBuf,
    pub report: TrainingReport,
}

/// 一時ディレクトリで学習ジョブを実行する。
pub fn train_artifacts() -> TrainedArtifacts {
    let dir = tempfile::tempdir().expect("tempdir");
    let (real, fake) = write_corpus(dir.path());
    let options = options(dir.path(), real, fake);
    let report = training::run(&options).expect("training run");
    TrainedArtifacts {
        model: options.model_path,
        vectorizer: options.vectorizer_path,
        dir,
        report,
    }
}
