//! ラベル付きコーパスの読み込み。
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use thiserror::Error;
use tracing::{info, warn};

use crate::acquisition::table::{Table, TableError};
use crate::classification::Label;

pub const TEXT_COLUMN: &str = "text";

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("corpus file not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to open corpus {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed corpus {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: TableError,
    },
    #[error("corpus {} has no '{TEXT_COLUMN}' column", path.display())]
    MissingTextColumn { path: PathBuf },
    #[error("corpus {} contains no usable texts", path.display())]
    Empty { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusRecord {
    pub text: String,
    pub label: Label,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    records: Vec<CorpusRecord>,
}

impl Corpus {
    #[must_use]
    pub fn from_records(records: Vec<CorpusRecord>) -> Self {
        Self { records }
    }

    /// テキスト列にラベルを付けて連結する。
    #[must_use]
    pub fn from_labeled_texts(real: Vec<String>, fake: Vec<String>) -> Self {
        let records = real
            .into_iter()
            .map(|text| CorpusRecord {
                text,
                label: Label::Real,
            })
            .chain(fake.into_iter().map(|text| CorpusRecord {
                text,
                label: Label::Fake,
            }))
            .collect();
        Self { records }
    }

    #[must_use]
    pub fn records(&self) -> &[CorpusRecord] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<CorpusRecord> {
        self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn count(&self, label: Label) -> usize {
        self.records.iter().filter(|r| r.label == label).count()
    }

    /// 固定シードで全体を並べ替える。
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.records.shuffle(&mut rng);
    }
}

/// 2つのCSVを読み込み、REAL/FAKE を付与して連結する。
///
/// # Errors
/// ファイルが無い、CSVが壊れている、`text` 列が無い、または有効な行が無い場合。
pub fn load_corpus(real_path: &Path, fake_path: &Path) -> Result<Corpus, CorpusError> {
    let real = read_texts(real_path)?;
    let fake = read_texts(fake_path)?;
    let corpus = Corpus::from_labeled_texts(real, fake);
    info!(
        real = corpus.count(Label::Real),
        fake = corpus.count(Label::Fake),
        "corpus loaded"
    );
    Ok(corpus)
}

/// `text` 列を読み込む。空白のみの行は除外する。
///
/// # Errors
/// [`load_corpus`] と同じ。
pub fn read_texts(path: &Path) -> Result<Vec<String>, CorpusError> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            CorpusError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            CorpusError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let table = Table::from_reader(file).map_err(|source| CorpusError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    let column = table
        .column(TEXT_COLUMN)
        .ok_or_else(|| CorpusError::MissingTextColumn {
            path: path.to_path_buf(),
        })?;

    let total = column.len();
    let texts: Vec<String> = column
        .into_iter()
        .filter(|text| !text.trim().is_empty())
        .map(ToString::to_string)
        .collect();
    let skipped = total - texts.len();
    if skipped > 0 {
        warn!(path = %path.display(), skipped, "skipped rows with blank text");
    }
    if texts.is_empty() {
        return Err(CorpusError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(texts)
}
