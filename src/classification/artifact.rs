//! 学習済みベクトライザと分類器のペアを永続化する。
//!
//! 2つのファイルは同じ学習実行で作られたものでなければならない。
//! 各ファイルに実行IDと語彙フィンガープリントを埋め込み、読み込み時に照合する。
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::NaiveBayesModel;
use super::vectorizer::TfidfVectorizer;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact file not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to access artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse artifact {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize artifact: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("unsupported artifact format version {found} in {} (expected {expected})", path.display())]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
    #[error("model and vectorizer come from different training runs (model {model_run}, vectorizer {vectorizer_run})")]
    RunMismatch { model_run: Uuid, vectorizer_run: Uuid },
    #[error("vocabulary fingerprint mismatch: recorded {recorded:016x}, computed {computed:016x}")]
    FingerprintMismatch { recorded: u64, computed: u64 },
    #[error("model expects {model} features but vectorizer produces {vectorizer}")]
    DimensionMismatch { model: usize, vectorizer: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct ArtifactHeader {
    format_version: u32,
    run_id: Uuid,
    vocabulary_fingerprint: u64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactFile<T> {
    header: ArtifactHeader,
    payload: T,
}

/// 同一の学習実行で生成されたベクトライザと分類器。
#[derive(Debug, Clone)]
pub struct ArtifactPair {
    run_id: Uuid,
    created_at: DateTime<Utc>,
    vectorizer: TfidfVectorizer,
    model: NaiveBayesModel,
}

impl ArtifactPair {
    /// 新しい実行IDを払い出してペアを作る。
    ///
    /// # Errors
    /// 分類器の特徴次元が語彙サイズと一致しない場合。
    pub fn new(vectorizer: TfidfVectorizer, model: NaiveBayesModel) -> Result<Self, ArtifactError> {
        check_dimensions(&vectorizer, &model)?;
        Ok(Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            vectorizer,
            model,
        })
    }

    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    #[must_use]
    pub fn model(&self) -> &NaiveBayesModel {
        &self.model
    }

    fn header(&self) -> ArtifactHeader {
        ArtifactHeader {
            format_version: ARTIFACT_FORMAT_VERSION,
            run_id: self.run_id,
            vocabulary_fingerprint: self.vectorizer.fingerprint(),
            created_at: self.created_at,
        }
    }

    /// 2つのファイルへ書き出す。一時ファイルに書いてからリネームする。
    ///
    /// # Errors
    /// シリアライズまたはファイル書き込みに失敗した場合。
    pub fn save(&self, model_path: &Path, vectorizer_path: &Path) -> Result<(), ArtifactError> {
        let header = self.header();
        write_json(
            model_path,
            &ArtifactFile {
                header,
                payload: &self.model,
            },
        )?;
        write_json(
            vectorizer_path,
            &ArtifactFile {
                header,
                payload: &self.vectorizer,
            },
        )?;
        info!(
            run_id = %self.run_id,
            model = %model_path.display(),
            vectorizer = %vectorizer_path.display(),
            vocabulary = self.vectorizer.vocabulary_size(),
            "artifact pair saved"
        );
        Ok(())
    }

    /// 2つのファイルを読み込み、同じ学習実行のものか検証する。
    ///
    /// # Errors
    /// ファイルが存在しない、壊れている、形式バージョンが違う、
    /// または実行ID・フィンガープリント・次元が一致しない場合。
    pub fn load(model_path: &Path, vectorizer_path: &Path) -> Result<Self, ArtifactError> {
        let model_file: ArtifactFile<NaiveBayesModel> = read_json(model_path)?;
        let vectorizer_file: ArtifactFile<TfidfVectorizer> = read_json(vectorizer_path)?;

        for (path, header) in [
            (model_path, &model_file.header),
            (vectorizer_path, &vectorizer_file.header),
        ] {
            if header.format_version != ARTIFACT_FORMAT_VERSION {
                return Err(ArtifactError::UnsupportedVersion {
                    path: path.to_path_buf(),
                    found: header.format_version,
                    expected: ARTIFACT_FORMAT_VERSION,
                });
            }
        }

        if model_file.header.run_id != vectorizer_file.header.run_id {
            return Err(ArtifactError::RunMismatch {
                model_run: model_file.header.run_id,
                vectorizer_run: vectorizer_file.header.run_id,
            });
        }

        let computed = vectorizer_file.payload.fingerprint();
        for recorded in [
            model_file.header.vocabulary_fingerprint,
            vectorizer_file.header.vocabulary_fingerprint,
        ] {
            if recorded != computed {
                return Err(ArtifactError::FingerprintMismatch { recorded, computed });
            }
        }

        check_dimensions(&vectorizer_file.payload, &model_file.payload)?;

        debug!(run_id = %model_file.header.run_id, "artifact pair validated");
        Ok(Self {
            run_id: model_file.header.run_id,
            created_at: model_file.header.created_at,
            vectorizer: vectorizer_file.payload,
            model: model_file.payload,
        })
    }
}

fn check_dimensions(
    vectorizer: &TfidfVectorizer,
    model: &NaiveBayesModel,
) -> Result<(), ArtifactError> {
    if vectorizer.vocabulary_size() == model.n_features() {
        Ok(())
    } else {
        Err(ArtifactError::DimensionMismatch {
            model: model.n_features(),
            vectorizer: vectorizer.vocabulary_size(),
        })
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let io_error = |source: std::io::Error| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let raw = serde_json::to_vec(value).map_err(ArtifactError::Serialize)?;
    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);
    fs::write(&tmp_path, raw).map_err(io_error)?;
    fs::rename(&tmp_path, path).map_err(io_error)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let raw = fs::read(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ArtifactError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    serde_json::from_slice(&raw).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
