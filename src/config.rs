use std::{
    env,
    net::{Ipv4Addr, SocketAddr},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;

#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

const DEFAULT_HTTP_BIND: &str = "0.0.0.0:8501";
const DEFAULT_MODEL_PATH: &str = "model/fake_news_model.json";
const DEFAULT_VECTORIZER_PATH: &str = "model/vectorizer.json";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    model_path: PathBuf,
    vectorizer_path: PathBuf,
    prediction_cache_capacity: usize,
    fetch_connect_timeout: Duration,
    fetch_total_timeout: Duration,
    max_upload_bytes: NonZeroUsize,
    snippet_chars: NonZeroUsize,
    article_preview_chars: NonZeroUsize,
    csv_history_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8501)),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            vectorizer_path: PathBuf::from(DEFAULT_VECTORIZER_PATH),
            prediction_cache_capacity: 1024,
            fetch_connect_timeout: Duration::from_millis(3_000),
            fetch_total_timeout: Duration::from_millis(15_000),
            max_upload_bytes: NonZeroUsize::new(DEFAULT_MAX_UPLOAD_BYTES).unwrap_or(NonZeroUsize::MIN),
            snippet_chars: NonZeroUsize::new(60).unwrap_or(NonZeroUsize::MIN),
            article_preview_chars: NonZeroUsize::new(600).unwrap_or(NonZeroUsize::MIN),
            csv_history_rows: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// 環境変数から設定値を読み込み、検証する。未設定の値はデフォルトを使う。
    ///
    /// # Errors
    /// 数値・アドレスのパースに失敗した場合、または値が範囲外の場合。
    pub fn from_env() -> Result<Self, ConfigError> {
        let fetch_connect_timeout =
            parse_positive_duration_ms("DETECTOR_FETCH_CONNECT_TIMEOUT_MS", 3_000)?;
        let fetch_total_timeout =
            parse_positive_duration_ms("DETECTOR_FETCH_TOTAL_TIMEOUT_MS", 15_000)?;
        if fetch_connect_timeout > fetch_total_timeout {
            return Err(ConfigError::Invalid {
                name: "DETECTOR_FETCH_CONNECT_TIMEOUT_MS",
                source: anyhow::anyhow!("must not exceed DETECTOR_FETCH_TOTAL_TIMEOUT_MS"),
            });
        }

        Ok(Self {
            http_bind: parse_socket_addr("DETECTOR_HTTP_BIND", DEFAULT_HTTP_BIND)?,
            model_path: parse_path("DETECTOR_MODEL_PATH", DEFAULT_MODEL_PATH)?,
            vectorizer_path: parse_path("DETECTOR_VECTORIZER_PATH", DEFAULT_VECTORIZER_PATH)?,
            prediction_cache_capacity: parse_usize("DETECTOR_PREDICTION_CACHE_CAPACITY", 1024)?,
            fetch_connect_timeout,
            fetch_total_timeout,
            max_upload_bytes: parse_non_zero_usize(
                "DETECTOR_MAX_UPLOAD_BYTES",
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
            snippet_chars: parse_non_zero_usize("DETECTOR_SNIPPET_CHARS", 60)?,
            article_preview_chars: parse_non_zero_usize("DETECTOR_ARTICLE_PREVIEW_CHARS", 600)?,
            csv_history_rows: parse_usize("DETECTOR_CSV_HISTORY_ROWS", 5)?,
        })
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    #[must_use]
    pub fn vectorizer_path(&self) -> &Path {
        &self.vectorizer_path
    }

    /// 0 ならメモ化しない。
    #[must_use]
    pub fn prediction_cache_capacity(&self) -> usize {
        self.prediction_cache_capacity
    }

    #[must_use]
    pub fn fetch_connect_timeout(&self) -> Duration {
        self.fetch_connect_timeout
    }

    #[must_use]
    pub fn fetch_total_timeout(&self) -> Duration {
        self.fetch_total_timeout
    }

    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes.get()
    }

    #[must_use]
    pub fn snippet_chars(&self) -> usize {
        self.snippet_chars.get()
    }

    #[must_use]
    pub fn article_preview_chars(&self) -> usize {
        self.article_preview_chars.get()
    }

    /// CSV バッチのうち履歴に残す先頭行数。
    #[must_use]
    pub fn csv_history_rows(&self) -> usize {
        self.csv_history_rows
    }

    /// 成果物パスだけを差し替える。
    #[must_use]
    pub fn with_artifact_paths(
        mut self,
        model_path: impl Into<PathBuf>,
        vectorizer_path: impl Into<PathBuf>,
    ) -> Self {
        self.model_path = model_path.into();
        self.vectorizer_path = vectorizer_path.into();
        self
    }

    /// メモの容量だけを差し替える。
    #[must_use]
    pub fn with_prediction_cache_capacity(mut self, capacity: usize) -> Self {
        self.prediction_cache_capacity = capacity;
        self
    }

    /// 取得タイムアウトだけを差し替える。
    #[must_use]
    pub fn with_fetch_timeouts(mut self, connect: Duration, total: Duration) -> Self {
        self.fetch_connect_timeout = connect;
        self.fetch_total_timeout = total;
        self
    }
}

fn parse_socket_addr(name: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());

    raw.parse().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_path(name: &'static str, default: &str) -> Result<PathBuf, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    if raw.trim().is_empty() {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("path must not be empty"),
        });
    }
    Ok(PathBuf::from(raw))
}

fn parse_non_zero_usize(name: &'static str, default: usize) -> Result<NonZeroUsize, ConfigError> {
    let parsed = parse_usize(name, default)?;
    NonZeroUsize::new(parsed).ok_or_else(|| ConfigError::Invalid {
        name,
        source: anyhow::anyhow!("must be greater than zero"),
    })
}

fn parse_positive_duration_ms(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let ms = parse_u64(name, default_ms)?;
    if ms == 0 {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("must be greater than zero"),
        });
    }
    Ok(Duration::from_millis(ms))
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}
