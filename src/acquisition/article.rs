//! URL 取得と本文抽出。
use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{debug, warn};

use crate::util::error::{FetchFailureKind, classify_fetch_error};
use crate::util::text::{collapse_whitespace, truncate_chars};

/// 本文として扱わない要素（中身ごと捨てる）。
const STRIPPED_CONTENT_TAGS: [&str; 10] = [
    "script", "style", "nav", "header", "footer", "aside", "form", "noscript", "head", "title",
];
/// タグだけ外して中身の文字列は残す要素。
const UNWRAPPED_TAGS: [&str; 2] = ["a", "img"];
const RENDER_WIDTH: usize = 10_000;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported URL scheme '{0}', expected http or https")]
    UnsupportedScheme(String),
    #[error("timed out fetching {url}")]
    Timeout { url: String },
    #[error("could not reach {url}: {message}")]
    Unreachable { url: String, message: String },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read response body from {url}: {message}")]
    Body { url: String, message: String },
    #[error("failed to extract article text: {0}")]
    Extraction(String),
    #[error("failed to extract content from the URL")]
    EmptyArticle,
}

/// 抽出済みの記事本文。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub url: String,
    pub text: String,
}

impl Article {
    /// 先頭 `max_chars` 文字のプレビュー。
    #[must_use]
    pub fn preview(&self, max_chars: usize) -> String {
        truncate_chars(&self.text, max_chars)
    }
}

/// 記事の取得元。テストではスタブに差し替える。
#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Article, FetchError>;
}

/// HTTP 経由で記事を取得する。
#[derive(Debug, Clone)]
pub struct ArticleFetcher {
    client: Client,
}

impl ArticleFetcher {
    /// # Errors
    /// HTTPクライアントの構築に失敗した場合。
    pub fn new(connect_timeout: Duration, total_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(total_timeout)
            .user_agent(concat!("fake-news-detector/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build article HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArticleSource for ArticleFetcher {
    async fn fetch(&self, raw_url: &str) -> Result<Article, FetchError> {
        let url = parse_article_url(raw_url)?;
        let started = Instant::now();

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|error| map_request_error(&error, raw_url))?;
        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "article fetch returned non-success status");
            return Err(FetchError::Status {
                url: raw_url.to_string(),
                status: status.as_u16(),
            });
        }
        let html = response
            .text()
            .await
            .map_err(|error| map_request_error(&error, raw_url))?;

        let text = extract_article_text(&html)?;
        debug!(
            url = %url,
            bytes = html.len(),
            chars = text.chars().count(),
            elapsed_ms = started.elapsed().as_millis(),
            "article extracted"
        );
        Ok(Article {
            url: raw_url.to_string(),
            text,
        })
    }
}

/// URL を検証する。http/https 以外は拒否する。
///
/// # Errors
/// 解析できない、またはスキームが対象外の場合。
pub fn parse_article_url(raw: &str) -> Result<Url, FetchError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|error| FetchError::InvalidUrl {
        url: trimmed.to_string(),
        reason: error.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::UnsupportedScheme(other.to_string())),
    }
}

/// HTML から本文らしきテキストを取り出す。
///
/// # Errors
/// 描画に失敗した場合、または本文が空の場合。
pub fn extract_article_text(html: &str) -> Result<String, FetchError> {
    let sanitized = ammonia::Builder::default()
        .rm_tags(&["header", "footer", "nav", "aside"])
        .rm_tags(&UNWRAPPED_TAGS)
        .clean_content_tags(STRIPPED_CONTENT_TAGS.into_iter().collect::<HashSet<_>>())
        .clean(html)
        .to_string();
    let rendered = html2text::from_read(sanitized.as_bytes(), RENDER_WIDTH)
        .map_err(|error| FetchError::Extraction(error.to_string()))?;
    let text = collapse_whitespace(&rendered);
    if text.is_empty() {
        return Err(FetchError::EmptyArticle);
    }
    Ok(text)
}

fn map_request_error(error: &reqwest::Error, url: &str) -> FetchError {
    let url = url.to_string();
    match classify_fetch_error(error) {
        FetchFailureKind::Timeout => {
            warn!(url = %url, "article fetch timed out");
            FetchError::Timeout { url }
        }
        FetchFailureKind::Unreachable => FetchError::Unreachable {
            url,
            message: error.to_string(),
        },
        FetchFailureKind::Status(status) => FetchError::Status {
            url,
            status: status.as_u16(),
        },
        FetchFailureKind::Other => FetchError::Body {
            url,
            message: error.to_string(),
        },
    }
}
