//! ユニットテスト用の小さな学習済みペアとルーター。
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use tower::ServiceExt;

use crate::acquisition::{Article, ArticleSource, FetchError};
use crate::app::{ComponentRegistry, build_router};
use crate::classification::{
    ArtifactPair, DEFAULT_ALPHA, Label, NaiveBayesModel, TfidfVectorizer, VectorizerOptions,
};
use crate::config::Config;
use crate::observability::Telemetry;
use crate::session::SESSION_HEADER;

/// REAL は NASA 系、FAKE は microchip 系の語だけを含む均衡コーパス。
pub(crate) fn corpus() -> (Vec<String>, Vec<Label>) {
    let real = [
        "NASA telescope orbit mission update",
        "NASA rover mission lands safely",
        "telescope captures distant galaxy orbit",
        "NASA announces new rover launch window",
    ];
    let fake = [
        "microchip hoax secret cabal claim",
        "secret microchip implanted vaccine hoax",
        "cabal hides microchip towers secret",
        "hoax claim microchip tracking plot",
    ];
    real.iter()
        .map(|t| ((*t).to_string(), Label::Real))
        .chain(fake.iter().map(|t| ((*t).to_string(), Label::Fake)))
        .unzip()
}

pub(crate) fn trained_pair() -> ArtifactPair {
    let (texts, labels) = corpus();
    let vectorizer = TfidfVectorizer::fit(&texts, VectorizerOptions::default()).expect("vectorizer");
    let features = vectorizer.transform_batch(&texts);
    let model = NaiveBayesModel::fit(&features, &labels, vectorizer.vocabulary_size(), DEFAULT_ALPHA)
        .expect("model");
    ArtifactPair::new(vectorizer, model).expect("pair")
}

/// 固定の応答を返す記事取得スタブ。
pub(crate) enum StubArticles {
    Text(&'static str),
    TimedOut,
}

#[async_trait]
impl ArticleSource for StubArticles {
    async fn fetch(&self, url: &str) -> Result<Article, FetchError> {
        match self {
            Self::Text(text) => Ok(Article {
                url: url.to_string(),
                text: (*text).to_string(),
            }),
            Self::TimedOut => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
        }
    }
}

pub(crate) fn router_with(source: StubArticles) -> Router {
    let telemetry = Telemetry::metrics_only().expect("telemetry");
    build_router(ComponentRegistry::from_parts(
        Config::default(),
        telemetry,
        trained_pair(),
        Arc::new(source),
    ))
}

pub(crate) fn json_request(uri: &str, body: &serde_json::Value, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = session {
        builder = builder.header(SESSION_HEADER, id);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub(crate) async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, serde_json::Value) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, headers, value)
}

pub(crate) fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .expect("session header")
        .to_string()
}
