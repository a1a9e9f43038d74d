//! 入力経路ごとの分類エンドポイント。
use std::time::Instant;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{resolve_session, warning, with_session};
use crate::acquisition::{ExampleKind, FetchError, Table, Upload, UploadError, parse_upload};
use crate::app::AppState;
use crate::history::InputMethod;
use crate::inference::{BatchError, Prediction, PredictionLabel, classify_table};
use crate::session::Session;
use crate::training::corpus::TEXT_COLUMN;
use crate::util::text::{ellipsized_prefix, is_blank, truncate_chars};

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub(crate) struct TextRequest {
    text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UrlRequest {
    url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExampleRequest {
    kind: ExampleKind,
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictionResponse {
    session_id: Uuid,
    prediction: PredictionLabel,
    confidence: f64,
    /// 履歴に追記されたか。
    logged: bool,
}

impl PredictionResponse {
    fn new(session: &Session, prediction: Prediction, logged: bool) -> Self {
        Self {
            session_id: session.id,
            prediction: prediction.label,
            confidence: prediction.confidence,
            logged,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct UrlResponse {
    #[serde(flatten)]
    result: PredictionResponse,
    url: String,
    preview: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExampleResponse {
    #[serde(flatten)]
    result: PredictionResponse,
    kind: ExampleKind,
    text: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum UploadResponse {
    Text {
        session_id: Uuid,
        file_name: String,
        prediction: PredictionLabel,
        confidence: f64,
        logged: bool,
    },
    Table {
        session_id: Uuid,
        file_name: String,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        csv: String,
        /// 履歴に追記した行数。
        logged: usize,
    },
}

pub(crate) async fn text(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TextRequest>,
) -> Response {
    let session = resolve_session(&state, &headers).await;
    if is_blank(&request.text) {
        return with_session(
            &session,
            warning(StatusCode::UNPROCESSABLE_ENTITY, "Please enter some text to analyze."),
        );
    }

    let prediction = predict_blocking(&state, &session, request.text.clone()).await;
    let snippet = ellipsized_prefix(&request.text, state.config().snippet_chars());
    let logged = record(&state, &session, InputMethod::Text, snippet, prediction).await;
    with_session(
        &session,
        Json(PredictionResponse::new(&session, prediction, logged)),
    )
}

pub(crate) async fn url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UrlRequest>,
) -> Response {
    let session = resolve_session(&state, &headers).await;
    let raw_url = request.url.trim();
    if raw_url.is_empty() {
        return with_session(
            &session,
            warning(StatusCode::UNPROCESSABLE_ENTITY, "Please enter a URL to analyze."),
        );
    }

    let metrics = state.telemetry().metrics();
    let started = Instant::now();
    let fetched = state.article_source().fetch(raw_url).await;
    metrics
        .article_fetch_duration
        .observe(started.elapsed().as_secs_f64());

    let article = match fetched {
        Ok(article) => {
            metrics.articles_fetched.inc();
            article
        }
        Err(error) => {
            metrics.article_fetch_failures.inc();
            if matches!(error, FetchError::Timeout { .. }) {
                metrics.article_fetch_timeouts.inc();
            }
            warn!(
                session_id = %session.id,
                url = raw_url,
                error = %error,
                "article acquisition failed"
            );
            return with_session(&session, warning(fetch_status(&error), error.to_string()));
        }
    };

    let prediction = predict_blocking(&state, &session, article.text.clone()).await;
    let logged = record(&state, &session, InputMethod::Url, article.url.clone(), prediction).await;
    let preview = article.preview(state.config().article_preview_chars());
    with_session(
        &session,
        Json(UrlResponse {
            result: PredictionResponse::new(&session, prediction, logged),
            url: article.url,
            preview,
        }),
    )
}

pub(crate) async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let session = resolve_session(&state, &headers).await;
    let metrics = state.telemetry().metrics();

    let (file_name, bytes) = match read_file_field(&mut multipart).await {
        Ok(Some(file)) => file,
        Ok(None) => {
            metrics.uploads_rejected.inc();
            return with_session(
                &session,
                warning(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Upload a .txt or .csv file in the 'file' field.",
                ),
            );
        }
        Err(error) => {
            metrics.uploads_rejected.inc();
            warn!(session_id = %session.id, error = %error, "multipart upload could not be read");
            return with_session(&session, warning(error.status(), error.body_text()));
        }
    };

    let upload = match parse_upload(&file_name, bytes, state.config().max_upload_bytes()) {
        Ok(upload) => upload,
        Err(error) => {
            metrics.uploads_rejected.inc();
            warn!(session_id = %session.id, file_name = %file_name, error = %error, "upload rejected");
            return with_session(&session, warning(upload_status(&error), error.to_string()));
        }
    };

    match upload {
        Upload::Text { file_name, text } => {
            if is_blank(&text) {
                return with_session(
                    &session,
                    warning(StatusCode::UNPROCESSABLE_ENTITY, "The uploaded file is empty."),
                );
            }
            let prediction = predict_blocking(&state, &session, text).await;
            let logged = record(
                &state,
                &session,
                InputMethod::TextFile,
                file_name.clone(),
                prediction,
            )
            .await;
            with_session(
                &session,
                Json(UploadResponse::Text {
                    session_id: session.id,
                    file_name,
                    prediction: prediction.label,
                    confidence: prediction.confidence,
                    logged,
                }),
            )
        }
        Upload::Table { file_name, table } => {
            upload_table(&state, &session, file_name, table).await
        }
    }
}

pub(crate) async fn example(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ExampleRequest>,
) -> Response {
    let session = resolve_session(&state, &headers).await;
    let text = request.kind.random();
    let prediction = predict_blocking(&state, &session, text.to_string()).await;
    let logged = record(
        &state,
        &session,
        InputMethod::Example,
        request.kind.history_label().to_string(),
        prediction,
    )
    .await;
    with_session(
        &session,
        Json(ExampleResponse {
            result: PredictionResponse::new(&session, prediction, logged),
            kind: request.kind,
            text,
        }),
    )
}

/// ベクトル化と推論はCPU処理なのでブロッキングスレッドで行う。
async fn predict_blocking(state: &AppState, session: &Session, text: String) -> Prediction {
    let predictor = state.predictor_handle();
    match tokio::task::spawn_blocking(move || predictor.predict(&text)).await {
        Ok(prediction) => prediction,
        Err(error) => {
            warn!(session_id = %session.id, error = %error, "prediction task failed");
            Prediction::error()
        }
    }
}

async fn upload_table(state: &AppState, session: &Session, file_name: String, table: Table) -> Response {
    let predictor = state.predictor_handle();
    let outcome = tokio::task::spawn_blocking(move || classify_table(&predictor, &table)).await;
    let classified = match outcome {
        Ok(Ok(classified)) => classified,
        Ok(Err(error @ BatchError::MissingTextColumn)) => {
            warn!(session_id = %session.id, file_name = %file_name, "CSV upload without a text column");
            return with_session(
                session,
                warning(StatusCode::UNPROCESSABLE_ENTITY, error.to_string()),
            );
        }
        Ok(Err(error)) => {
            warn!(session_id = %session.id, file_name = %file_name, error = %error, "CSV classification failed");
            return with_session(
                session,
                warning(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
            );
        }
        Err(error) => {
            warn!(session_id = %session.id, file_name = %file_name, error = %error, "CSV classification task failed");
            return with_session(
                session,
                warning(StatusCode::INTERNAL_SERVER_ERROR, "failed to classify the uploaded table"),
            );
        }
    };

    let csv = match classified.table.to_csv() {
        Ok(csv) => csv,
        Err(error) => {
            warn!(session_id = %session.id, file_name = %file_name, error = %error, "CSV rendering failed");
            return with_session(
                session,
                warning(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
            );
        }
    };

    let texts = classified.table.column(TEXT_COLUMN).unwrap_or_default();
    let snippet_chars = state.config().snippet_chars();
    let mut logged = 0_usize;
    {
        let mut history = session.history.lock().await;
        for (text, prediction) in texts
            .iter()
            .zip(&classified.predictions)
            .take(state.config().csv_history_rows())
        {
            if history.record(InputMethod::CsvFile, truncate_chars(text, snippet_chars), *prediction) {
                logged += 1;
            }
        }
    }
    state
        .telemetry()
        .metrics()
        .history_entries_appended
        .inc_by(logged as f64);
    info!(
        session_id = %session.id,
        file_name = %file_name,
        rows = classified.predictions.len(),
        logged,
        "CSV batch classified"
    );

    with_session(
        session,
        Json(UploadResponse::Table {
            session_id: session.id,
            file_name,
            headers: classified.table.headers().to_vec(),
            rows: classified.table.rows().to_vec(),
            csv,
            logged,
        }),
    )
}

async fn record(
    state: &AppState,
    session: &Session,
    method: InputMethod,
    snippet: String,
    prediction: Prediction,
) -> bool {
    let logged = session.history.lock().await.record(method, snippet, prediction);
    if logged {
        state.telemetry().metrics().history_entries_appended.inc();
    }
    logged
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Option<(String, Vec<u8>)>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        return Ok(Some((file_name, bytes.to_vec())));
    }
    Ok(None)
}

fn fetch_status(error: &FetchError) -> StatusCode {
    match error {
        FetchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        FetchError::Unreachable { .. } | FetchError::Status { .. } | FetchError::Body { .. } => {
            StatusCode::BAD_GATEWAY
        }
        FetchError::InvalidUrl { .. }
        | FetchError::UnsupportedScheme(_)
        | FetchError::Extraction(_)
        | FetchError::EmptyArticle => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn upload_status(error: &UploadError) -> StatusCode {
    match error {
        UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::UnsupportedType(_) | UploadError::InvalidUtf8(_) | UploadError::Csv(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, header},
    };
    use serde_json::json;

    use super::*;
    use crate::session::SESSION_HEADER;
    use crate::test_support::{StubArticles, json_request, router_with, send, session_id};

    const BOUNDARY: &str = "detector-test-boundary";

    fn multipart_request(file_name: &str, content: &str, session: Option<&str>) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
        );
        let mut builder = Request::builder()
            .method("POST")
            .uri("/v1/analyze/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(id) = session {
            builder = builder.header(SESSION_HEADER, id);
        }
        builder.body(Body::from(body)).expect("request")
    }

    async fn history_len(router: &axum::Router, session: &str) -> usize {
        let request = Request::builder()
            .uri("/v1/history")
            .header(SESSION_HEADER, session)
            .body(Body::empty())
            .expect("request");
        let (_, _, body) = send(router, request).await;
        body["entries"].as_array().map_or(0, Vec::len)
    }

    #[tokio::test]
    async fn text_analysis_returns_prediction_and_logs_it() {
        let router = router_with(StubArticles::Text("unused"));
        let (status, headers, body) = send(
            &router,
            json_request("/v1/analyze/text", &json!({ "text": "NASA rover mission" }), None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "REAL");
        assert_eq!(body["logged"], true);
        let confidence = body["confidence"].as_f64().expect("confidence");
        assert!((0.0..=100.0).contains(&confidence));
        let id = session_id(&headers);
        assert_eq!(body["session_id"], id.as_str());
        assert_eq!(history_len(&router, &id).await, 1);
    }

    #[tokio::test]
    async fn blank_text_is_a_warning_and_not_logged() {
        let router = router_with(StubArticles::Text("unused"));
        let (status, headers, body) = send(
            &router,
            json_request("/v1/analyze/text", &json!({ "text": "   " }), None),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["warning"].is_string());
        assert_eq!(history_len(&router, &session_id(&headers)).await, 0);
    }

    #[tokio::test]
    async fn url_analysis_includes_preview() {
        let router = router_with(StubArticles::Text("secret microchip hoax cabal"));
        let (status, _, body) = send(
            &router,
            json_request(
                "/v1/analyze/url",
                &json!({ "url": "https://news.example/story" }),
                None,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "FAKE");
        assert_eq!(body["url"], "https://news.example/story");
        assert_eq!(body["preview"], "secret microchip hoax cabal");
    }

    #[tokio::test]
    async fn url_timeout_maps_to_gateway_timeout() {
        let router = router_with(StubArticles::TimedOut);
        let (status, headers, body) = send(
            &router,
            json_request("/v1/analyze/url", &json!({ "url": "https://slow.example" }), None),
        )
        .await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body["warning"].as_str().expect("warning").contains("timed out"));
        assert_eq!(history_len(&router, &session_id(&headers)).await, 0);
    }

    #[test]
    fn fetch_failures_map_to_gateway_statuses() {
        let url = "https://example.com/a".to_string();
        assert_eq!(
            fetch_status(&FetchError::Timeout { url: url.clone() }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            fetch_status(&FetchError::Status { url, status: 503 }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            fetch_status(&FetchError::EmptyArticle),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn text_file_upload_logs_file_name() {
        let router = router_with(StubArticles::Text("unused"));
        let (status, headers, body) = send(
            &router,
            multipart_request("Story.TXT", "telescope captures galaxy", None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "text");
        assert_eq!(body["file_name"], "Story.TXT");

        let request = Request::builder()
            .uri("/v1/history")
            .header(SESSION_HEADER, session_id(&headers))
            .body(Body::empty())
            .expect("request");
        let (_, _, history) = send(&router, request).await;
        assert_eq!(history["entries"][0]["snippet"], "Story.TXT");
        assert_eq!(history["entries"][0]["method"], "File (TXT)");
    }

    #[tokio::test]
    async fn csv_upload_appends_columns_and_logs_first_rows() {
        let router = router_with(StubArticles::Text("unused"));
        let mut csv = String::from("id,text\n");
        for idx in 0..7 {
            let text = if idx % 2 == 0 { "NASA orbit" } else { "microchip hoax" };
            csv.push_str(&format!("{idx},{text}\n"));
        }
        let (status, headers, body) = send(&router, multipart_request("batch.csv", &csv, None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "table");
        assert_eq!(
            body["headers"],
            json!(["id", "text", "Prediction", "Confidence (%)"])
        );
        assert_eq!(body["rows"].as_array().expect("rows").len(), 7);
        assert_eq!(body["logged"], 5);
        assert_eq!(history_len(&router, &session_id(&headers)).await, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn large_csv_batch_keeps_row_order_off_the_async_workers() {
        let router = router_with(StubArticles::Text("unused"));
        let mut csv = String::from("id,text\n");
        for idx in 0..2000 {
            let text = if idx % 2 == 0 { "NASA rover mission" } else { "secret microchip hoax" };
            csv.push_str(&format!("{idx},{text}\n"));
        }
        let upload = tokio::spawn({
            let router = router.clone();
            async move { send(&router, multipart_request("bulk.csv", &csv, None)).await }
        });
        let (live, _, _) = send(
            &router,
            Request::builder().uri("/health/live").body(Body::empty()).expect("request"),
        )
        .await;
        let (status, _, body) = upload.await.expect("upload task");

        assert_eq!(live, StatusCode::OK);
        assert_eq!(status, StatusCode::OK);
        let rows = body["rows"].as_array().expect("rows");
        assert_eq!(rows.len(), 2000);
        for (idx, row) in rows.iter().enumerate() {
            let expected = if idx % 2 == 0 { "REAL" } else { "FAKE" };
            assert_eq!(row[2], expected, "row {idx}");
        }
        assert_eq!(body["logged"], 5);
    }

    #[tokio::test]
    async fn csv_without_text_column_is_rejected_without_history() {
        let router = router_with(StubArticles::Text("unused"));
        let (status, headers, body) = send(
            &router,
            multipart_request("batch.csv", "title,body\nA,B\n", None),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["warning"].as_str().expect("warning").contains("'text'"));
        assert_eq!(history_len(&router, &session_id(&headers)).await, 0);
    }

    #[tokio::test]
    async fn unsupported_upload_type_is_rejected() {
        let router = router_with(StubArticles::Text("unused"));
        let (status, _, body) = send(&router, multipart_request("story.pdf", "x", None)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["warning"].as_str().expect("warning").contains("unsupported"));
    }

    #[tokio::test]
    async fn example_is_logged_with_kind_label() {
        let router = router_with(StubArticles::Text("unused"));
        let (status, headers, body) = send(
            &router,
            json_request("/v1/analyze/example", &json!({ "kind": "fake" }), None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "fake");
        let text = body["text"].as_str().expect("text");
        assert!(ExampleKind::Fake.texts().contains(&text));

        if body["logged"] == true {
            let request = Request::builder()
                .uri("/v1/history")
                .header(SESSION_HEADER, session_id(&headers))
                .body(Body::empty())
                .expect("request");
            let (_, _, history) = send(&router, request).await;
            assert_eq!(history["entries"][0]["snippet"], "Fake Example");
        }
    }
}
