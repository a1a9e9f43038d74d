pub(crate) mod analyze;
pub(crate) mod dashboard;
pub(crate) mod health;
pub(crate) mod history;
pub(crate) mod metrics;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::app::AppState;
use crate::session::{SESSION_HEADER, Session};

/// multipart の境界やヘッダ分の余裕。
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub(crate) fn router(state: AppState) -> Router {
    let body_limit = state
        .config()
        .max_upload_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(dashboard::index))
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::exporter))
        .route("/v1/analyze/text", post(analyze::text))
        .route("/v1/analyze/url", post(analyze::url))
        .route("/v1/analyze/upload", post(analyze::upload))
        .route("/v1/analyze/example", post(analyze::example))
        .route("/v1/history", get(history::list))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 利用者向けの警告。処理は中断するがプロセスは継続する。
#[derive(Debug, Serialize)]
pub(crate) struct Warning {
    warning: String,
}

pub(crate) fn warning(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Warning>) {
    (
        status,
        Json(Warning {
            warning: message.into(),
        }),
    )
}

/// ヘッダからセッションを解決し、新規ならゲージを進める。
pub(crate) async fn resolve_session(state: &AppState, headers: &HeaderMap) -> Session {
    let session = state.sessions().resolve(headers).await;
    if session.created {
        state.telemetry().metrics().active_sessions.inc();
    }
    session
}

/// セッション ID ヘッダを付けて応答する。エラー応答にも付ける。
pub(crate) fn with_session<T: IntoResponse>(session: &Session, body: T) -> Response {
    ([(SESSION_HEADER, session.id.to_string())], body).into_response()
}
