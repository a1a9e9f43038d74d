use axum::{Json, extract::State, http::HeaderMap, response::Response};
use serde::Serialize;
use uuid::Uuid;

use super::{resolve_session, with_session};
use crate::app::AppState;
use crate::history::{HistoryEntry, LabelCount};

#[derive(Debug, Serialize)]
pub(crate) struct HistoryResponse {
    session_id: Uuid,
    /// 新しい順。
    entries: Vec<HistoryEntry>,
    summary: Vec<LabelCount>,
    total: usize,
}

pub(crate) async fn list(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = resolve_session(&state, &headers).await;
    let response = {
        let history = session.history.lock().await;
        HistoryResponse {
            session_id: session.id,
            entries: history.entries_recent_first().cloned().collect(),
            summary: history.summary(),
            total: history.len(),
        }
    };
    with_session(&session, Json(response))
}
