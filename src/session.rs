//! `x-session-id` ヘッダで識別するセッションごとの履歴。
use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::history::HistoryLog;

pub const SESSION_HEADER: &str = "x-session-id";

/// 解決済みのセッション。
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub history: Arc<Mutex<HistoryLog>>,
    /// このリクエストで新規に払い出したか。
    pub created: bool,
}

/// セッション ID → 履歴。プロセス内のみで永続化しない。
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<HistoryLog>>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ヘッダの ID が既知ならそのセッションを、無い・不正・未知なら新規を返す。
    pub async fn resolve(&self, headers: &HeaderMap) -> Session {
        let requested = headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok());

        if let Some(id) = requested
            && let Some(history) = self.sessions.read().await.get(&id)
        {
            return Session {
                id,
                history: Arc::clone(history),
                created: false,
            };
        }

        let id = Uuid::new_v4();
        let history = Arc::new(Mutex::new(HistoryLog::new()));
        self.sessions.write().await.insert(id, Arc::clone(&history));
        debug!(session_id = %id, "session created");
        Session {
            id,
            history,
            created: true,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
