/// HTTP取得エラーの分類。
use reqwest::StatusCode;

/// 取得失敗の種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchFailureKind {
    /// 接続または全体のタイムアウト
    Timeout,
    /// 接続できない（DNS失敗、拒否など）
    Unreachable,
    /// 2xx 以外の応答
    Status(StatusCode),
    /// それ以外（本文の読み取り失敗など）
    Other,
}

/// reqwestのエラーを分類する。タイムアウトは接続失敗より優先する。
#[must_use]
pub(crate) fn classify_fetch_error(error: &reqwest::Error) -> FetchFailureKind {
    if error.is_timeout() {
        return FetchFailureKind::Timeout;
    }
    if error.is_connect() {
        return FetchFailureKind::Unreachable;
    }
    if let Some(status) = error.status() {
        return FetchFailureKind::Status(status);
    }
    FetchFailureKind::Other
}
