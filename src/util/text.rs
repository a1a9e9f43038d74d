//! テキスト整形ユーティリティ。

/// 先頭 `max_chars` 文字に切り詰める。切り詰めた場合のみ `...` を付ける。
///
/// 文字単位で数えるため、マルチバイト文字の途中で切れることはない。
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// 先頭 `max_chars` 文字に常に `...` を続ける。履歴のテキスト入力表記。
#[must_use]
pub fn ellipsized_prefix(text: &str, max_chars: usize) -> String {
    let end = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(byte_idx, _)| byte_idx);
    format!("{}...", &text[..end])
}

/// 連続する空白を1つのスペースにまとめ、前後を取り除く。
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 空または空白のみか。
#[must_use]
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
