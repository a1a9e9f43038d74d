//! セッション単位の追記専用履歴。
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classification::Label;
use crate::inference::{Prediction, PredictionLabel};

/// 推論の入力経路。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InputMethod {
    #[serde(rename = "Text")]
    Text,
    #[serde(rename = "URL")]
    Url,
    #[serde(rename = "File (TXT)")]
    TextFile,
    #[serde(rename = "File (CSV)")]
    CsvFile,
    #[serde(rename = "Example")]
    Example,
}

impl InputMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Url => "URL",
            Self::TextFile => "File (TXT)",
            Self::CsvFile => "File (CSV)",
            Self::Example => "Example",
        }
    }
}

impl fmt::Display for InputMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub method: InputMethod,
    pub snippet: String,
    pub prediction: Label,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub prediction: Label,
    pub count: usize,
}

/// 追記専用のログ。削除や上限は持たない。
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 実結果のみ追記する。`N/A` と `ERROR` は無視して `false` を返す。
    pub fn record(&mut self, method: InputMethod, snippet: String, prediction: Prediction) -> bool {
        let label = match prediction.label {
            PredictionLabel::Real => Label::Real,
            PredictionLabel::Fake => Label::Fake,
            PredictionLabel::NotApplicable | PredictionLabel::Error => return false,
        };
        self.entries.push(HistoryEntry {
            timestamp: Utc::now(),
            method,
            snippet,
            prediction: label,
            confidence: prediction.confidence,
        });
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 新しい順。
    pub fn entries_recent_first(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().rev()
    }

    /// ラベルごとの件数。件数の多い順、同数ならラベル順。
    #[must_use]
    pub fn summary(&self) -> Vec<LabelCount> {
        let mut counts: BTreeMap<Label, usize> = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.prediction).or_default() += 1;
        }
        let mut summary: Vec<LabelCount> = counts
            .into_iter()
            .map(|(prediction, count)| LabelCount { prediction, count })
            .collect();
        summary.sort_by(|a, b| b.count.cmp(&a.count).then(a.prediction.cmp(&b.prediction)));
        summary
    }
}
