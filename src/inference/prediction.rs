use std::fmt;

use serde::Serialize;

use crate::classification::{Label, Posterior};

/// 推論結果のラベル。`N/A` と `ERROR` はセンチネル。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PredictionLabel {
    #[serde(rename = "FAKE")]
    Fake,
    #[serde(rename = "REAL")]
    Real,
    #[serde(rename = "N/A")]
    NotApplicable,
    #[serde(rename = "ERROR")]
    Error,
}

impl PredictionLabel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fake => "FAKE",
            Self::Real => "REAL",
            Self::NotApplicable => "N/A",
            Self::Error => "ERROR",
        }
    }
}

impl From<Label> for PredictionLabel {
    fn from(label: Label) -> Self {
        match label {
            Label::Fake => Self::Fake,
            Label::Real => Self::Real,
        }
    }
}

impl fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub label: PredictionLabel,
    /// 最大事後確率のパーセント表記（小数第2位で丸め）。
    pub confidence: f64,
}

impl Prediction {
    #[must_use]
    pub fn not_applicable() -> Self {
        Self {
            label: PredictionLabel::NotApplicable,
            confidence: 0.0,
        }
    }

    #[must_use]
    pub fn error() -> Self {
        Self {
            label: PredictionLabel::Error,
            confidence: 0.0,
        }
    }

    #[must_use]
    pub fn from_posterior(posterior: &Posterior) -> Self {
        Self {
            label: posterior.label.into(),
            confidence: confidence_percent(posterior.max_probability()),
        }
    }

    /// 履歴に記録してよい実結果かどうか。
    #[must_use]
    pub fn is_loggable(&self) -> bool {
        matches!(self.label, PredictionLabel::Real | PredictionLabel::Fake)
    }
}

/// 確率をパーセントにして小数第2位で丸める。
#[must_use]
pub fn confidence_percent(probability: f64) -> f64 {
    (probability * 100.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0.5, 50.0)]
    #[case(0.987_654, 98.77)]
    #[case(1.0, 100.0)]
    #[case(0.123_449, 12.34)]
    fn rounds_to_two_decimals(#[case] probability: f64, #[case] expected: f64) {
        assert!((confidence_percent(probability) - expected).abs() < 1e-9);
    }

    #[test]
    fn sentinels_are_not_loggable() {
        assert!(!Prediction::not_applicable().is_loggable());
        assert!(!Prediction::error().is_loggable());
        let real = Prediction {
            label: PredictionLabel::Real,
            confidence: 91.2,
        };
        assert!(real.is_loggable());
    }

    #[test]
    fn labels_serialize_to_display_strings() {
        let json = serde_json::to_string(&Prediction::not_applicable()).expect("json");
        assert_eq!(json, r#"{"label":"N/A","confidence":0.0}"#);
    }
}
