//! 真偽ラベル。
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 学習コーパスに付与されるラベル。
///
/// 並び順（`FAKE` < `REAL`）が分類器のクラス順になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Fake,
    Real,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown label: {0}")]
pub struct UnknownLabel(String);

impl Label {
    pub const ALL: [Label; 2] = [Label::Fake, Label::Real];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fake => "FAKE",
            Self::Real => "REAL",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FAKE" => Ok(Self::Fake),
            "REAL" => Ok(Self::Real),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}
