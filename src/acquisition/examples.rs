//! デモ用の定型テキスト。予測結果を保証するものではない。
use std::fmt;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

const FAKE_EXAMPLES: [&str; 3] = [
    "COVID-19 vaccines contain microchips that control humans via 5G.",
    "Eating garlic cures all types of flu and common cold immediately.",
    "A secret cabal of global elites is planning to drastically reduce the world population.",
];

const REAL_EXAMPLES: [&str; 3] = [
    "NASA’s Perseverance rover collected its 25th rock sample on Mars.",
    "The Federal Reserve announced a quarter-point rate hike to combat rising inflation.",
    "A new study published in 'Nature' details a breakthrough in gene-editing technology.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExampleKind {
    Fake,
    Real,
}

impl ExampleKind {
    #[must_use]
    pub fn texts(self) -> &'static [&'static str] {
        match self {
            Self::Fake => &FAKE_EXAMPLES,
            Self::Real => &REAL_EXAMPLES,
        }
    }

    /// 履歴に残す表記。
    #[must_use]
    pub fn history_label(self) -> &'static str {
        match self {
            Self::Fake => "Fake Example",
            Self::Real => "Real Example",
        }
    }

    pub fn choose<R: Rng + ?Sized>(self, rng: &mut R) -> &'static str {
        self.texts().choose(rng).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn random(self) -> &'static str {
        self.choose(&mut rand::rng())
    }
}

impl fmt::Display for ExampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fake => "fake",
            Self::Real => "real",
        })
    }
}
