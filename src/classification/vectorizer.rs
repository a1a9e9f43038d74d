//! TF-IDF ベクトライザ。
//!
//! 語彙とIDFは学習データからのみ構築し、学習後は不変。
use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use xxhash_rust::xxh3::Xxh3;

use super::tokenizer::TokenPipeline;

/// 文書頻度の上限（割合）。これを超える語は語彙から除外する。
pub const DEFAULT_MAX_DF: f64 = 0.7;

#[derive(Debug, Error, PartialEq)]
pub enum VectorizerError {
    #[error("cannot fit a vectorizer on an empty corpus")]
    EmptyCorpus,
    #[error("max_df must be within (0, 1], got {0}")]
    InvalidMaxDf(f64),
    #[error("no terms remain after pruning; try a higher max_df")]
    EmptyVocabulary,
}

/// インデックス昇順の疎ベクトル。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    #[must_use]
    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VectorizerOptions {
    pub max_df: f64,
    pub remove_stop_words: bool,
}

impl Default for VectorizerOptions {
    fn default() -> Self {
        Self {
            max_df: DEFAULT_MAX_DF,
            remove_stop_words: true,
        }
    }
}

/// 永続化される状態。インデックスは読み込み時に再構築する。
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VectorizerState {
    terms: Vec<String>,
    idf: Vec<f64>,
    max_df: f64,
    remove_stop_words: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "VectorizerState", into = "VectorizerState")]
pub struct TfidfVectorizer {
    terms: Vec<String>,
    idf: Vec<f64>,
    index: FxHashMap<String, usize>,
    max_df: f64,
    pipeline: TokenPipeline,
}

impl TryFrom<VectorizerState> for TfidfVectorizer {
    type Error = String;

    fn try_from(state: VectorizerState) -> Result<Self, Self::Error> {
        if state.terms.len() != state.idf.len() {
            return Err(format!(
                "vocabulary has {} terms but {} idf weights",
                state.terms.len(),
                state.idf.len()
            ));
        }
        let index = state
            .terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect::<FxHashMap<_, _>>();
        if index.len() != state.terms.len() {
            return Err("vocabulary contains duplicate terms".to_string());
        }
        Ok(Self {
            terms: state.terms,
            idf: state.idf,
            index,
            max_df: state.max_df,
            pipeline: TokenPipeline::new(state.remove_stop_words),
        })
    }
}

impl From<TfidfVectorizer> for VectorizerState {
    fn from(vectorizer: TfidfVectorizer) -> Self {
        Self {
            remove_stop_words: vectorizer.pipeline.removes_stop_words(),
            terms: vectorizer.terms,
            idf: vectorizer.idf,
            max_df: vectorizer.max_df,
        }
    }
}

impl TfidfVectorizer {
    /// 学習文書から語彙とIDFを構築する。
    ///
    /// 語彙は辞書順に並べ、その順でインデックスを割り当てる。
    ///
    /// # Errors
    /// 文書が空、`max_df` が範囲外、または剪定後に語彙が残らない場合。
    pub fn fit<S: AsRef<str>>(
        documents: &[S],
        options: VectorizerOptions,
    ) -> Result<Self, VectorizerError> {
        if documents.is_empty() {
            return Err(VectorizerError::EmptyCorpus);
        }
        if !(options.max_df > 0.0 && options.max_df <= 1.0) {
            return Err(VectorizerError::InvalidMaxDf(options.max_df));
        }

        let pipeline = TokenPipeline::new(options.remove_stop_words);
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        for document in documents {
            let unique: FxHashSet<String> =
                pipeline.tokenize(document.as_ref()).into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let n_docs = documents.len() as f64;
        let max_doc_count = options.max_df * n_docs;
        let (terms, idf): (Vec<String>, Vec<f64>) = doc_freq
            .into_iter()
            .filter(|(_, df)| (*df as f64) <= max_doc_count)
            .map(|(term, df)| {
                // smooth idf: ln((1 + n) / (1 + df)) + 1
                let weight = ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0;
                (term, weight)
            })
            .unzip();

        if terms.is_empty() {
            return Err(VectorizerError::EmptyVocabulary);
        }

        let index = terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect();

        Ok(Self {
            terms,
            idf,
            index,
            max_df: options.max_df,
            pipeline,
        })
    }

    /// テキストをL2正規化済みTF-IDF疎ベクトルに変換する。未知語は無視される。
    #[must_use]
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: FxHashMap<usize, f64> = FxHashMap::default();
        for token in self.pipeline.tokenize(text) {
            if let Some(&idx) = self.index.get(&token) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();
        entries.sort_unstable_by_key(|(idx, _)| *idx);

        let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        let (indices, values) = entries
            .into_iter()
            .map(|(idx, value)| {
                if norm > 0.0 {
                    (idx, value / norm)
                } else {
                    (idx, value)
                }
            })
            .unzip();

        SparseVector { indices, values }
    }

    #[must_use]
    pub fn transform_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<SparseVector> {
        texts.iter().map(|text| self.transform(text.as_ref())).collect()
    }

    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    #[must_use]
    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    #[must_use]
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    #[must_use]
    pub fn max_df(&self) -> f64 {
        self.max_df
    }

    /// 順序付き語彙とIDF重みのXXH3フィンガープリント。
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Xxh3::new();
        for (term, weight) in self.terms.iter().zip(&self.idf) {
            hasher.update(term.as_bytes());
            hasher.update(b"\n");
            hasher.update(&weight.to_le_bytes());
        }
        hasher.digest()
    }
}
