//! 真偽判定のための特徴抽出・分類器・成果物ペア。
pub mod artifact;
mod label;
pub mod model;
mod stop_words;
pub mod tokenizer;
pub mod vectorizer;

pub use artifact::{ArtifactError, ArtifactPair};
pub use label::{Label, UnknownLabel};
pub use model::{DEFAULT_ALPHA, ModelError, NaiveBayesModel, Posterior};
pub use tokenizer::TokenPipeline;
pub use vectorizer::{
    DEFAULT_MAX_DF, SparseVector, TfidfVectorizer, VectorizerError, VectorizerOptions,
};
