//! オフライン学習ジョブ。
pub mod corpus;
pub mod pipeline;
pub mod split;

pub use corpus::{Corpus, CorpusError, CorpusRecord, load_corpus};
pub use pipeline::{TrainingOptions, TrainingOutcome, TrainingReport, run, train};
pub use split::{Split, SplitError, train_test_split};
