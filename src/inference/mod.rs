//! 読み込み済み成果物を使った推論。
pub mod batch;
mod cache;
mod prediction;
mod predictor;

pub use batch::{BatchError, CONFIDENCE_COLUMN, ClassifiedTable, PREDICTION_COLUMN, classify_table};
pub use cache::PredictionCache;
pub use prediction::{Prediction, PredictionLabel, confidence_percent};
pub use predictor::Predictor;
