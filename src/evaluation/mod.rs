//! ホールドアウト評価。
pub mod metrics;

pub use metrics::{ClassMetrics, ClassificationReport, MetricsCalculator};
