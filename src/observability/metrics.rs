/// Prometheusメトリクス定義。
use prometheus::{
    Counter, Gauge, Histogram, Registry, histogram_opts, register_counter_with_registry,
    register_gauge_with_registry, register_histogram_with_registry,
};
use std::sync::Arc;

use crate::inference::PredictionLabel;

/// メトリクスコレクター。
#[derive(Debug, Clone)]
pub struct Metrics {
    // カウンター
    pub predictions_real: Counter,
    pub predictions_fake: Counter,
    pub predictions_not_applicable: Counter,
    pub predictions_error: Counter,
    pub prediction_cache_hits: Counter,
    pub prediction_cache_misses: Counter,
    pub articles_fetched: Counter,
    pub article_fetch_failures: Counter,
    pub article_fetch_timeouts: Counter,
    pub uploads_rejected: Counter,
    pub history_entries_appended: Counter,

    // ヒストグラム
    pub inference_duration: Histogram,
    pub batch_inference_duration: Histogram,
    pub article_fetch_duration: Histogram,

    // ゲージ
    pub active_sessions: Gauge,
}

impl Metrics {
    /// 新しいメトリクスコレクターを作成する。
    ///
    /// # Errors
    /// 同名のメトリクスが既に登録済みの場合。
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            predictions_real: register_counter_with_registry!(
                "detector_predictions_real_total",
                "Number of predictions labelled REAL",
                registry
            )?,
            predictions_fake: register_counter_with_registry!(
                "detector_predictions_fake_total",
                "Number of predictions labelled FAKE",
                registry
            )?,
            predictions_not_applicable: register_counter_with_registry!(
                "detector_predictions_not_applicable_total",
                "Number of blank inputs answered with N/A",
                registry
            )?,
            predictions_error: register_counter_with_registry!(
                "detector_predictions_error_total",
                "Number of inputs whose classification failed",
                registry
            )?,
            prediction_cache_hits: register_counter_with_registry!(
                "detector_prediction_cache_hits_total",
                "Number of predictions served from the memo cache",
                registry
            )?,
            prediction_cache_misses: register_counter_with_registry!(
                "detector_prediction_cache_misses_total",
                "Number of predictions computed by the model",
                registry
            )?,
            articles_fetched: register_counter_with_registry!(
                "detector_articles_fetched_total",
                "Number of articles fetched and extracted",
                registry
            )?,
            article_fetch_failures: register_counter_with_registry!(
                "detector_article_fetch_failures_total",
                "Number of article fetches that failed",
                registry
            )?,
            article_fetch_timeouts: register_counter_with_registry!(
                "detector_article_fetch_timeouts_total",
                "Number of article fetches that timed out",
                registry
            )?,
            uploads_rejected: register_counter_with_registry!(
                "detector_uploads_rejected_total",
                "Number of uploaded files rejected before classification",
                registry
            )?,
            history_entries_appended: register_counter_with_registry!(
                "detector_history_entries_appended_total",
                "Number of entries appended to session histories",
                registry
            )?,
            inference_duration: register_histogram_with_registry!(
                histogram_opts!(
                    "detector_inference_duration_seconds",
                    "Latency of a single model invocation",
                    vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]
                ),
                registry
            )?,
            batch_inference_duration: register_histogram_with_registry!(
                "detector_batch_inference_duration_seconds",
                "Latency of classifying an uploaded table",
                registry
            )?,
            article_fetch_duration: register_histogram_with_registry!(
                "detector_article_fetch_duration_seconds",
                "Latency of fetching and extracting an article",
                registry
            )?,
            active_sessions: register_gauge_with_registry!(
                "detector_active_sessions",
                "Number of sessions with an in-memory history",
                registry
            )?,
        })
    }

    /// 推論結果のラベル別カウンターを進める。
    pub fn record_prediction(&self, label: PredictionLabel) {
        match label {
            PredictionLabel::Real => self.predictions_real.inc(),
            PredictionLabel::Fake => self.predictions_fake.inc(),
            PredictionLabel::NotApplicable => self.predictions_not_applicable.inc(),
            PredictionLabel::Error => self.predictions_error.inc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_metrics_once() {
        let registry = Arc::new(Registry::new());
        let metrics = Metrics::new(Arc::clone(&registry)).expect("metrics");
        metrics.record_prediction(PredictionLabel::Fake);
        metrics.record_prediction(PredictionLabel::Error);
        assert!((metrics.predictions_fake.get() - 1.0).abs() < f64::EPSILON);
        assert!((metrics.predictions_error.get() - 1.0).abs() < f64::EPSILON);

        assert!(Metrics::new(registry).is_err());
    }
}
