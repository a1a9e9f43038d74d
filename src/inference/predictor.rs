//! 推論契約: テキスト1件 → ラベルと確信度。
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, warn};

use super::cache::PredictionCache;
use super::prediction::Prediction;
use crate::classification::{ArtifactPair, ModelError, SparseVector};
use crate::observability::metrics::Metrics;
use crate::util::text::is_blank;

/// 読み込み済みの成果物ペアで推論する。共有して使う。
#[derive(Debug)]
pub struct Predictor {
    pair: Arc<ArtifactPair>,
    cache: Mutex<PredictionCache>,
    metrics: Option<Metrics>,
    model_invocations: AtomicU64,
}

impl Predictor {
    #[must_use]
    pub fn new(pair: Arc<ArtifactPair>, cache_capacity: usize) -> Self {
        Self {
            pair,
            cache: Mutex::new(PredictionCache::new(cache_capacity)),
            metrics: None,
            model_invocations: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn artifacts(&self) -> &ArtifactPair {
        &self.pair
    }

    /// モデルを実際に呼んだ回数。
    #[must_use]
    pub fn model_invocations(&self) -> u64 {
        self.model_invocations.load(Ordering::Relaxed)
    }

    /// 1件を分類する。
    ///
    /// 空白のみの入力はモデルを呼ばずに `N/A` を返す。
    /// 分類中の失敗は `ERROR` に変換し、呼び出し側へは伝播しない。
    pub fn predict(&self, text: &str) -> Prediction {
        if is_blank(text) {
            return self.finish(Prediction::not_applicable());
        }

        if let Some(hit) = self.lock_cache().get(text) {
            if let Some(metrics) = &self.metrics {
                metrics.prediction_cache_hits.inc();
            }
            return self.finish(hit);
        }
        if let Some(metrics) = &self.metrics {
            metrics.prediction_cache_misses.inc();
        }

        let started = Instant::now();
        let features = self.pair.vectorizer().transform(text);
        let prediction = self.classify(&features);
        if let Some(metrics) = &self.metrics {
            metrics
                .inference_duration
                .observe(started.elapsed().as_secs_f64());
        }

        self.lock_cache().insert(text, prediction);
        self.finish(prediction)
    }

    /// 複数行をまとめて分類する。各行の結果は [`Predictor::predict`] と一致する。
    pub fn predict_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Prediction> {
        let started = Instant::now();
        let present: Vec<(usize, &str)> = texts
            .iter()
            .enumerate()
            .map(|(idx, text)| (idx, text.as_ref()))
            .filter(|(_, text)| !is_blank(text))
            .collect();
        let bodies: Vec<&str> = present.iter().map(|(_, text)| *text).collect();
        let features = self.pair.vectorizer().transform_batch(&bodies);

        let mut results = vec![Prediction::not_applicable(); texts.len()];
        for ((idx, _), vector) in present.iter().zip(&features) {
            results[*idx] = self.classify(vector);
        }
        for prediction in &results {
            self.finish(*prediction);
        }

        if let Some(metrics) = &self.metrics {
            metrics
                .batch_inference_duration
                .observe(started.elapsed().as_secs_f64());
        }
        debug!(
            rows = texts.len(),
            classified = present.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "batch classified"
        );
        results
    }

    fn classify(&self, features: &SparseVector) -> Prediction {
        self.model_invocations.fetch_add(1, Ordering::Relaxed);
        match self.posterior(features) {
            Ok(prediction) => prediction,
            Err(error) => {
                warn!(error = %error, "classification failed");
                Prediction::error()
            }
        }
    }

    fn posterior(&self, features: &SparseVector) -> Result<Prediction, ModelError> {
        let posterior = self.pair.model().posterior(features)?;
        Ok(Prediction::from_posterior(&posterior))
    }

    fn finish(&self, prediction: Prediction) -> Prediction {
        if let Some(metrics) = &self.metrics {
            metrics.record_prediction(prediction.label);
        }
        prediction
    }

    fn lock_cache(&self) -> MutexGuard<'_, PredictionCache> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
