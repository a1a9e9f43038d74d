//! 入力テキスト完全一致キーの推論メモ。
use std::num::NonZeroUsize;

use lru::LruCache;

use super::prediction::Prediction;

/// 容量上限付きのLRUメモ。容量0ならキャッシュしない。
#[derive(Debug)]
pub struct PredictionCache {
    entries: Option<LruCache<String, Prediction>>,
}

impl PredictionCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.as_ref().map_or(0, |cache| cache.cap().get())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 参照したエントリは最近使用扱いになる。
    pub fn get(&mut self, text: &str) -> Option<Prediction> {
        self.entries.as_mut()?.get(text).copied()
    }

    pub fn insert(&mut self, text: &str, prediction: Prediction) {
        if let Some(cache) = self.entries.as_mut() {
            cache.put(text.to_string(), prediction);
        }
    }
}
