//! Time-boxed report cache

use helpdesk_common::ConversationKind;
use helpdesk_config::CacheConfig;
use moka::future::Cache;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::assembler::Report;
use crate::date_range::MetricDateRange;

/// Model type used in keys when no kind filter is set
pub const DEFAULT_MODEL_TYPE: &str = "conversation";

/// `{modelType}-{preset}-{startTimestamp}-{endTimestamp}`
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    pub model_type: String,
    pub preset: String,
    pub start: i64,
    pub end: i64,
}

impl CacheKey {
    pub fn new(kind: Option<ConversationKind>, preset: &str, range: &MetricDateRange) -> Self {
        Self {
            model_type: model_type(kind).to_string(),
            preset: preset.to_string(),
            start: range.start.timestamp(),
            end: range.end.timestamp(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}-{}", self.model_type, self.preset, self.start, self.end)
    }
}

/// Model type segment for an optional kind filter
pub fn model_type(kind: Option<ConversationKind>) -> &'static str {
    kind.map_or(DEFAULT_MODEL_TYPE, |kind| kind.as_str())
}

/// Cache performance metrics
#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub invalidations: AtomicU64,
}

impl CacheMetrics {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidations(&self, count: u64) {
        self.invalidations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let total = hits + self.misses.load(Ordering::Relaxed) as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }

    pub fn get_stats(&self) -> HashMap<String, u64> {
        let mut stats = HashMap::new();
        stats.insert("hits".to_string(), self.hits.load(Ordering::Relaxed));
        stats.insert("misses".to_string(), self.misses.load(Ordering::Relaxed));
        stats.insert("invalidations".to_string(), self.invalidations.load(Ordering::Relaxed));
        stats
    }
}

/// Finished per-period reports, keyed by [`CacheKey`]
pub struct ReportCache {
    cache: Cache<CacheKey, Arc<Report>>,
    enabled: bool,
    metrics: Arc<CacheMetrics>,
}

impl ReportCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl())
            .build();

        if !config.enabled {
            info!("Report cache disabled; every request recomputes");
        }

        Self {
            cache,
            enabled: config.enabled,
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    /// Pass-through cache that never stores anything
    pub fn disabled() -> Self {
        Self::new(&CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[instrument(skip(self), fields(key = %key))]
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<Report>> {
        if !self.enabled {
            return None;
        }

        if let Some(report) = self.cache.get(key).await {
            debug!("Cache hit for key: {}", key);
            self.metrics.record_hit();
            Some(report)
        } else {
            debug!("Cache miss for key: {}", key);
            self.metrics.record_miss();
            None
        }
    }

    #[instrument(skip(self, report), fields(key = %key))]
    pub async fn put(&self, key: CacheKey, report: Arc<Report>) {
        if !self.enabled {
            return;
        }

        debug!("Storing report in cache for key: {}", key);
        self.cache.insert(key, report).await;
    }

    /// Drops every cached report for one model type
    #[instrument(skip(self))]
    pub async fn invalidate_model_type(&self, model_type: &str) -> u64 {
        let keys: Vec<CacheKey> = self
            .cache
            .iter()
            .filter(|(key, _)| key.model_type == model_type)
            .map(|(key, _)| (*key).clone())
            .collect();

        let count = keys.len() as u64;
        for key in keys {
            self.cache.invalidate(&key).await;
        }

        self.metrics.record_invalidations(count);
        info!("Invalidated {} cached reports for model type: {}", count, model_type);
        count
    }

    /// Drops every cached report
    #[instrument(skip(self))]
    pub async fn invalidate_all(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        let count = self.cache.entry_count();
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;

        self.metrics.record_invalidations(count);
        info!("Invalidated {} cached reports", count);
        count
    }

    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }

    pub async fn stats(&self) -> HashMap<String, u64> {
        self.cache.run_pending_tasks().await;
        let mut stats = self.metrics.get_stats();
        stats.insert("entry_count".to_string(), self.cache.entry_count());
        stats
    }
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
