//! Report assembly: drives the chunked scan through a preset's builders

use chrono::{DateTime, Utc};
use helpdesk_common::{ConversationKind, Result};
use helpdesk_config::ReportsConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::builders::{BuilderContext, MetricResult, ReportBuilder};
use crate::cache::{model_type, CacheKey, ReportCache};
use crate::date_range::{DateRangeResolver, Granularity, MetricDateRange, ReportParams, ResolvedRanges};
use crate::enricher::BatchEnricher;
use crate::loader::BatchLoader;
use crate::presets::PresetRegistry;
use crate::store::{ChunkQuery, ConversationStore};

/// One metric of a report: the primary dataset and optionally the
/// comparison period's dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReport {
    pub granularity: Granularity,
    pub datasets: Vec<MetricResult>,
    pub generated_at: DateTime<Utc>,
}

/// Metric name to metric report, serialized as a plain JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Report {
    metrics: BTreeMap<String, MetricReport>,
}

impl Report {
    pub fn get(&self, metric: &str) -> Option<&MetricReport> {
        self.metrics.get(metric)
    }

    pub fn insert(&mut self, metric: impl Into<String>, report: MetricReport) {
        self.metrics.insert(metric.into(), report);
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricReport)> {
        self.metrics.iter().map(|(name, report)| (name.as_str(), report))
    }

    /// Appends the comparison report's first dataset to every metric that
    /// exists in both reports
    pub fn append_comparison(&mut self, comparison: &Report) {
        for (name, metric) in self.metrics.iter_mut() {
            if let Some(dataset) = comparison.get(name).and_then(|c| c.datasets.first()) {
                metric.datasets.push(dataset.clone());
            }
        }
    }
}

/// Which of the two periods a progress update belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Primary,
    Comparison,
}

/// Stages of a report computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStage {
    Initializing,
    Processing,
    Finalizing,
    Complete,
}

/// Progress information for a report computation
#[derive(Debug, Clone)]
pub struct ReportProgress {
    pub period: ReportPeriod,
    pub stage: ReportStage,
    pub batches: usize,
    pub rows: usize,
    pub message: String,
}

/// Optional channel for progress updates
pub type ProgressSender = Option<mpsc::UnboundedSender<ReportProgress>>;

/// Entry point of the reporting pipeline
pub struct HelpdeskReports {
    store: Arc<dyn ConversationStore>,
    settings: ReportsConfig,
    resolver: DateRangeResolver,
    presets: PresetRegistry,
    cache: Arc<ReportCache>,
}

impl HelpdeskReports {
    pub fn new(store: Arc<dyn ConversationStore>, settings: ReportsConfig) -> Result<Self> {
        let resolver = DateRangeResolver::from_timezone_name(&settings.default_timezone)?;
        let cache = Arc::new(ReportCache::new(&settings.cache));

        Ok(Self {
            store,
            settings,
            resolver,
            presets: PresetRegistry::with_builtin(),
            cache,
        })
    }

    /// Share a cache between several instances
    pub fn with_cache(mut self, cache: Arc<ReportCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Registers a custom preset under `name`
    pub fn register_preset<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&BuilderContext) -> Vec<Box<dyn ReportBuilder>> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("Registering report preset: {}", name);
        self.presets.register(name, factory);
    }

    pub fn presets(&self) -> &PresetRegistry {
        &self.presets
    }

    pub fn cache(&self) -> Arc<ReportCache> {
        Arc::clone(&self.cache)
    }

    /// Report for `preset` over the period described by `params`
    pub async fn get_report(
        &self,
        preset: &str,
        kind: Option<ConversationKind>,
        params: &ReportParams,
    ) -> Result<Report> {
        self.get_report_with_progress(preset, kind, params, None).await
    }

    /// Same as [`HelpdeskReports::get_report`], reporting progress on `progress_tx`
    #[instrument(skip(self, params, progress_tx), fields(model_type = model_type(kind)))]
    pub async fn get_report_with_progress(
        &self,
        preset: &str,
        kind: Option<ConversationKind>,
        params: &ReportParams,
        progress_tx: ProgressSender,
    ) -> Result<Report> {
        let ranges = self.resolver.resolve(params)?;
        self.report_for_ranges(preset, kind, &ranges, progress_tx).await
    }

    /// Report for already resolved ranges
    pub async fn report_for_ranges(
        &self,
        preset: &str,
        kind: Option<ConversationKind>,
        ranges: &ResolvedRanges,
        progress_tx: ProgressSender,
    ) -> Result<Report> {
        let primary = self
            .period_report(preset, kind, &ranges.primary, ReportPeriod::Primary, &progress_tx)
            .await?;
        let mut report = Report::clone(&primary);

        if let Some(range) = &ranges.comparison {
            let comparison = self
                .period_report(preset, kind, range, ReportPeriod::Comparison, &progress_tx)
                .await?;
            report.append_comparison(&comparison);
        }

        Ok(report)
    }

    /// Cached report for a single period
    async fn period_report(
        &self,
        preset: &str,
        kind: Option<ConversationKind>,
        range: &MetricDateRange,
        period: ReportPeriod,
        progress_tx: &ProgressSender,
    ) -> Result<Arc<Report>> {
        if !self.presets.contains(preset) {
            warn!("Unknown report preset '{}', returning an empty report", preset);
            return Ok(Arc::new(Report::default()));
        }

        let key = CacheKey::new(kind, preset, range);
        if let Some(report) = self.cache.get(&key).await {
            debug!("Serving {:?} period of '{}' from cache", period, preset);
            return Ok(report);
        }

        let report = Arc::new(self.compute(preset, kind, range, period, progress_tx).await?);
        self.cache.put(key, Arc::clone(&report)).await;
        Ok(report)
    }

    /// Runs the chunked scan for one period, bypassing the cache
    #[instrument(skip(self, range, progress_tx), fields(start = %range.start, end = %range.end))]
    pub async fn compute(
        &self,
        preset: &str,
        kind: Option<ConversationKind>,
        range: &MetricDateRange,
        period: ReportPeriod,
        progress_tx: &ProgressSender,
    ) -> Result<Report> {
        let ctx = BuilderContext {
            range: range.clone(),
            store: Arc::clone(&self.store),
            list_limit: self.settings.list_limit,
            agent_limit: self.settings.agent_limit,
            first_reply_unit: self.settings.first_reply_unit,
        };

        let Some(mut builders) = self.presets.builders_for(preset, &ctx) else {
            warn!("Unknown report preset '{}', returning an empty report", preset);
            return Ok(Report::default());
        };

        send_progress(progress_tx, period, ReportStage::Initializing, 0, 0, "Starting report".to_string());

        let query = ChunkQuery::for_range(range, kind);
        let mut loader = BatchLoader::new(self.store.as_ref(), query, self.settings.batch_size);
        let enricher = BatchEnricher::new(self.store.as_ref(), self.settings.reply_limit);

        while let Some(rows) = loader.next_batch().await? {
            let batch = enricher.enrich(rows).await?;
            for builder in builders.iter_mut() {
                builder.process(&batch).await?;
            }

            send_progress(
                progress_tx,
                period,
                ReportStage::Processing,
                loader.batches_loaded(),
                loader.rows_loaded(),
                format!("Processed batch {}", loader.batches_loaded()),
            );
        }

        send_progress(
            progress_tx,
            period,
            ReportStage::Finalizing,
            loader.batches_loaded(),
            loader.rows_loaded(),
            "Finalizing metrics".to_string(),
        );

        let generated_at = Utc::now();
        let mut report = Report::default();
        for builder in builders {
            let name = builder.name().to_string();
            report.insert(
                name,
                MetricReport {
                    granularity: range.granularity,
                    datasets: vec![builder.finalize()],
                    generated_at,
                },
            );
        }

        send_progress(
            progress_tx,
            period,
            ReportStage::Complete,
            loader.batches_loaded(),
            loader.rows_loaded(),
            "Report complete".to_string(),
        );

        info!(
            preset,
            metrics = report.len(),
            batches = loader.batches_loaded(),
            rows = loader.rows_loaded(),
            "Computed report"
        );
        Ok(report)
    }
}

impl fmt::Debug for HelpdeskReports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelpdeskReports")
            .field("store", &"<ConversationStore>")
            .field("settings", &self.settings)
            .field("presets", &self.presets)
            .field("cache_enabled", &self.cache.is_enabled())
            .finish()
    }
}

fn send_progress(
    progress_tx: &ProgressSender,
    period: ReportPeriod,
    stage: ReportStage,
    batches: usize,
    rows: usize,
    message: String,
) {
    if let Some(tx) = progress_tx {
        let _ = tx.send(ReportProgress {
            period,
            stage,
            batches,
            rows,
            message,
        });
    }
}
