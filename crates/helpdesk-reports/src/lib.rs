//! # Helpdesk Reports
//!
//! Chunked aggregation pipeline behind the helpdesk analytics pages.
//!
//! A request is resolved into a [`MetricDateRange`], conversations are
//! streamed from a [`ConversationStore`] in keyset-paginated batches, each
//! batch is enriched with tags and replies, and every builder of the chosen
//! preset folds it into its own accumulator. Finished reports are cached per
//! period.

pub mod assembler;
pub mod builders;
pub mod cache;
pub mod date_range;
pub mod enricher;
pub mod loader;
pub mod presets;
pub mod store;

pub use assembler::{
    HelpdeskReports, MetricReport, ProgressSender, Report, ReportPeriod, ReportProgress, ReportStage,
};
pub use builders::{BuilderContext, MetricResult, ReportBuilder};
pub use cache::{CacheKey, CacheMetrics, ReportCache};
pub use date_range::{DateRangeResolver, Granularity, MetricDateRange, ReportParams, ResolvedRanges};
pub use enricher::BatchEnricher;
pub use loader::BatchLoader;
pub use presets::{BuilderFactory, PresetRegistry, PRESET_AGENTS, PRESET_ALL, PRESET_TAGS};
pub use store::{ChunkQuery, ConversationStore, MemoryStore, SqliteStore};
