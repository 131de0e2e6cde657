//! Row store abstraction
//!
//! The pipeline only ever needs four read queries; everything else about the
//! helpdesk database stays behind this trait.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helpdesk_common::{Agent, ConversationKind, ConversationRow, ReplyRow, Result, TagRow};

use crate::date_range::MetricDateRange;

/// Filter shared by every chunk of one report run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkQuery {
    /// Inclusive lower bound on `created_at`
    pub start: DateTime<Utc>,
    /// Inclusive upper bound on `created_at`
    pub end: DateTime<Utc>,
    /// Optional model-type discriminator
    pub kind: Option<ConversationKind>,
}

impl ChunkQuery {
    pub fn for_range(range: &MetricDateRange, kind: Option<ConversationKind>) -> Self {
        Self {
            start: range.start,
            end: range.end,
            kind,
        }
    }

    /// Whether a conversation created at `created_at` with `kind` matches
    pub fn matches(&self, created_at: DateTime<Utc>, kind: Option<ConversationKind>) -> bool {
        created_at >= self.start
            && created_at <= self.end
            && self.kind.map_or(true, |wanted| kind == Some(wanted))
    }
}

/// Read access to conversations and their relations
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Up to `limit` conversations matching `query` with `id > after_id`,
    /// ordered by id ascending
    async fn conversation_chunk(
        &self,
        query: &ChunkQuery,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<ConversationRow>>;

    /// Tags attached to any of the given conversations
    async fn tags_for(&self, conversation_ids: &[i64]) -> Result<Vec<TagRow>>;

    /// The `limit` most recent replies across the given conversations,
    /// newest first
    async fn recent_replies_for(&self, conversation_ids: &[i64], limit: usize) -> Result<Vec<ReplyRow>>;

    /// Up to `limit` users that can act as agents
    async fn agents(&self, limit: usize) -> Result<Vec<Agent>>;
}
