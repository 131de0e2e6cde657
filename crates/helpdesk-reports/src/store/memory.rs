//! In-memory row store
//!
//! Holds rows in plain vectors and answers the same queries as the SQLite
//! store. Every query bumps a counter, so callers can tell how often the
//! store was actually hit.

use async_trait::async_trait;
use helpdesk_common::{parse_timestamp, Agent, ConversationRow, ReplyRow, Result, TagRow};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ChunkQuery, ConversationStore};

#[derive(Debug, Default)]
pub struct MemoryStore {
    conversations: Vec<ConversationRow>,
    replies: Vec<ReplyRow>,
    tags: Vec<TagRow>,
    agents: Vec<Agent>,
    queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversations(mut self, rows: impl IntoIterator<Item = ConversationRow>) -> Self {
        self.conversations.extend(rows);
        self.conversations.sort_by_key(|row| row.id);
        self
    }

    pub fn with_replies(mut self, rows: impl IntoIterator<Item = ReplyRow>) -> Self {
        self.replies.extend(rows);
        self
    }

    pub fn with_tags(mut self, rows: impl IntoIterator<Item = TagRow>) -> Self {
        self.tags.extend(rows);
        self
    }

    pub fn with_agents(mut self, agents: impl IntoIterator<Item = Agent>) -> Self {
        self.agents.extend(agents);
        self.agents.sort_by_key(|agent| agent.id);
        self
    }

    /// Number of queries answered so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn conversation_chunk(
        &self,
        query: &ChunkQuery,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<ConversationRow>> {
        self.record_query();

        let mut chunk = Vec::new();
        for row in self.conversations.iter().filter(|row| row.id > after_id) {
            if chunk.len() >= limit {
                break;
            }
            if query.matches(parse_timestamp(&row.created_at)?, row.kind) {
                chunk.push(row.clone());
            }
        }
        Ok(chunk)
    }

    async fn tags_for(&self, conversation_ids: &[i64]) -> Result<Vec<TagRow>> {
        self.record_query();

        let wanted: HashSet<i64> = conversation_ids.iter().copied().collect();
        Ok(self
            .tags
            .iter()
            .filter(|row| wanted.contains(&row.conversation_id))
            .cloned()
            .collect())
    }

    async fn recent_replies_for(&self, conversation_ids: &[i64], limit: usize) -> Result<Vec<ReplyRow>> {
        self.record_query();

        let wanted: HashSet<i64> = conversation_ids.iter().copied().collect();
        let mut replies = Vec::new();
        for row in self.replies.iter().filter(|row| wanted.contains(&row.conversation_id)) {
            replies.push((parse_timestamp(&row.created_at)?, row.clone()));
        }

        replies.sort_by(|(a_at, a), (b_at, b)| b_at.cmp(a_at).then(b.id.cmp(&a.id)));
        Ok(replies.into_iter().take(limit).map(|(_, row)| row).collect())
    }

    async fn agents(&self, limit: usize) -> Result<Vec<Agent>> {
        self.record_query();
        Ok(self.agents.iter().take(limit).cloned().collect())
    }
}
