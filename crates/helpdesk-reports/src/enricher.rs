//! Attaches tags and replies to a batch of conversation rows

use helpdesk_common::{
    parse_timestamp, Conversation, ConversationRow, Reply, ReportError, Result, Tag,
};
use std::collections::HashMap;
use tracing::debug;

use crate::store::ConversationStore;

/// Default cap on replies loaded per batch
pub const DEFAULT_REPLY_LIMIT: usize = 1000;

pub struct BatchEnricher<'a> {
    store: &'a dyn ConversationStore,
    reply_limit: usize,
}

impl<'a> BatchEnricher<'a> {
    pub fn new(store: &'a dyn ConversationStore, reply_limit: usize) -> Self {
        Self { store, reply_limit }
    }

    /// Turns raw rows into conversations with tags and replies attached.
    ///
    /// Issues one tag query and one reply query for the whole batch. Replies
    /// arrive newest first and are attached in ascending order.
    pub async fn enrich(&self, rows: Vec<ConversationRow>) -> Result<Vec<Conversation>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();

        let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
        for row in self.store.tags_for(&ids).await? {
            tags.entry(row.conversation_id).or_default().push(Tag {
                id: row.tag_id,
                name: row.name,
            });
        }

        let reply_rows = self.store.recent_replies_for(&ids, self.reply_limit).await?;
        let reply_count = reply_rows.len();
        let mut replies: HashMap<i64, Vec<Reply>> = HashMap::new();
        for row in reply_rows {
            let created_at = parse_field("conversation_items.created_at", row.id, &row.created_at)?;
            replies.entry(row.conversation_id).or_default().push(Reply {
                id: row.id,
                user_id: row.user_id,
                created_at,
            });
        }

        let mut batch = Vec::with_capacity(rows.len());
        for row in rows {
            let created_at = parse_field("conversations.created_at", row.id, &row.created_at)?;
            let closed_at = row
                .closed_at
                .as_deref()
                .map(|raw| parse_field("conversations.closed_at", row.id, raw))
                .transpose()?;

            let mut conversation_replies = replies.remove(&row.id).unwrap_or_default();
            conversation_replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

            batch.push(Conversation {
                id: row.id,
                user_id: row.user_id,
                assigned_to: row.assigned_to,
                closed_by: row.closed_by,
                created_at,
                closed_at,
                status_category: row.status_category,
                rating: row.rating,
                channel: row.channel,
                used_ai_agent: row.used_ai_agent,
                tags: tags.remove(&row.id).unwrap_or_default(),
                replies: conversation_replies,
            });
        }

        debug!(
            conversations = batch.len(),
            replies = reply_count,
            "Enriched conversation batch"
        );
        Ok(batch)
    }
}

fn parse_field(field: &str, id: i64, raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    parse_timestamp(raw).map_err(|_| ReportError::parse(format!("Invalid {field} on row {id}"), raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use helpdesk_common::test_utils::conversation_fixtures::*;
    use helpdesk_common::test_utils::mock_timestamp;
    use chrono::Duration;

    #[tokio::test]
    async fn test_attaches_relations_and_sorts_replies() {
        let created = mock_timestamp(2024, 1, 2, 10, 0, 0);
        let store = MemoryStore::new()
            .with_tags(vec![tag_row(1, 5, "billing"), tag_row(1, 6, "urgent")])
            .with_replies(vec![
                reply_row(11, 1, 20, created + Duration::minutes(30)),
                reply_row(12, 1, 21, created + Duration::minutes(2)),
            ]);
        let enricher = BatchEnricher::new(&store, DEFAULT_REPLY_LIMIT);

        let mut closed = conversation_row(1, 100, created);
        closed.closed_at = Some("2024-01-02 12:00:00".to_string());
        let rows = vec![closed, conversation_row(2, 100, created)];

        let batch = enricher.enrich(rows).await.unwrap();

        assert_eq!(batch[0].tags.len(), 2);
        let reply_ids: Vec<i64> = batch[0].replies.iter().map(|r| r.id).collect();
        assert_eq!(reply_ids, vec![12, 11]);
        assert_eq!(batch[0].closed_at, Some(mock_timestamp(2024, 1, 2, 12, 0, 0)));

        // No relations still means empty collections
        assert!(batch[1].tags.is_empty());
        assert!(batch[1].replies.is_empty());
        assert_eq!(store.query_count(), 2);
    }

    #[tokio::test]
    async fn test_reply_cap_keeps_most_recent() {
        let created = mock_timestamp(2024, 1, 2, 10, 0, 0);
        let store = MemoryStore::new().with_replies(
            (1..=5).map(|i| reply_row(i, 1, 20, created + Duration::minutes(i))),
        );
        let enricher = BatchEnricher::new(&store, 2);

        let batch = enricher.enrich(vec![conversation_row(1, 100, created)]).await.unwrap();
        let reply_ids: Vec<i64> = batch[0].replies.iter().map(|r| r.id).collect();
        assert_eq!(reply_ids, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_bad_timestamp_aborts() {
        let store = MemoryStore::new();
        let enricher = BatchEnricher::new(&store, DEFAULT_REPLY_LIMIT);

        let mut row = conversation_row(1, 100, mock_timestamp(2024, 1, 2, 10, 0, 0));
        row.closed_at = Some("yesterday-ish".to_string());

        let err = enricher.enrich(vec![row]).await.unwrap_err();
        match err {
            ReportError::Parse { message, value } => {
                assert!(message.contains("closed_at"));
                assert_eq!(value, "yesterday-ish");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_batch_skips_queries() {
        let store = MemoryStore::new();
        let enricher = BatchEnricher::new(&store, DEFAULT_REPLY_LIMIT);
        assert!(enricher.enrich(Vec::new()).await.unwrap().is_empty());
        assert_eq!(store.query_count(), 0);
    }
}
