use async_trait::async_trait;
use helpdesk_common::{round_to, Conversation, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{seeded_buckets, MetricResult, ReportBuilder, NEW_CONVERSATIONS};
use crate::date_range::MetricDateRange;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConversationsResult {
    pub total: u64,
    pub date_results: BTreeMap<String, u64>,
    /// Conversations closed inside the window
    pub closed: u64,
    /// Closed conversations that took exactly one non-creator reply
    pub solved_on_first_reply: u64,
    pub solved_on_first_reply_percentage: f64,
}

/// Counts new conversations per bucket and first-reply resolutions
pub struct NewConversationsBuilder {
    range: MetricDateRange,
    total: u64,
    date_results: BTreeMap<String, u64>,
    closed: u64,
    solved_on_first_reply: u64,
}

impl NewConversationsBuilder {
    pub fn new(range: MetricDateRange) -> Self {
        Self {
            date_results: seeded_buckets(&range),
            range,
            total: 0,
            closed: 0,
            solved_on_first_reply: 0,
        }
    }
}

#[async_trait]
impl ReportBuilder for NewConversationsBuilder {
    fn name(&self) -> &str {
        NEW_CONVERSATIONS
    }

    async fn process(&mut self, batch: &[Conversation]) -> Result<()> {
        for conversation in batch {
            self.total += 1;
            *self
                .date_results
                .entry(self.range.bucket_key(conversation.created_at))
                .or_insert(0) += 1;

            let closed_in_window = conversation
                .closed_at
                .is_some_and(|closed_at| self.range.contains(closed_at));
            if closed_in_window {
                self.closed += 1;
                if conversation.non_creator_replies().count() == 1 {
                    self.solved_on_first_reply += 1;
                }
            }
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> MetricResult {
        // Kept as the rounded ratio divided by 100; downstream charts read
        // this exact scale.
        let solved_on_first_reply_percentage = if self.closed == 0 {
            0.0
        } else {
            round_to(self.solved_on_first_reply as f64 / self.closed as f64, 1) / 100.0
        };

        MetricResult::NewConversations(NewConversationsResult {
            total: self.total,
            date_results: self.date_results,
            closed: self.closed,
            solved_on_first_reply: self.solved_on_first_reply,
            solved_on_first_reply_percentage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_range::{DateRangeResolver, ReportParams};
    use chrono::Duration;
    use chrono_tz::Tz;
    use helpdesk_common::test_utils::conversation_fixtures::ConversationBuilder;
    use helpdesk_common::test_utils::{assert_approx_eq, mock_timestamp};

    fn january() -> MetricDateRange {
        DateRangeResolver::new(Tz::UTC)
            .resolve(&ReportParams::between("2024-01-01", "2024-01-31"))
            .unwrap()
            .primary
    }

    fn unwrap(result: MetricResult) -> NewConversationsResult {
        match result {
            MetricResult::NewConversations(result) => result,
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_solved_on_first_reply_percentage_formula() {
        let created = mock_timestamp(2024, 1, 10, 9, 0, 0);
        let closed_at = created + Duration::hours(2);
        let mut batch = Vec::new();

        for id in 0..20 {
            let mut conversation = ConversationBuilder::new(id, 1000 + id, created);
            if id < 10 {
                conversation = conversation.closed(7, closed_at);
                // Three closed after one agent reply, the rest after two
                conversation = conversation.reply(7, 60);
                if id >= 3 {
                    conversation = conversation.reply(7, 120);
                }
                // Customer follow-ups never count
                conversation = conversation.reply(1000 + id, 90);
            }
            batch.push(conversation.build());
        }

        let mut builder = Box::new(NewConversationsBuilder::new(january()));
        builder.process(&batch).await.unwrap();
        let result = unwrap(builder.finalize());

        assert_eq!(result.total, 20);
        assert_eq!(result.closed, 10);
        assert_eq!(result.solved_on_first_reply, 3);
        // round(3 / 10, 1) / 100, not 30%
        assert_approx_eq(result.solved_on_first_reply_percentage, 0.003, 1e-12);
    }

    #[tokio::test]
    async fn test_buckets_are_preseeded() {
        let batch = vec![
            ConversationBuilder::new(1, 10, mock_timestamp(2024, 1, 5, 8, 0, 0)).build(),
            ConversationBuilder::new(2, 10, mock_timestamp(2024, 1, 5, 18, 0, 0)).build(),
        ];

        let mut builder = Box::new(NewConversationsBuilder::new(january()));
        builder.process(&batch).await.unwrap();
        let result = unwrap(builder.finalize());

        assert_eq!(result.date_results.len(), 31);
        assert_eq!(result.date_results["2024-01-05"], 2);
        assert_eq!(result.date_results["2024-01-06"], 0);
    }

    #[tokio::test]
    async fn test_closed_outside_window_is_ignored() {
        let created = mock_timestamp(2024, 1, 31, 22, 0, 0);
        let batch = vec![ConversationBuilder::new(1, 10, created)
            .reply(7, 60)
            .closed(7, mock_timestamp(2024, 2, 1, 9, 0, 0))
            .build()];

        let mut builder = Box::new(NewConversationsBuilder::new(january()));
        builder.process(&batch).await.unwrap();
        let result = unwrap(builder.finalize());

        assert_eq!(result.closed, 0);
        assert_eq!(result.solved_on_first_reply_percentage, 0.0);
    }
}
