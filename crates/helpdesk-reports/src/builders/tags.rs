use async_trait::async_trait;
use helpdesk_common::{percentage, round_to, truncate_chars, Conversation, Result};
use serde::Serialize;
use std::collections::HashMap;

use super::{MetricResult, ReportBuilder, CONVERSATION_TAGS};

/// Tag names are cut to this many characters before counting
pub const TAG_NAME_MAX_CHARS: usize = 18;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagStats {
    pub name: String,
    pub count: u64,
    pub percentage_of_conversations: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTagsResult {
    pub data: Vec<TagStats>,
    pub total_conversations: u64,
}

/// Most used tags across the processed conversations
pub struct ConversationTagsBuilder {
    limit: usize,
    counts: HashMap<String, u64>,
    total_conversations: u64,
}

impl ConversationTagsBuilder {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            counts: HashMap::new(),
            total_conversations: 0,
        }
    }
}

#[async_trait]
impl ReportBuilder for ConversationTagsBuilder {
    fn name(&self) -> &str {
        CONVERSATION_TAGS
    }

    async fn process(&mut self, batch: &[Conversation]) -> Result<()> {
        for conversation in batch {
            self.total_conversations += 1;
            for tag in &conversation.tags {
                *self
                    .counts
                    .entry(truncate_chars(&tag.name, TAG_NAME_MAX_CHARS))
                    .or_insert(0) += 1;
            }
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> MetricResult {
        let total = self.total_conversations;
        let mut data: Vec<TagStats> = self
            .counts
            .into_iter()
            .map(|(name, count)| TagStats {
                name,
                count,
                percentage_of_conversations: round_to(percentage(count, total), 1),
            })
            .collect();

        data.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        data.truncate(self.limit);

        MetricResult::ConversationTags(ConversationTagsResult {
            data,
            total_conversations: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_common::test_utils::conversation_fixtures::ConversationBuilder;
    use helpdesk_common::test_utils::mock_timestamp;

    fn unwrap(result: MetricResult) -> ConversationTagsResult {
        match result {
            MetricResult::ConversationTags(result) => result,
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_billing_on_four_of_ten() {
        let created = mock_timestamp(2024, 1, 2, 9, 0, 0);
        let batch: Vec<_> = (0..10)
            .map(|id| {
                let conversation = ConversationBuilder::new(id, 100, created);
                if id < 4 {
                    conversation.tag(1, "billing").build()
                } else {
                    conversation.build()
                }
            })
            .collect();

        let mut builder = Box::new(ConversationTagsBuilder::new(10));
        builder.process(&batch).await.unwrap();
        let result = unwrap(builder.finalize());

        assert_eq!(result.total_conversations, 10);
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].name, "billing");
        assert_eq!(result.data[0].count, 4);
        assert_eq!(result.data[0].percentage_of_conversations, 40.0);
    }

    #[tokio::test]
    async fn test_truncated_names_merge_and_limit_applies() {
        let created = mock_timestamp(2024, 1, 2, 9, 0, 0);
        let batch = vec![
            ConversationBuilder::new(1, 100, created)
                .tag(1, "integration-request-a")
                .tag(2, "urgent")
                .build(),
            ConversationBuilder::new(2, 100, created)
                .tag(3, "integration-request-b")
                .tag(4, "billing")
                .build(),
            ConversationBuilder::new(3, 100, created).tag(2, "urgent").build(),
        ];

        let mut builder = Box::new(ConversationTagsBuilder::new(2));
        builder.process(&batch).await.unwrap();
        let result = unwrap(builder.finalize());

        let names: Vec<&str> = result.data.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["integration-reques", "urgent"]);
        assert_eq!(result.data[0].count, 2);
        assert_eq!(result.data[0].percentage_of_conversations, 66.7);
    }

    #[test]
    fn test_no_conversations_no_tags() {
        let builder = Box::new(ConversationTagsBuilder::new(10));
        let result = unwrap(builder.finalize());
        assert!(result.data.is_empty());
        assert_eq!(result.total_conversations, 0);
    }
}
