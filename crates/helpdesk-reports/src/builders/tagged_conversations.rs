use async_trait::async_trait;
use helpdesk_common::{Conversation, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{seeded_buckets, MetricResult, ReportBuilder, TAGGED_CONVERSATIONS};
use crate::date_range::MetricDateRange;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedConversationsResult {
    pub date_results: BTreeMap<String, u64>,
    pub total_tagged: u64,
    pub total: u64,
}

/// Conversations carrying at least one tag, per bucket
pub struct TaggedConversationsBuilder {
    range: MetricDateRange,
    date_results: BTreeMap<String, u64>,
    total_tagged: u64,
    total: u64,
}

impl TaggedConversationsBuilder {
    pub fn new(range: MetricDateRange) -> Self {
        Self {
            date_results: seeded_buckets(&range),
            range,
            total_tagged: 0,
            total: 0,
        }
    }
}

#[async_trait]
impl ReportBuilder for TaggedConversationsBuilder {
    fn name(&self) -> &str {
        TAGGED_CONVERSATIONS
    }

    async fn process(&mut self, batch: &[Conversation]) -> Result<()> {
        for conversation in batch {
            self.total += 1;
            if conversation.tags.is_empty() {
                continue;
            }
            self.total_tagged += 1;
            *self
                .date_results
                .entry(self.range.bucket_key(conversation.created_at))
                .or_insert(0) += 1;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> MetricResult {
        MetricResult::TaggedConversations(TaggedConversationsResult {
            date_results: self.date_results,
            total_tagged: self.total_tagged,
            total: self.total,
        })
    }
}
