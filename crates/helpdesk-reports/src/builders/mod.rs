//! Metric builders
//!
//! Each builder owns one accumulator, sees every enriched batch through
//! [`ReportBuilder::process`] and produces its result once through
//! [`ReportBuilder::finalize`]. Builders never share state, so the order in
//! which they are driven does not matter.

mod agents;
mod busiest_time;
mod first_reply;
mod new_conversations;
mod tagged_conversations;
mod tags;

pub use agents::{AgentStats, ConversationAgentsBuilder, ConversationAgentsResult};
pub use busiest_time::{BusiestTimeOfDayBuilder, BusiestTimeOfDayResult};
pub use first_reply::{FirstReplyBand, FirstReplyTimesBuilder, FirstReplyTimesResult};
pub use new_conversations::{NewConversationsBuilder, NewConversationsResult};
pub use tagged_conversations::{TaggedConversationsBuilder, TaggedConversationsResult};
pub use tags::{ConversationTagsBuilder, ConversationTagsResult, TagStats};

use async_trait::async_trait;
use helpdesk_common::{Conversation, ReplyTimeUnit, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::date_range::MetricDateRange;
use crate::store::ConversationStore;

pub const NEW_CONVERSATIONS: &str = "newConversations";
pub const BUSIEST_TIME_OF_DAY: &str = "busiestTimeOfDay";
pub const CONVERSATION_TAGS: &str = "conversationTags";
pub const TAGGED_CONVERSATIONS: &str = "taggedConversations";
pub const FIRST_REPLY_TIMES: &str = "firstReplyTimes";
pub const CONVERSATION_AGENTS: &str = "conversationAgents";

/// Everything a builder may need for one report run
#[derive(Clone)]
pub struct BuilderContext {
    pub range: MetricDateRange,
    pub store: Arc<dyn ConversationStore>,
    /// Rows kept in ranked lists
    pub list_limit: usize,
    /// Agent identities loaded per run
    pub agent_limit: usize,
    pub first_reply_unit: ReplyTimeUnit,
}

impl fmt::Debug for BuilderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderContext")
            .field("range", &self.range)
            .field("store", &"<ConversationStore>")
            .field("list_limit", &self.list_limit)
            .field("agent_limit", &self.agent_limit)
            .field("first_reply_unit", &self.first_reply_unit)
            .finish()
    }
}

/// Incremental aggregator for one report facet
#[async_trait]
pub trait ReportBuilder: Send {
    /// Metric name the result is reported under
    fn name(&self) -> &str;

    /// Fold one enriched batch into the accumulator
    async fn process(&mut self, batch: &[Conversation]) -> Result<()>;

    /// Compute derived statistics and hand over the result
    fn finalize(self: Box<Self>) -> MetricResult;
}

/// Finalized output of a builder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricResult {
    NewConversations(NewConversationsResult),
    BusiestTimeOfDay(BusiestTimeOfDayResult),
    ConversationTags(ConversationTagsResult),
    TaggedConversations(TaggedConversationsResult),
    FirstReplyTimes(FirstReplyTimesResult),
    ConversationAgents(ConversationAgentsResult),
    /// Result of a builder registered outside this crate
    Custom(serde_json::Value),
}

/// Per-bucket counters with every key of the range present from the start
pub(crate) fn seeded_buckets(range: &MetricDateRange) -> BTreeMap<String, u64> {
    range.all_bucket_keys().into_iter().map(|key| (key, 0)).collect()
}
