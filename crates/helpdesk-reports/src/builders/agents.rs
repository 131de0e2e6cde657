use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helpdesk_common::{average, percentage, round_to, Agent, Conversation, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{MetricResult, ReportBuilder, CONVERSATION_AGENTS};
use crate::store::ConversationStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStats {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub conversations: u64,
    /// Share of all processed conversations attributed to this agent
    pub percentage: f64,
    pub replies: u64,
    /// Mean gap between consecutive agent replies, in seconds
    pub average_response_time: f64,
    pub solved: u64,
    /// Mean creation-to-close time of solved conversations, in seconds
    pub average_resolution_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAgentsResult {
    pub agents: Vec<AgentStats>,
    /// Unweighted mean of every agent's average response time
    pub average_response_time: f64,
    /// Positive ratings as a percentage of all ratings, `None` without ratings
    pub satisfaction: Option<f64>,
    pub total_conversations: u64,
}

#[derive(Debug, Default)]
struct AgentAccumulator {
    conversations: u64,
    replies: u64,
    reply_time_sum: i64,
    solved: u64,
    resolution_time_sum: i64,
}

/// Per-agent workload, response and resolution statistics
pub struct ConversationAgentsBuilder {
    store: Arc<dyn ConversationStore>,
    agent_limit: usize,
    list_limit: usize,
    agents: Option<HashMap<i64, Agent>>,
    stats: HashMap<i64, AgentAccumulator>,
    total_conversations: u64,
    ratings: u64,
    positive_ratings: u64,
}

impl ConversationAgentsBuilder {
    pub fn new(store: Arc<dyn ConversationStore>, agent_limit: usize, list_limit: usize) -> Self {
        Self {
            store,
            agent_limit,
            list_limit,
            agents: None,
            stats: HashMap::new(),
            total_conversations: 0,
            ratings: 0,
            positive_ratings: 0,
        }
    }

    async fn load_agents(&mut self) -> Result<()> {
        if self.agents.is_none() {
            let agents = self.store.agents(self.agent_limit).await?;
            debug!("Loaded {} agents for report run", agents.len());
            self.agents = Some(agents.into_iter().map(|agent| (agent.id, agent)).collect());
        }
        Ok(())
    }

    fn accumulate(&mut self, conversation: &Conversation) {
        let Some(agents) = self.agents.as_ref() else {
            return;
        };
        let is_agent = |id: &i64| agents.contains_key(id);

        self.total_conversations += 1;
        if let Some(rating) = conversation.rating {
            self.ratings += 1;
            if rating {
                self.positive_ratings += 1;
            }
        }

        let first_agent_reply = conversation
            .replies
            .iter()
            .filter_map(|reply| reply.user_id)
            .find(|user_id| is_agent(user_id));
        let responsible = conversation
            .assigned_to
            .filter(|id| is_agent(id))
            .or(first_agent_reply)
            .or(conversation.closed_by.filter(|id| is_agent(id)));

        // Gaps between consecutive agent replies, credited to the later author
        let mut gaps = Vec::new();
        let mut previous: Option<DateTime<Utc>> = None;
        for reply in &conversation.replies {
            let Some(author) = reply.user_id.filter(|id| is_agent(id)) else {
                continue;
            };
            let gap = previous.map_or(0, |at| (reply.created_at - at).num_seconds().max(0));
            gaps.push((author, gap));
            previous = Some(reply.created_at);
        }

        for (author, gap) in gaps {
            let entry = self.stats.entry(author).or_default();
            entry.replies += 1;
            entry.reply_time_sum += gap;
        }

        if let Some(agent_id) = responsible {
            let entry = self.stats.entry(agent_id).or_default();
            entry.conversations += 1;
            if let Some(closed_at) = conversation.closed_at {
                entry.solved += 1;
                entry.resolution_time_sum += (closed_at - conversation.created_at).num_seconds().max(0);
            }
        }
    }
}

#[async_trait]
impl ReportBuilder for ConversationAgentsBuilder {
    fn name(&self) -> &str {
        CONVERSATION_AGENTS
    }

    async fn process(&mut self, batch: &[Conversation]) -> Result<()> {
        self.load_agents().await?;
        for conversation in batch {
            self.accumulate(conversation);
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> MetricResult {
        let agents = self.agents.unwrap_or_default();
        let total = self.total_conversations;

        let mut rows: Vec<AgentStats> = self
            .stats
            .into_iter()
            .filter_map(|(id, acc)| {
                let agent = agents.get(&id)?;
                Some(AgentStats {
                    id,
                    name: agent.name.clone(),
                    email: agent.email.clone(),
                    image: agent.image.clone(),
                    conversations: acc.conversations,
                    percentage: round_to(percentage(acc.conversations, total), 1),
                    replies: acc.replies,
                    average_response_time: average(acc.reply_time_sum as f64, acc.replies),
                    solved: acc.solved,
                    average_resolution_time: average(acc.resolution_time_sum as f64, acc.solved),
                })
            })
            .collect();

        rows.sort_by(|a, b| b.conversations.cmp(&a.conversations).then(a.id.cmp(&b.id)));

        let average_response_time = if rows.is_empty() {
            0.0
        } else {
            rows.iter().map(|row| row.average_response_time).sum::<f64>() / rows.len() as f64
        };

        let satisfaction = (self.ratings > 0).then(|| percentage(self.positive_ratings, self.ratings));

        rows.truncate(self.list_limit);

        MetricResult::ConversationAgents(ConversationAgentsResult {
            agents: rows,
            average_response_time,
            satisfaction,
            total_conversations: total,
        })
    }
}
