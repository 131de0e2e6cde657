//! Record types shared by the row store and the reporting pipeline.
//!
//! Rows come in two shapes: the raw `*Row` structs exactly as the store hands
//! them over (timestamps still strings), and the enriched records the metric
//! builders consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ReportError;

/// Model-type discriminator stored in the `conversations.type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    /// Email/web-form tickets
    Ticket,
    /// Live chat conversations
    Chat,
}

impl ConversationKind {
    /// Column value for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationKind::Ticket => "ticket",
            ConversationKind::Chat => "chat",
        }
    }
}

impl fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ticket" | "tickets" => Ok(ConversationKind::Ticket),
            "chat" | "chats" => Ok(ConversationKind::Chat),
            other => Err(ReportError::validation_field(
                format!("Unknown conversation kind '{other}'"),
                "kind",
            )),
        }
    }
}

/// Band width used when bucketing first reply times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyTimeUnit {
    /// Bands of 0-1, 1-5, 5-15, 15-60 and 60+ minutes
    #[default]
    Minutes,
    /// Bands of 0-1, 1-8, 8-24 and 24+ hours
    Hours,
}

impl FromStr for ReplyTimeUnit {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minutes" | "minute" | "min" => Ok(ReplyTimeUnit::Minutes),
            "hours" | "hour" | "h" => Ok(ReplyTimeUnit::Hours),
            other => Err(ReportError::validation_field(
                format!("Unknown reply time unit '{other}'"),
                "first_reply_unit",
            )),
        }
    }
}

/// A conversation row as loaded from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRow {
    /// Primary key, also the pagination cursor
    pub id: i64,
    /// Customer who opened the conversation
    pub user_id: Option<i64>,
    /// Explicitly assigned agent
    pub assigned_to: Option<i64>,
    /// User who closed the conversation
    pub closed_by: Option<i64>,
    /// Creation time, DB format or RFC 3339
    pub created_at: String,
    /// Close time, same formats as `created_at`
    pub closed_at: Option<String>,
    /// Ordinal; lower is more open
    pub status_category: i32,
    /// Customer satisfaction, `None` when unrated
    pub rating: Option<bool>,
    /// Intake channel such as `email`
    pub channel: Option<String>,
    /// Whether an AI agent took part
    pub used_ai_agent: bool,
    /// Model-type discriminator
    pub kind: Option<ConversationKind>,
}

/// A reply (conversation item) row as loaded from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyRow {
    /// Primary key
    pub id: i64,
    /// Conversation the reply belongs to
    pub conversation_id: i64,
    /// Author
    pub user_id: Option<i64>,
    /// Creation time, DB format or RFC 3339
    pub created_at: String,
}

/// A tag attached to a conversation, as returned by the join query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRow {
    /// Tagged conversation
    pub conversation_id: i64,
    /// Tag primary key
    pub tag_id: i64,
    /// Tag name as stored
    pub name: String,
}

/// Restricted view of a user that can act as an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// User id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Contact address
    pub email: String,
    /// Avatar URL
    pub image: Option<String>,
}

/// Tag attached to an enriched conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag primary key
    pub id: i64,
    /// Tag name as stored
    pub name: String,
}

/// Reply attached to an enriched conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Primary key
    pub id: i64,
    /// Author
    pub user_id: Option<i64>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// A conversation ready for metric builders: timestamps parsed, relations
/// attached. `replies` is sorted by `created_at` ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Primary key
    pub id: i64,
    /// Customer who opened the conversation
    pub user_id: Option<i64>,
    /// Explicitly assigned agent
    pub assigned_to: Option<i64>,
    /// User who closed the conversation
    pub closed_by: Option<i64>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Close time, `None` while open
    pub closed_at: Option<DateTime<Utc>>,
    /// Ordinal; lower is more open
    pub status_category: i32,
    /// Customer satisfaction, `None` when unrated
    pub rating: Option<bool>,
    /// Intake channel such as `email`
    pub channel: Option<String>,
    /// Whether an AI agent took part
    pub used_ai_agent: bool,
    /// Attached tags
    pub tags: Vec<Tag>,
    /// Replies in ascending creation order
    pub replies: Vec<Reply>,
}

impl Conversation {
    /// Replies written by someone other than the customer who opened it.
    pub fn non_creator_replies(&self) -> impl Iterator<Item = &Reply> {
        self.replies
            .iter()
            .filter(move |reply| reply.user_id.is_some() && reply.user_id != self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_conversation_kind_round_trip() {
        assert_eq!("ticket".parse::<ConversationKind>().unwrap(), ConversationKind::Ticket);
        assert_eq!(" Chats ".parse::<ConversationKind>().unwrap(), ConversationKind::Chat);
        assert_eq!(ConversationKind::Chat.to_string(), "chat");

        let err = "email".parse::<ConversationKind>().unwrap_err();
        assert_eq!(err.field(), Some("kind"));
    }

    #[test]
    fn test_conversation_kind_serialization() {
        let json = serde_json::to_string(&ConversationKind::Ticket).unwrap();
        assert_eq!(json, "\"ticket\"");
    }

    #[test]
    fn test_non_creator_replies_skip_customer_and_anonymous() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let conversation = Conversation {
            id: 1,
            user_id: Some(10),
            assigned_to: None,
            closed_by: None,
            created_at: at,
            closed_at: None,
            status_category: 1,
            rating: None,
            channel: None,
            used_ai_agent: false,
            tags: vec![],
            replies: vec![
                Reply { id: 1, user_id: Some(10), created_at: at },
                Reply { id: 2, user_id: None, created_at: at },
                Reply { id: 3, user_id: Some(20), created_at: at },
            ],
        };

        let ids: Vec<i64> = conversation.non_creator_replies().map(|r| r.id).collect();
        assert_eq!(ids, vec![3]);
    }
}
