//! Test utilities and shared fixtures.
//!
//! Available to other crates through the `testing` feature.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialize logging for tests. Safe to call multiple times.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = fmt().with_test_writer().with_env_filter(filter).try_init();
    });
}

/// Test fixture for creating a UTC timestamp.
pub fn mock_timestamp(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
        .unwrap()
}

/// Assert that two floating point numbers are approximately equal within a tolerance.
pub fn assert_approx_eq(left: f64, right: f64, tolerance: f64) {
    let diff = (left - right).abs();
    assert!(
        diff <= tolerance,
        "assertion failed: `{left}` is not approximately equal to `{right}` (tolerance: {tolerance}, diff: {diff})"
    );
}

/// Fixtures for conversation records.
pub mod conversation_fixtures {
    use super::*;
    use crate::{
        format_db_timestamp, Agent, Conversation, ConversationKind, ConversationRow, Reply,
        ReplyRow, Tag, TagRow,
    };

    /// Fluent builder for enriched conversations.
    #[derive(Debug, Clone)]
    pub struct ConversationBuilder {
        conversation: Conversation,
        next_reply_id: i64,
    }

    impl ConversationBuilder {
        /// New open conversation created by customer `user_id`.
        pub fn new(id: i64, user_id: i64, created_at: DateTime<Utc>) -> Self {
            Self {
                conversation: Conversation {
                    id,
                    user_id: Some(user_id),
                    assigned_to: None,
                    closed_by: None,
                    created_at,
                    closed_at: None,
                    status_category: 6,
                    rating: None,
                    channel: Some("email".to_string()),
                    used_ai_agent: false,
                    tags: Vec::new(),
                    replies: Vec::new(),
                },
                next_reply_id: id * 1000,
            }
        }

        /// Assigns the conversation to `agent_id`.
        pub fn assigned_to(mut self, agent_id: i64) -> Self {
            self.conversation.assigned_to = Some(agent_id);
            self
        }

        /// Marks the conversation closed by `closed_by` at `closed_at`.
        pub fn closed(mut self, closed_by: i64, closed_at: DateTime<Utc>) -> Self {
            self.conversation.closed_by = Some(closed_by);
            self.conversation.closed_at = Some(closed_at);
            self.conversation.status_category = 1;
            self
        }

        /// Sets the satisfaction rating.
        pub fn rating(mut self, rating: Option<bool>) -> Self {
            self.conversation.rating = rating;
            self
        }

        /// Attaches a tag.
        pub fn tag(mut self, id: i64, name: &str) -> Self {
            self.conversation.tags.push(Tag { id, name: name.to_string() });
            self
        }

        /// Adds a reply `offset_secs` after creation. Replies stay sorted.
        pub fn reply(mut self, user_id: i64, offset_secs: i64) -> Self {
            self.next_reply_id += 1;
            self.conversation.replies.push(Reply {
                id: self.next_reply_id,
                user_id: Some(user_id),
                created_at: self.conversation.created_at + chrono::Duration::seconds(offset_secs),
            });
            self.conversation.replies.sort_by_key(|reply| reply.created_at);
            self
        }

        /// Finished conversation.
        pub fn build(self) -> Conversation {
            self.conversation
        }
    }

    /// Raw row for an open conversation.
    pub fn conversation_row(id: i64, user_id: i64, created_at: DateTime<Utc>) -> ConversationRow {
        ConversationRow {
            id,
            user_id: Some(user_id),
            assigned_to: None,
            closed_by: None,
            created_at: format_db_timestamp(created_at),
            closed_at: None,
            status_category: 6,
            rating: None,
            channel: Some("email".to_string()),
            used_ai_agent: false,
            kind: Some(ConversationKind::Ticket),
        }
    }

    /// Raw reply row.
    pub fn reply_row(id: i64, conversation_id: i64, user_id: i64, created_at: DateTime<Utc>) -> ReplyRow {
        ReplyRow {
            id,
            conversation_id,
            user_id: Some(user_id),
            created_at: format_db_timestamp(created_at),
        }
    }

    /// Raw tag join row.
    pub fn tag_row(conversation_id: i64, tag_id: i64, name: &str) -> TagRow {
        TagRow {
            conversation_id,
            tag_id,
            name: name.to_string(),
        }
    }

    /// Agent identity with predictable name and email.
    pub fn agent(id: i64) -> Agent {
        Agent {
            id,
            name: format!("Agent {id}"),
            email: format!("agent{id}@example.com"),
            image: None,
        }
    }
}

/// Configuration-related test utilities.
pub mod config_fixtures {
    /// Create a minimal valid configuration as YAML string.
    pub fn minimal_config_yaml() -> &'static str {
        r#"
database:
  url: "sqlite::memory:"

reports:
  batch_size: 500
"#
    }

    /// Create a full configuration as YAML string.
    pub fn full_config_yaml() -> &'static str {
        concat!(
            "database:\n",
            "  url: \"sqlite://helpdesk.db\"\n",
            "  max_connections: 4\n",
            "\n",
            "reports:\n",
            "  batch_size: 250\n",
            "  reply_limit: 800\n",
            "  agent_limit: 40\n",
            "  list_limit: 8\n",
            "  first_reply_unit: hours\n",
            "  default_timezone: \"Europe/Berlin\"\n",
            "  cache:\n",
            "    enabled: true\n",
            "    report_minutes: 15\n",
            "    max_capacity: 200\n",
            "\n",
            "logging:\n",
            "  level: \"debug\"\n",
            "  pretty_format: false\n"
        )
    }
}
