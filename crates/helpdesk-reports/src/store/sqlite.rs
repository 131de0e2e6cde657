//! SQLite-backed row store

use async_trait::async_trait;
use helpdesk_common::{Agent, ConversationKind, ConversationRow, ReplyRow, Result, TagRow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

use super::{ChunkQuery, ConversationStore};
use helpdesk_common::format_db_timestamp;

/// Database schema version for migrations
const SCHEMA_VERSION: i32 = 1;

/// Row store over the helpdesk tables
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for `url`, creating the database file if needed
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        info!("Connecting to row store: {}", url);

        // Every in-memory connection is its own database
        let max_connections = if url.contains(":memory:") { 1 } else { max_connections };

        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the helpdesk tables if they do not exist yet
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        let current_version: Option<i32> =
            sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;

        match current_version {
            Some(version) if version >= SCHEMA_VERSION => {
                debug!("Row store schema is up to date (version {})", version);
                return Ok(());
            }
            Some(version) => {
                info!("Upgrading row store schema from version {} to {}", version, SCHEMA_VERSION);
            }
            None => {
                info!("Creating row store schema (version {})", SCHEMA_VERSION);
            }
        }

        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                image TEXT,
                is_agent BOOLEAN NOT NULL DEFAULT 0
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY,
                user_id INTEGER,
                assigned_to INTEGER,
                closed_by INTEGER,
                created_at TEXT NOT NULL,
                closed_at TEXT,
                status_category INTEGER NOT NULL DEFAULT 6,
                rating BOOLEAN,
                channel TEXT,
                used_ai_agent BOOLEAN NOT NULL DEFAULT 0,
                type TEXT
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_conversations_created_at ON conversations (created_at)",
            r#"
            CREATE TABLE IF NOT EXISTS conversation_items (
                id INTEGER PRIMARY KEY,
                conversation_id INTEGER NOT NULL,
                user_id INTEGER,
                created_at TEXT NOT NULL,
                FOREIGN KEY (conversation_id) REFERENCES conversations (id)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_conversation_items_conversation ON conversation_items (conversation_id, created_at)",
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS taggables (
                tag_id INTEGER NOT NULL,
                taggable_id INTEGER NOT NULL,
                taggable_type TEXT NOT NULL DEFAULT 'conversation',
                PRIMARY KEY (tag_id, taggable_id, taggable_type),
                FOREIGN KEY (tag_id) REFERENCES tags (id)
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        sqlx::query("INSERT OR REPLACE INTO schema_version (version) VALUES (?)")
            .bind(SCHEMA_VERSION)
            .execute(&self.pool)
            .await?;

        info!("Row store schema ready");
        Ok(())
    }

    pub async fn insert_conversation(&self, row: &ConversationRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO conversations
                (id, user_id, assigned_to, closed_by, created_at, closed_at,
                 status_category, rating, channel, used_ai_agent, type)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.assigned_to)
        .bind(row.closed_by)
        .bind(&row.created_at)
        .bind(&row.closed_at)
        .bind(row.status_category)
        .bind(row.rating)
        .bind(&row.channel)
        .bind(row.used_ai_agent)
        .bind(row.kind.map(|kind| kind.as_str()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_reply(&self, row: &ReplyRow) -> Result<()> {
        sqlx::query("INSERT INTO conversation_items (id, conversation_id, user_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(row.id)
            .bind(row.conversation_id)
            .bind(row.user_id)
            .bind(&row.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Attach a tag to a conversation, creating the tag on first use
    pub async fn insert_tag(&self, row: &TagRow) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO tags (id, name) VALUES (?, ?)")
            .bind(row.tag_id)
            .bind(&row.name)
            .execute(&self.pool)
            .await?;
        sqlx::query("INSERT OR IGNORE INTO taggables (tag_id, taggable_id, taggable_type) VALUES (?, ?, 'conversation')")
            .bind(row.tag_id)
            .bind(row.conversation_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_agent(&self, agent: &Agent) -> Result<()> {
        sqlx::query("INSERT INTO users (id, name, email, image, is_agent) VALUES (?, ?, ?, ?, 1)")
            .bind(agent.id)
            .bind(&agent.name)
            .bind(&agent.email)
            .bind(&agent.image)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn conversation_from_row(row: &SqliteRow) -> std::result::Result<ConversationRow, sqlx::Error> {
    let kind: Option<String> = row.try_get("type")?;
    let kind = match kind {
        Some(raw) => match ConversationKind::from_str(&raw) {
            Ok(kind) => Some(kind),
            Err(_) => {
                warn!("Ignoring unknown conversation type '{}'", raw);
                None
            }
        },
        None => None,
    };

    Ok(ConversationRow {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        assigned_to: row.try_get("assigned_to")?,
        closed_by: row.try_get("closed_by")?,
        created_at: row.try_get("created_at")?,
        closed_at: row.try_get("closed_at")?,
        status_category: row.try_get("status_category")?,
        rating: row.try_get("rating")?,
        channel: row.try_get("channel")?,
        used_ai_agent: row.try_get("used_ai_agent")?,
        kind,
    })
}

fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    let mut sep = qb.separated(", ");
    for id in ids {
        sep.push_bind(*id);
    }
    sep.push_unseparated(")");
}

#[async_trait]
impl ConversationStore for SqliteStore {
    #[instrument(skip(self, query))]
    async fn conversation_chunk(
        &self,
        query: &ChunkQuery,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<ConversationRow>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, user_id, assigned_to, closed_by, created_at, closed_at, \
             status_category, rating, channel, used_ai_agent, type \
             FROM conversations WHERE id > ",
        );
        qb.push_bind(after_id);
        // datetime() normalizes RFC 3339 and fractional-second values
        qb.push(" AND datetime(created_at) >= ");
        qb.push_bind(format_db_timestamp(query.start));
        qb.push(" AND datetime(created_at) <= ");
        qb.push_bind(format_db_timestamp(query.end));
        if let Some(kind) = query.kind {
            qb.push(" AND type = ");
            qb.push_bind(kind.as_str());
        }
        qb.push(" ORDER BY id ASC LIMIT ");
        qb.push_bind(limit as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;
        let conversations = rows
            .iter()
            .map(conversation_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Loaded {} conversation rows", conversations.len());
        Ok(conversations)
    }

    async fn tags_for(&self, conversation_ids: &[i64]) -> Result<Vec<TagRow>> {
        if conversation_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT tg.taggable_id AS conversation_id, t.id AS tag_id, t.name \
             FROM taggables tg JOIN tags t ON t.id = tg.tag_id \
             WHERE tg.taggable_type = 'conversation' AND tg.taggable_id IN (",
        );
        push_id_list(&mut qb, conversation_ids);
        qb.push(" ORDER BY tg.taggable_id, t.id");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<TagRow> {
                Ok(TagRow {
                    conversation_id: row.try_get("conversation_id")?,
                    tag_id: row.try_get("tag_id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn recent_replies_for(&self, conversation_ids: &[i64], limit: usize) -> Result<Vec<ReplyRow>> {
        if conversation_ids.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, conversation_id, user_id, created_at FROM conversation_items \
             WHERE conversation_id IN (",
        );
        push_id_list(&mut qb, conversation_ids);
        qb.push(" ORDER BY julianday(created_at) DESC, id DESC LIMIT ");
        qb.push_bind(limit as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<ReplyRow> {
                Ok(ReplyRow {
                    id: row.try_get("id")?,
                    conversation_id: row.try_get("conversation_id")?,
                    user_id: row.try_get("user_id")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn agents(&self, limit: usize) -> Result<Vec<Agent>> {
        let rows = sqlx::query(
            "SELECT id, name, email, image FROM users WHERE is_agent = 1 ORDER BY id LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<Agent> {
                Ok(Agent {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    email: row.try_get("email")?,
                    image: row.try_get("image")?,
                })
            })
            .collect()
    }
}
