//! SQLite row store tests.
//!
//! Runs against an in-memory database, one connection per test.

use chrono::Duration;
use helpdesk_common::test_utils::conversation_fixtures::{agent, conversation_row, reply_row, tag_row};
use helpdesk_common::test_utils::mock_timestamp;
use helpdesk_common::ConversationKind;
use helpdesk_config::ReportsConfig;
use helpdesk_reports::builders::{CONVERSATION_AGENTS, NEW_CONVERSATIONS};
use helpdesk_reports::{
    ChunkQuery, ConversationStore, HelpdeskReports, MemoryStore, MetricResult, ReportParams, SqliteStore,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;

async fn empty_store() -> SqliteStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = SqliteStore::new(pool);
    store.migrate().await.unwrap();
    store
}

async fn seeded_store() -> SqliteStore {
    let store = empty_store().await;
    let base = mock_timestamp(2024, 3, 4, 8, 0, 0);

    for id in 1..=12i64 {
        let created = base + Duration::hours(id * 5);
        let mut row = conversation_row(id, 500 + id, created);
        if id % 2 == 0 {
            row.kind = Some(ConversationKind::Chat);
        }
        row.assigned_to = Some(1 + id % 2);
        if id <= 6 {
            row.closed_by = row.assigned_to;
            row.closed_at = Some(helpdesk_common::format_db_timestamp(created + Duration::hours(1)));
            row.rating = Some(id != 3);
        }
        store.insert_conversation(&row).await.unwrap();

        let agent_id = 1 + id % 2;
        store
            .insert_reply(&reply_row(id * 10, id, agent_id, created + Duration::minutes(3)))
            .await
            .unwrap();
        store
            .insert_reply(&reply_row(id * 10 + 1, id, 500 + id, created + Duration::minutes(9)))
            .await
            .unwrap();

        if id % 3 == 0 {
            store.insert_tag(&tag_row(id, 7, "refund")).await.unwrap();
        }
    }

    // Outside the March window
    store
        .insert_conversation(&conversation_row(99, 600, mock_timestamp(2024, 2, 10, 12, 0, 0)))
        .await
        .unwrap();

    store.insert_agent(&agent(1)).await.unwrap();
    store.insert_agent(&agent(2)).await.unwrap();
    store
}

fn march_query(kind: Option<ConversationKind>) -> ChunkQuery {
    ChunkQuery {
        start: mock_timestamp(2024, 3, 1, 0, 0, 0),
        end: mock_timestamp(2024, 3, 31, 23, 59, 59),
        kind,
    }
}

#[tokio::test]
async fn test_migrate_is_idempotent() {
    let store = empty_store().await;
    store.migrate().await.unwrap();
    store.migrate().await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_conversation_chunks_are_keyset_paginated() {
    let store = seeded_store().await;

    let first = store.conversation_chunk(&march_query(None), 0, 5).await.unwrap();
    assert_eq!(first.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);

    let rest = store.conversation_chunk(&march_query(None), 5, 100).await.unwrap();
    assert_eq!(rest.len(), 7);
    assert!(rest.iter().all(|row| row.id != 99));

    let chats = store
        .conversation_chunk(&march_query(Some(ConversationKind::Chat)), 0, 100)
        .await
        .unwrap();
    assert_eq!(chats.len(), 6);
    assert!(chats.iter().all(|row| row.kind == Some(ConversationKind::Chat)));

    let closed = &first[0];
    assert!(closed.closed_at.is_some());
    assert_eq!(closed.rating, Some(true));
}

#[tokio::test]
async fn test_rfc3339_and_fractional_timestamps_match_memory_store() {
    let store = empty_store().await;
    let mut rows = Vec::new();
    for (id, created_at) in [
        (1, "2024-01-31T10:00:00Z"),
        (2, "2024-01-31 23:59:59.250"),
        (3, "2024-02-01T01:30:00+02:00"),
        (4, "2024-02-01T00:00:00Z"),
        (5, "2024-01-01T00:00:00.000Z"),
    ] {
        let mut row = conversation_row(id, 500, mock_timestamp(2024, 1, 15, 0, 0, 0));
        row.created_at = created_at.to_string();
        store.insert_conversation(&row).await.unwrap();
        rows.push(row);
    }
    let memory = MemoryStore::new().with_conversations(rows);

    let january = ChunkQuery {
        start: mock_timestamp(2024, 1, 1, 0, 0, 0),
        end: mock_timestamp(2024, 1, 31, 23, 59, 59) + Duration::nanoseconds(999_999_999),
        kind: None,
    };
    let ids = |rows: Vec<helpdesk_common::ConversationRow>| rows.iter().map(|r| r.id).collect::<Vec<_>>();

    let from_sqlite = ids(store.conversation_chunk(&january, 0, 100).await.unwrap());
    let from_memory = ids(memory.conversation_chunk(&january, 0, 100).await.unwrap());
    assert_eq!(from_sqlite, vec![1, 2, 3, 5]);
    assert_eq!(from_sqlite, from_memory);
}

#[tokio::test]
async fn test_relations_queries() {
    let store = seeded_store().await;

    let tags = store.tags_for(&[3, 4, 6]).await.unwrap();
    assert_eq!(tags.len(), 2);
    assert!(tags.iter().all(|tag| tag.name == "refund"));

    let replies = store.recent_replies_for(&[1, 2], 3).await.unwrap();
    assert_eq!(replies.iter().map(|r| r.id).collect::<Vec<_>>(), vec![21, 20, 11]);

    assert!(store.tags_for(&[]).await.unwrap().is_empty());
    assert_eq!(store.agents(50).await.unwrap().len(), 2);
    assert_eq!(store.agents(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_full_report_over_sqlite() {
    let store = Arc::new(seeded_store().await);
    let reports = HelpdeskReports::new(store, ReportsConfig::default()).unwrap();

    let report = reports
        .get_report("all", None, &ReportParams::between("2024-03-01", "2024-03-31"))
        .await
        .unwrap();

    match &report.get(NEW_CONVERSATIONS).unwrap().datasets[0] {
        MetricResult::NewConversations(result) => {
            assert_eq!(result.total, 12);
            assert_eq!(result.closed, 6);
            assert_eq!(result.solved_on_first_reply, 6);
            assert_eq!(result.solved_on_first_reply_percentage, 0.01);
        }
        other => panic!("unexpected result: {other:?}"),
    }

    match &report.get(CONVERSATION_AGENTS).unwrap().datasets[0] {
        MetricResult::ConversationAgents(result) => {
            assert_eq!(result.total_conversations, 12);
            assert_eq!(result.agents.len(), 2);
            assert_eq!(result.agents.iter().map(|a| a.conversations).sum::<u64>(), 12);
            let satisfaction = result.satisfaction.unwrap();
            assert!((satisfaction - 500.0 / 6.0).abs() < 1e-9);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
