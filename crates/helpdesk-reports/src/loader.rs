//! Keyset-paginated conversation loader

use helpdesk_common::{ConversationRow, Result};
use tracing::debug;

use crate::store::{ChunkQuery, ConversationStore};

/// Default number of conversations per batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Cursor over the conversations matching a [`ChunkQuery`].
///
/// Each call to [`BatchLoader::next_batch`] issues one query for the rows
/// after the last id seen, so at most one batch is held in memory.
pub struct BatchLoader<'a> {
    store: &'a dyn ConversationStore,
    query: ChunkQuery,
    batch_size: usize,
    last_id: i64,
    exhausted: bool,
    batches: usize,
    rows: usize,
}

impl<'a> BatchLoader<'a> {
    pub fn new(store: &'a dyn ConversationStore, query: ChunkQuery, batch_size: usize) -> Self {
        Self {
            store,
            query,
            batch_size: batch_size.max(1),
            last_id: 0,
            exhausted: false,
            batches: 0,
            rows: 0,
        }
    }

    /// The next batch, or `None` once every matching row was returned
    pub async fn next_batch(&mut self) -> Result<Option<Vec<ConversationRow>>> {
        if self.exhausted {
            return Ok(None);
        }

        let batch = self
            .store
            .conversation_chunk(&self.query, self.last_id, self.batch_size)
            .await?;

        if batch.len() < self.batch_size {
            self.exhausted = true;
        }

        let Some(last) = batch.last() else {
            return Ok(None);
        };
        self.last_id = last.id;
        self.batches += 1;
        self.rows += batch.len();

        debug!(
            batch = self.batches,
            rows = batch.len(),
            last_id = self.last_id,
            "Loaded conversation batch"
        );
        Ok(Some(batch))
    }

    /// Batches returned so far
    pub fn batches_loaded(&self) -> usize {
        self.batches
    }

    /// Rows returned so far
    pub fn rows_loaded(&self) -> usize {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use helpdesk_common::test_utils::conversation_fixtures::conversation_row;
    use helpdesk_common::test_utils::mock_timestamp;

    fn store_with(count: i64) -> MemoryStore {
        MemoryStore::new().with_conversations(
            (1..=count).map(|id| conversation_row(id, 100, mock_timestamp(2024, 1, 2, 10, 0, 0))),
        )
    }

    fn query() -> ChunkQuery {
        ChunkQuery {
            start: mock_timestamp(2024, 1, 1, 0, 0, 0),
            end: mock_timestamp(2024, 1, 31, 23, 59, 59),
            kind: None,
        }
    }

    #[tokio::test]
    async fn test_batches_cover_every_row_once() {
        let store = store_with(7);
        let mut loader = BatchLoader::new(&store, query(), 3);

        let mut seen = Vec::new();
        while let Some(batch) = loader.next_batch().await.unwrap() {
            assert!(batch.len() <= 3);
            seen.extend(batch.into_iter().map(|row| row.id));
        }

        assert_eq!(seen, (1..=7).collect::<Vec<_>>());
        assert_eq!(loader.batches_loaded(), 3);
        assert_eq!(loader.rows_loaded(), 7);
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_one_empty_probe() {
        let store = store_with(4);
        let mut loader = BatchLoader::new(&store, query(), 2);

        assert_eq!(loader.next_batch().await.unwrap().map(|b| b.len()), Some(2));
        assert_eq!(loader.next_batch().await.unwrap().map(|b| b.len()), Some(2));
        assert!(loader.next_batch().await.unwrap().is_none());
        assert!(loader.next_batch().await.unwrap().is_none());
        assert_eq!(store.query_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_store_yields_nothing() {
        let store = MemoryStore::new();
        let mut loader = BatchLoader::new(&store, query(), DEFAULT_BATCH_SIZE);
        assert!(loader.next_batch().await.unwrap().is_none());
    }
}
