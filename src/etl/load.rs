//! Batching mutation writer

use crate::client::{BatchAck, StoreClient};
use crate::error::WriteError;
use crate::mutation::MutationSpec;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of submitting one mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Held in the buffer; `pending` mutations are waiting for the next flush
    Buffered { pending: usize },
    /// Submission filled the batch (or it was due) and the batch was written
    Flushed(BatchAck),
}

/// Totals of what a writer has flushed successfully
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub mutations: usize,
    pub cells: usize,
    pub batches: usize,
}

/// Buffers mutations and writes them to the store in batches
///
/// A batch is flushed once it holds `batch_size` mutations, or on the first
/// submission after its oldest mutation has waited `flush_interval`. When a
/// flush fails, every mutation in that batch fails with the same
/// [`WriteError`] and the buffer is emptied.
///
/// # Example
/// ```
/// use hbase_import::client::MemoryStore;
/// use hbase_import::etl::{Ack, MutationWriter};
/// use hbase_import::mutation::{Cell, MutationSpec};
/// use std::sync::Arc;
///
/// # async fn example() -> eyre::Result<()> {
/// let store = Arc::new(MemoryStore::new().with_table("t", &["cf"]));
/// let mut writer = MutationWriter::new(store.clone(), "t").with_batch_size(2);
///
/// let mut put = MutationSpec::new("0");
/// put.push(Cell::new("cf", "B", b"1".to_vec()));
///
/// assert!(matches!(writer.submit(put.clone()).await?, Ack::Buffered { pending: 1 }));
/// assert!(matches!(writer.submit(put).await?, Ack::Flushed(_)));
/// # Ok(())
/// # }
/// ```
pub struct MutationWriter<C> {
    client: Arc<C>,
    table: String,
    batch_size: usize,
    flush_interval: Duration,
    buffer: Vec<MutationSpec>,
    oldest: Option<Instant>,
    stats: WriterStats,
}

impl<C: StoreClient> MutationWriter<C> {
    pub fn new(client: Arc<C>, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            batch_size: 100,
            flush_interval: Duration::from_secs(1),
            buffer: Vec::new(),
            oldest: None,
            stats: WriterStats::default(),
        }
    }

    /// Maximum mutations per batch (at least 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Maximum time a buffered mutation waits before its batch is due
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    /// When the buffered batch becomes due, if anything is buffered
    pub fn deadline(&self) -> Option<Instant> {
        self.oldest.map(|t| t + self.flush_interval)
    }

    fn is_due(&self) -> bool {
        self.deadline().is_some_and(|d| Instant::now() >= d)
    }

    /// Add a mutation to the current batch, flushing when it is full or due
    ///
    /// # Errors
    /// Returns the batch's [`WriteError`] if this submission triggered a
    /// flush that failed
    pub async fn submit(&mut self, mutation: MutationSpec) -> Result<Ack, WriteError> {
        if self.buffer.is_empty() {
            self.oldest = Some(Instant::now());
        }
        self.buffer.push(mutation);

        if self.buffer.len() >= self.batch_size || self.is_due() {
            return self.flush().await.map(Ack::Flushed);
        }

        Ok(Ack::Buffered {
            pending: self.buffer.len(),
        })
    }

    /// Write the buffered batch now
    pub async fn flush(&mut self) -> Result<BatchAck, WriteError> {
        if self.buffer.is_empty() {
            return Ok(BatchAck::default());
        }

        let batch = std::mem::take(&mut self.buffer);
        self.oldest = None;

        log::debug!(
            "Flushing {} mutation(s) to table '{}'",
            batch.len(),
            self.table
        );

        let ack = self.client.write_batch(&self.table, &batch).await?;
        self.stats.mutations += ack.mutations;
        self.stats.cells += ack.cells;
        self.stats.batches += 1;

        Ok(ack)
    }

    /// Drop the buffered batch without writing it; returns how many
    /// mutations were dropped
    pub fn discard(&mut self) -> usize {
        self.oldest = None;
        std::mem::take(&mut self.buffer).len()
    }

    /// Flush whatever is left and return the totals
    pub async fn finish(mut self) -> Result<WriterStats, WriteError> {
        self.flush().await?;
        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryStore;
    use crate::mutation::Cell;

    fn put(row: &str, value: &str) -> MutationSpec {
        let mut m = MutationSpec::new(row);
        m.push(Cell::new("cf", "B", value.as_bytes().to_vec()));
        m
    }

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new().with_table("t", &["cf"]))
    }

    #[tokio::test]
    async fn test_flushes_when_batch_is_full() {
        let store = store();
        let mut writer = MutationWriter::new(store.clone(), "t").with_batch_size(3);

        writer.submit(put("0", "a")).await.unwrap();
        writer.submit(put("1", "b")).await.unwrap();
        assert_eq!(store.write_calls(), 0);

        let ack = writer.submit(put("2", "c")).await.unwrap();
        assert_eq!(
            ack,
            Ack::Flushed(BatchAck {
                mutations: 3,
                cells: 3
            })
        );
        assert_eq!(store.write_calls(), 1);
        assert_eq!(writer.pending(), 0);
    }

    #[tokio::test]
    async fn test_flushes_when_interval_elapsed() {
        let store = store();
        let mut writer = MutationWriter::new(store.clone(), "t")
            .with_batch_size(100)
            .with_flush_interval(Duration::ZERO);

        let ack = writer.submit(put("0", "a")).await.unwrap();
        assert!(matches!(ack, Ack::Flushed(_)));
        assert_eq!(store.row_count("t"), 1);
    }

    #[tokio::test]
    async fn test_failed_flush_fails_whole_batch() {
        let store = store();
        store.fail_next_writes(1);
        let mut writer = MutationWriter::new(store.clone(), "t").with_batch_size(2);

        writer.submit(put("0", "a")).await.unwrap();
        let err = writer.submit(put("1", "b")).await.unwrap_err();

        assert_eq!(err.mutations, 2);
        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.stats(), WriterStats::default());
        assert_eq!(store.row_count("t"), 0);
    }

    #[tokio::test]
    async fn test_finish_flushes_remainder() {
        let store = store();
        let mut writer = MutationWriter::new(store.clone(), "t").with_batch_size(2);

        for row in ["0", "1", "2"] {
            writer.submit(put(row, "x")).await.unwrap();
        }
        let stats = writer.finish().await.unwrap();

        assert_eq!(stats.mutations, 3);
        assert_eq!(stats.batches, 2);
        assert_eq!(store.row_count("t"), 3);
    }

    #[tokio::test]
    async fn test_discard_drops_pending() {
        let store = store();
        let mut writer = MutationWriter::new(store.clone(), "t").with_batch_size(10);

        writer.submit(put("0", "a")).await.unwrap();
        assert!(writer.deadline().is_some());
        assert_eq!(writer.discard(), 1);
        assert!(writer.deadline().is_none());

        writer.finish().await.unwrap();
        assert_eq!(store.write_calls(), 0);
    }
}
