//! Single-worker import pipeline: pull, transform, batch, flush

use super::{Extractor, MutationWriter, Transformer};
use crate::client::StoreClient;
use crate::error::ImportError;
use crate::mutation::MutationSpec;
use crate::record::Record;
use std::sync::Arc;
use tokio::sync::watch;

/// Counters for one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Records pulled from the source
    pub rows_read: usize,
    /// Row mutations the store acknowledged
    pub rows_written: usize,
    /// Records that produced nothing to write
    pub rows_skipped: usize,
    pub cells_written: usize,
    pub batches_flushed: usize,
}

impl ImportReport {
    /// Add another worker's counters to this one
    pub fn absorb(&mut self, other: ImportReport) {
        self.rows_read += other.rows_read;
        self.rows_written += other.rows_written;
        self.rows_skipped += other.rows_skipped;
        self.cells_written += other.cells_written;
        self.batches_flushed += other.batches_flushed;
    }
}

enum Step {
    Record(Record),
    FlushDue,
    Cancelled,
    End,
}

/// Import pipeline for one shard of the record stream
///
/// # Type Parameters
/// - `E`: record source
/// - `T`: record-to-mutation transformer
/// - `C`: store client the writer flushes to
///
/// # Example
/// ```no_run
/// use hbase_import::client::MemoryStore;
/// use hbase_import::etl::{MutationWriter, Pipeline, VecExtractor};
/// use hbase_import::mapping::ColumnMapping;
/// use hbase_import::record::Record;
/// use hbase_import::transform::RowTransformer;
/// use std::sync::Arc;
///
/// # async fn example() -> eyre::Result<()> {
/// let store = Arc::new(MemoryStore::new().with_table("t", &["cf"]));
/// let records = vec![Record::new().with("A", Some(0.into())).with("B", Some(1.into()))];
///
/// let pipeline = Pipeline::new(
///     VecExtractor::new(records),
///     Arc::new(RowTransformer::new(ColumnMapping::new("cf"))),
///     MutationWriter::new(store, "t"),
/// );
///
/// let report = pipeline.run().await?;
/// println!("Wrote {} rows", report.rows_written);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<E, T, C> {
    extractor: E,
    transformer: Arc<T>,
    writer: MutationWriter<C>,
    cancel: Option<watch::Receiver<bool>>,
}

impl<E, T, C> Pipeline<E, T, C>
where
    E: Extractor<Item = Record>,
    T: Transformer<Input = Record, Output = Option<MutationSpec>>,
    C: StoreClient,
{
    pub fn new(extractor: E, transformer: Arc<T>, writer: MutationWriter<C>) -> Self {
        Self {
            extractor,
            transformer,
            writer,
            cancel: None,
        }
    }

    /// Stop pulling records once the watched flag turns true
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    async fn next_step(&mut self) -> eyre::Result<Step> {
        let deadline = self.writer.deadline();

        tokio::select! {
            biased;
            _ = wait_cancelled(&mut self.cancel) => Ok(Step::Cancelled),
            _ = sleep_until(deadline), if deadline.is_some() => Ok(Step::FlushDue),
            item = self.extractor.extract_next() => Ok(match item? {
                Some(record) => Step::Record(record),
                None => Step::End,
            }),
        }
    }

    /// Run until the source is exhausted
    ///
    /// A buffered batch is flushed as soon as it becomes due, even while the
    /// source is idle, so `E::extract_next` must be cancel safe.
    ///
    /// # Errors
    /// - [`ImportError::Write`] when a batch flush fails
    /// - [`ImportError::Source`] / [`ImportError::Transform`] for bad input
    /// - [`ImportError::Cancelled`] when cancellation was requested; buffered
    ///   mutations are dropped, not written
    pub async fn run(mut self) -> Result<ImportReport, ImportError> {
        let mut report = ImportReport::default();

        loop {
            let step = self
                .next_step()
                .await
                .map_err(ImportError::source_error)?;

            let record = match step {
                Step::Record(record) => record,
                Step::FlushDue => {
                    self.writer.flush().await?;
                    continue;
                }
                Step::Cancelled => {
                    let dropped = self.writer.discard();
                    if dropped > 0 {
                        log::warn!("Cancelled with {} unflushed mutation(s) dropped", dropped);
                    }
                    return Err(ImportError::Cancelled);
                }
                Step::End => break,
            };

            report.rows_read += 1;

            match self
                .transformer
                .transform(record)
                .map_err(ImportError::transform_error)?
            {
                Some(mutation) if mutation.is_empty() => {
                    log::debug!(
                        "Skipping row '{}': no columns to insert",
                        String::from_utf8_lossy(&mutation.row_key)
                    );
                    report.rows_skipped += 1;
                }
                Some(mutation) => {
                    self.writer.submit(mutation).await?;
                }
                None => {
                    log::debug!("Skipping row {}: row key is null", report.rows_read);
                    report.rows_skipped += 1;
                }
            }
        }

        let stats = self.writer.finish().await?;
        report.rows_written = stats.mutations;
        report.cells_written = stats.cells;
        report.batches_flushed = stats.batches;

        Ok(report)
    }
}

async fn wait_cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx) = cancel {
        if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryStore;
    use crate::etl::{ChannelExtractor, VecExtractor};
    use crate::mapping::ColumnMapping;
    use crate::record::FieldValue;
    use crate::transform::RowTransformer;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn row(key: Option<i64>, value: Option<i64>) -> Record {
        Record::new()
            .with("A", key.map(FieldValue::Integer))
            .with("B", value.map(FieldValue::Integer))
    }

    fn transformer() -> Arc<RowTransformer> {
        Arc::new(RowTransformer::new(ColumnMapping::new("cf")))
    }

    #[tokio::test]
    async fn test_pipeline_counts() {
        let store = Arc::new(MemoryStore::new().with_table("t", &["cf"]));
        let records = vec![
            row(Some(0), Some(1)),
            row(None, Some(2)),
            row(Some(3), None),
            row(Some(4), Some(5)),
        ];

        let pipeline = Pipeline::new(
            VecExtractor::new(records),
            transformer(),
            MutationWriter::new(store.clone(), "t").with_batch_size(1),
        );

        let report = pipeline.run().await.unwrap();
        assert_eq!(
            report,
            ImportReport {
                rows_read: 4,
                rows_written: 2,
                rows_skipped: 2,
                cells_written: 2,
                batches_flushed: 2,
            }
        );
        assert_eq!(store.row_count("t"), 2);
    }

    #[tokio::test]
    async fn test_write_error_stops_pipeline() {
        let store = Arc::new(MemoryStore::new().with_table("t", &["cf"]));
        store.fail_next_writes(1);

        let pipeline = Pipeline::new(
            VecExtractor::new(vec![row(Some(0), Some(1)), row(Some(1), Some(1))]),
            transformer(),
            MutationWriter::new(store.clone(), "t").with_batch_size(1),
        );

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, ImportError::Write(_)));
        assert_eq!(store.write_calls(), 1);
    }

    #[tokio::test]
    async fn test_due_batch_flushes_while_source_idle() {
        let store = Arc::new(MemoryStore::new().with_table("t", &["cf"]));
        let (tx, rx) = mpsc::channel(4);

        let pipeline = Pipeline::new(
            ChannelExtractor::new(rx),
            transformer(),
            MutationWriter::new(store.clone(), "t")
                .with_batch_size(100)
                .with_flush_interval(Duration::from_millis(10)),
        );
        let handle = tokio::spawn(pipeline.run());

        tx.send(row(Some(0), Some(1))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.row_count("t"), 1);

        drop(tx);
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.rows_written, 1);
        assert_eq!(report.batches_flushed, 1);
    }

    #[tokio::test]
    async fn test_cancellation_drops_buffer() {
        let store = Arc::new(MemoryStore::new().with_table("t", &["cf"]));
        let (tx, rx) = mpsc::channel(4);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let pipeline = Pipeline::new(
            ChannelExtractor::new(rx),
            transformer(),
            MutationWriter::new(store.clone(), "t").with_batch_size(100),
        )
        .with_cancellation(cancel_rx);
        let handle = tokio::spawn(pipeline.run());

        tx.send(row(Some(0), Some(1))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel_tx.send_replace(true);

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ImportError::Cancelled));
        assert_eq!(store.write_calls(), 0);
    }
}
