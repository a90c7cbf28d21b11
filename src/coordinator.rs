//! Import job orchestration
//!
//! [`ImportCoordinator`] checks prerequisites, then fans records out to
//! worker pipelines and escalates the first unrecoverable error to a job
//! failure.
//!
//! ```text
//! Init -> CheckPrereqs -> Running -> Completed
//!              |             |
//!              +-------------+-----> Failed
//! ```

use crate::client::{AvailabilityPolicy, StoreClient, TableAdmin};
use crate::config::JobConfig;
use crate::error::ImportError;
use crate::etl::{ChannelExtractor, Extractor, ImportReport, MutationWriter, Pipeline};
use crate::record::Record;
use crate::transform::RowTransformer;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

/// Lifecycle state of an import job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Init,
    CheckPrereqs,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::CheckPrereqs => "CHECK_PREREQS",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Result of the prerequisite probes, without side effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prerequisites {
    pub client_available: bool,
    pub table_exists: bool,
}

/// Requests cooperative cancellation of a running job
#[derive(Clone, Debug)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }
}

/// Drives one import job from prerequisite checks to completion
///
/// # Example
/// ```no_run
/// use hbase_import::client::MemoryStore;
/// use hbase_import::config::JobConfig;
/// use hbase_import::coordinator::ImportCoordinator;
/// use hbase_import::etl::VecExtractor;
/// use hbase_import::record::Record;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), hbase_import::ImportError> {
/// let store = Arc::new(MemoryStore::new());
/// let config = JobConfig::new("inventory", "cf").with_create_table(true);
///
/// let mut coordinator = ImportCoordinator::new(config, store);
/// let records = vec![Record::new().with("ID", Some(0.into())).with("QTY", Some(1.into()))];
///
/// let report = coordinator.run(VecExtractor::new(records)).await?;
/// println!("Wrote {} rows", report.rows_written);
/// # Ok(())
/// # }
/// ```
pub struct ImportCoordinator<C> {
    config: JobConfig,
    store: Arc<C>,
    availability: AvailabilityPolicy,
    state: JobState,
    cancel: Arc<watch::Sender<bool>>,
}

impl<C> ImportCoordinator<C>
where
    C: StoreClient + TableAdmin + 'static,
{
    pub fn new(config: JobConfig, store: Arc<C>) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            config,
            store,
            availability: AvailabilityPolicy::default(),
            state: JobState::Init,
            cancel: Arc::new(cancel),
        }
    }

    /// Override how client availability is decided
    pub fn with_availability(mut self, availability: AvailabilityPolicy) -> Self {
        self.availability = availability;
        self
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(self.cancel.clone())
    }

    fn transition(&mut self, next: JobState) {
        log::debug!("Import of '{}': {} -> {}", self.config.table, self.state, next);
        self.state = next;
    }

    fn fail(&mut self, error: ImportError) -> Result<ImportReport, ImportError> {
        self.transition(JobState::Failed);
        log::error!("Import into '{}' failed: {}", self.config.table, error);
        Err(error)
    }

    async fn client_available(&self) -> bool {
        match self.availability {
            AvailabilityPolicy::Probe => self.store.is_available().await,
            AvailabilityPolicy::ForceUnavailable => false,
        }
    }

    /// Probe the client and the table without creating anything
    pub async fn check(&self) -> Result<Prerequisites, ImportError> {
        if !self.client_available().await {
            return Ok(Prerequisites {
                client_available: false,
                table_exists: false,
            });
        }

        Ok(Prerequisites {
            client_available: true,
            table_exists: self.store.exists(&self.config.table).await?,
        })
    }

    /// Make sure the job can write, creating the table if allowed
    async fn ensure_prerequisites(&self) -> Result<(), ImportError> {
        let table = &self.config.table;
        let status = self.check().await?;

        if !status.client_available {
            return Err(ImportError::ClientUnavailable {
                reason: match self.availability {
                    AvailabilityPolicy::ForceUnavailable => "forced unavailable".to_string(),
                    AvailabilityPolicy::Probe => "store did not respond".to_string(),
                },
            });
        }

        if status.table_exists {
            log::info!("Table '{}' exists", table);
            return Ok(());
        }

        if !self.config.create_table {
            return Err(ImportError::MissingTable {
                table: table.clone(),
            });
        }

        let families: Vec<String> = self.config.mapping().families().into_iter().collect();
        log::info!(
            "Creating table '{}' with column families {}",
            table,
            families.join(", ")
        );
        self.store.create(table, &families).await?;

        Ok(())
    }

    /// Run the whole job over a record source
    ///
    /// Returns the combined report when every record was written or skipped.
    ///
    /// # Errors
    /// - [`ImportError::ClientUnavailable`] / [`ImportError::MissingTable`]
    ///   before any record is read
    /// - [`ImportError::Write`] when a batch flush fails; batches already
    ///   flushed stay in the table
    /// - [`ImportError::Cancelled`] after [`CancelHandle::cancel`]
    pub async fn run<E>(&mut self, source: E) -> Result<ImportReport, ImportError>
    where
        E: Extractor<Item = Record>,
    {
        if self.state != JobState::Init {
            return Err(ImportError::AlreadyRun);
        }

        self.transition(JobState::CheckPrereqs);
        if let Err(e) = self.ensure_prerequisites().await {
            return self.fail(e);
        }

        self.transition(JobState::Running);
        match self.execute(source).await {
            Ok(report) => {
                self.transition(JobState::Completed);
                log::info!(
                    "Imported {} row(s) into '{}' ({} read, {} skipped, {} cell(s), {} batch(es))",
                    report.rows_written,
                    self.config.table,
                    report.rows_read,
                    report.rows_skipped,
                    report.cells_written,
                    report.batches_flushed
                );
                Ok(report)
            }
            Err(e) => self.fail(e),
        }
    }

    async fn execute<E>(&self, mut source: E) -> Result<ImportReport, ImportError>
    where
        E: Extractor<Item = Record>,
    {
        let workers = self.config.workers.max(1);
        let transformer = Arc::new(RowTransformer::new(self.config.mapping()));

        let mut senders = Vec::with_capacity(workers);
        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            let (tx, rx) = mpsc::channel(self.config.batch_size.max(1));
            senders.push(tx);

            let writer = MutationWriter::new(self.store.clone(), &self.config.table)
                .with_batch_size(self.config.batch_size)
                .with_flush_interval(self.config.flush_interval());
            let pipeline = Pipeline::new(ChannelExtractor::new(rx), transformer.clone(), writer)
                .with_cancellation(self.cancel.subscribe());
            let cancel = self.cancel.clone();

            tasks.spawn(async move {
                let result = pipeline.run().await;
                if result.is_err() {
                    cancel.send_replace(true);
                }
                (worker, result)
            });
        }
        log::debug!("Started {} import worker(s)", workers);

        let mut failure = None;
        let mut cancelled = self.cancel.subscribe();
        loop {
            if *cancelled.borrow_and_update() {
                break;
            }

            let next = tokio::select! {
                biased;
                _ = cancelled.changed() => continue,
                next = source.extract_next() => next,
            };

            match next {
                Ok(Some(record)) => {
                    let shard = transformer.shard(&record, workers);
                    if senders[shard].send(record).await.is_err() {
                        // Worker has stopped; its result explains why
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    failure = Some(ImportError::source_error(e));
                    self.cancel.send_replace(true);
                    break;
                }
            }
        }
        drop(senders);

        let mut report = ImportReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(worker_report))) => report.absorb(worker_report),
                Ok((worker, Err(ImportError::Cancelled))) => {
                    log::debug!("Worker {} stopped after cancellation", worker);
                }
                Ok((worker, Err(e))) => {
                    log::debug!("Worker {} failed: {}", worker, e);
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    failure.get_or_insert(ImportError::Worker(e.to_string()));
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }
        if *self.cancel.borrow() {
            return Err(ImportError::Cancelled);
        }

        Ok(report)
    }
}
