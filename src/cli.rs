//! CLI helper functions

use crate::{
    client::{Auth, AvailabilityPolicy, RestStore, StoreClient, TableAdmin},
    config::JobConfig,
    coordinator::{CancelHandle, ImportCoordinator, Prerequisites},
    error::ImportError,
    etl::ImportReport,
    mapping::RowKeyColumn,
    storage::NdjsonRecordReader,
};
use eyre::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Load the HBase REST client from environment variables
///
/// Expected environment variables:
/// - HBASE_REST_URL: REST gateway base URL (required)
/// - HBASE_USERNAME: Username for basic auth (optional)
/// - HBASE_PASSWORD: Password for basic auth (optional)
pub fn load_rest_store() -> Result<RestStore> {
    let url_str =
        std::env::var("HBASE_REST_URL").context("HBASE_REST_URL environment variable not set")?;
    let url =
        Url::parse(&url_str).with_context(|| format!("Invalid HBASE_REST_URL: {}", url_str))?;

    let auth = Auth::new(
        std::env::var("HBASE_USERNAME").ok(),
        std::env::var("HBASE_PASSWORD").ok(),
    );

    RestStore::try_new(url, auth).context("Failed to create HBase REST client")
}

/// Command-line overrides applied on top of a job file
#[derive(Debug, Clone, Default)]
pub struct JobOverrides {
    pub table: Option<String>,
    pub column_family: Option<String>,
    pub create_table: bool,
    pub add_row_key: bool,
    pub row_key: Option<RowKeyColumn>,
    pub batch_size: Option<usize>,
    pub workers: Option<usize>,
}

impl JobOverrides {
    /// Apply the overrides; boolean flags can only switch a setting on
    pub fn apply(&self, config: &mut JobConfig) {
        if let Some(table) = &self.table {
            config.table = table.clone();
        }
        if let Some(family) = &self.column_family {
            config.column_family = family.clone();
        }
        config.create_table |= self.create_table;
        config.add_row_key |= self.add_row_key;
        if let Some(row_key) = &self.row_key {
            config.row_key = Some(row_key.clone());
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
    }
}

/// Read a job file, apply overrides and validate the result
pub fn load_job(path: impl AsRef<Path>, overrides: &JobOverrides) -> Result<JobConfig> {
    let mut config = JobConfig::read(path.as_ref())?;
    overrides.apply(&mut config);
    config
        .validate()
        .with_context(|| format!("Invalid job: {}", path.as_ref().display()))?;
    Ok(config)
}

/// Import an NDJSON record file
///
/// Pipeline: NdjsonRecordReader → RowTransformer → MutationWriter → store
///
/// `on_start` receives the job's cancel handle before any record is read.
pub async fn import_file<C>(
    config: JobConfig,
    store: Arc<C>,
    records: impl AsRef<Path>,
    availability: AvailabilityPolicy,
    on_start: impl FnOnce(CancelHandle),
) -> Result<ImportReport>
where
    C: StoreClient + TableAdmin + 'static,
{
    let source = NdjsonRecordReader::open(records, config.columns.clone()).await?;

    let mut coordinator = ImportCoordinator::new(config, store).with_availability(availability);
    on_start(coordinator.cancel_handle());

    let report = coordinator.run(source).await?;
    Ok(report)
}

/// Probe the client and table without changing anything
pub async fn check_prerequisites<C>(
    config: JobConfig,
    store: Arc<C>,
    availability: AvailabilityPolicy,
) -> Result<Prerequisites>
where
    C: StoreClient + TableAdmin + 'static,
{
    let coordinator = ImportCoordinator::new(config, store).with_availability(availability);
    Ok(coordinator.check().await?)
}

/// Create the job's table if it does not exist
///
/// Returns true if the table was created
pub async fn create_table<C>(
    config: &JobConfig,
    store: &C,
    availability: AvailabilityPolicy,
) -> Result<bool>
where
    C: StoreClient + TableAdmin,
{
    let available = match availability {
        AvailabilityPolicy::Probe => store.is_available().await,
        AvailabilityPolicy::ForceUnavailable => false,
    };
    if !available {
        return Err(ImportError::ClientUnavailable {
            reason: "cannot create table without a store client".to_string(),
        }
        .into());
    }

    if store.exists(&config.table).await? {
        log::info!("Table '{}' already exists", config.table);
        return Ok(false);
    }

    let families: Vec<String> = config.mapping().families().into_iter().collect();
    store.create(&config.table, &families).await?;
    log::info!("✓ Created table '{}'", config.table);

    Ok(true)
}
