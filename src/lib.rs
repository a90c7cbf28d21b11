//! HBase Import
//!
//! Bulk import of relational rows into HBase tables: records are turned into
//! row mutations, batched, and written through a store client.

pub mod cli;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod etl;
pub mod mapping;
pub mod mutation;
pub mod record;
pub mod storage;
pub mod transform;

// Re-exports for convenience
pub use client::{AvailabilityPolicy, MemoryStore, RestStore, StoreClient, TableAdmin};
pub use config::JobConfig;
pub use coordinator::{ImportCoordinator, JobState};
pub use error::{AdminError, ImportError, WriteError};
pub use etl::{Extractor, ImportReport, MutationWriter, Pipeline, Transformer};
pub use mapping::ColumnMapping;
pub use mutation::{Cell, MutationSpec};
pub use record::{FieldValue, Record};
pub use transform::RowTransformer;
