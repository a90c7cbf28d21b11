//! Target store clients and table administration.
//!
//! The import core talks to the store through two traits, [`StoreClient`]
//! for batch writes and [`TableAdmin`] for table existence and creation.
//! [`MemoryStore`] implements both in-process; [`RestStore`] implements both
//! against an HBase REST gateway.

mod auth;
mod memory;
mod rest;

pub use auth::Auth;
pub use memory::MemoryStore;
pub use rest::RestStore;

use crate::error::{AdminError, WriteError};
use crate::mutation::MutationSpec;
use std::future::Future;

/// Acknowledgement of a batch the store accepted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchAck {
    /// Row mutations applied
    pub mutations: usize,
    /// Cells written across those mutations
    pub cells: usize,
}

impl BatchAck {
    pub fn for_batch(mutations: &[MutationSpec]) -> Self {
        Self {
            mutations: mutations.len(),
            cells: mutations.iter().map(|m| m.cells.len()).sum(),
        }
    }
}

/// Writes mutation batches to the target store
pub trait StoreClient: Send + Sync {
    /// Whether the store can be reached at all
    fn is_available(&self) -> impl Future<Output = bool> + Send;

    /// Apply a batch of mutations to a table in order
    ///
    /// # Errors
    /// Returns a [`WriteError`] covering the whole batch if any part of it
    /// could not be written
    fn write_batch(
        &self,
        table: &str,
        mutations: &[MutationSpec],
    ) -> impl Future<Output = Result<BatchAck, WriteError>> + Send;
}

/// Table existence check and creation
pub trait TableAdmin: Send + Sync {
    fn exists(&self, table: &str) -> impl Future<Output = Result<bool, AdminError>> + Send;

    /// Create a table with the given column families
    fn create(
        &self,
        table: &str,
        families: &[String],
    ) -> impl Future<Output = Result<(), AdminError>> + Send;
}

/// How the coordinator decides whether the store client is usable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AvailabilityPolicy {
    /// Ask the client via [`StoreClient::is_available`]
    #[default]
    Probe,
    /// Treat the client as unavailable without asking
    ForceUnavailable,
}
