//! In-process sorted table store
//!
//! Behaves like a small HBase: tables hold sorted rows, rows hold cells keyed
//! by (family, qualifier), and a put replaces the previous value at the same
//! coordinate. Writes to unknown tables or families are rejected.

use super::{BatchAck, StoreClient, TableAdmin};
use crate::error::{AdminError, WriteError};
use crate::mutation::MutationSpec;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cells of one row, keyed by (family, qualifier)
pub type RowCells = BTreeMap<(String, String), Vec<u8>>;

#[derive(Debug, Default)]
struct Table {
    families: BTreeSet<String>,
    rows: BTreeMap<Vec<u8>, RowCells>,
}

#[derive(Debug)]
struct Inner {
    tables: BTreeMap<String, Table>,
    available: bool,
    failing_writes: usize,
    fail_after: Option<usize>,
    successful_writes: usize,
    failing_admin: usize,
    write_calls: usize,
    mutations_submitted: usize,
    create_calls: usize,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            tables: BTreeMap::new(),
            available: true,
            failing_writes: 0,
            fail_after: None,
            successful_writes: 0,
            failing_admin: 0,
            write_calls: 0,
            mutations_submitted: 0,
            create_calls: 0,
        }
    }
}

/// Shared in-memory store; clones share the same tables and counters
///
/// # Example
/// ```
/// use hbase_import::client::{MemoryStore, StoreClient};
/// use hbase_import::mutation::{Cell, MutationSpec};
///
/// # async fn example() -> eyre::Result<()> {
/// let store = MemoryStore::new().with_table("t", &["cf"]);
///
/// let mut put = MutationSpec::new("row-1");
/// put.push(Cell::new("cf", "NAME", b"abc".to_vec()));
/// store.write_batch("t", &[put]).await?;
///
/// assert_eq!(store.cell("t", b"row-1", "cf", "NAME"), Some(b"abc".to_vec()));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pre-create a table, builder style
    pub fn with_table(self, table: &str, families: &[&str]) -> Self {
        self.lock().tables.insert(
            table.to_string(),
            Table {
                families: families.iter().map(|f| f.to_string()).collect(),
                rows: BTreeMap::new(),
            },
        );
        self
    }

    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Make the next `count` batch writes fail
    pub fn fail_next_writes(&self, count: usize) {
        self.lock().failing_writes = count;
    }

    /// Let `successes` batch writes through, then fail every later one
    pub fn fail_writes_after(&self, successes: usize) {
        let mut inner = self.lock();
        inner.fail_after = Some(inner.successful_writes + successes);
    }

    /// Make the next `count` `exists`/`create` calls fail
    pub fn fail_next_admin(&self, count: usize) {
        self.lock().failing_admin = count;
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.lock().tables.contains_key(table)
    }

    /// Number of `write_batch` calls, including failed ones
    pub fn write_calls(&self) -> usize {
        self.lock().write_calls
    }

    /// Number of mutations handed to `write_batch`, including failed ones
    pub fn mutations_submitted(&self) -> usize {
        self.lock().mutations_submitted
    }

    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    /// Read one cell
    pub fn cell(&self, table: &str, row: &[u8], family: &str, qualifier: &str) -> Option<Vec<u8>> {
        self.lock()
            .tables
            .get(table)?
            .rows
            .get(row)?
            .get(&(family.to_string(), qualifier.to_string()))
            .cloned()
    }

    /// Number of rows holding at least one cell
    pub fn row_count(&self, table: &str) -> usize {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    /// Snapshot of a table's rows in key order
    pub fn rows(&self, table: &str) -> BTreeMap<Vec<u8>, RowCells> {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }
}

impl StoreClient for MemoryStore {
    async fn is_available(&self) -> bool {
        self.lock().available
    }

    async fn write_batch(
        &self,
        table: &str,
        mutations: &[MutationSpec],
    ) -> Result<BatchAck, WriteError> {
        let mut inner = self.lock();
        inner.write_calls += 1;
        inner.mutations_submitted += mutations.len();

        if !inner.available {
            return Err(WriteError::new(table, mutations.len(), "store is unavailable"));
        }
        if inner.failing_writes > 0 {
            inner.failing_writes -= 1;
            return Err(WriteError::new(table, mutations.len(), "injected write failure"));
        }
        if inner.fail_after.is_some_and(|n| inner.successful_writes >= n) {
            return Err(WriteError::new(table, mutations.len(), "injected write failure"));
        }

        let Some(target) = inner.tables.get_mut(table) else {
            return Err(WriteError::new(table, mutations.len(), "table not found"));
        };

        // Reject the whole batch before applying any of it
        if let Some(cell) = mutations
            .iter()
            .flat_map(|m| m.cells.iter())
            .find(|c| !target.families.contains(&c.family))
        {
            return Err(WriteError::new(
                table,
                mutations.len(),
                format!("column family '{}' does not exist", cell.family),
            ));
        }

        for mutation in mutations.iter().filter(|m| !m.is_empty()) {
            let row = target.rows.entry(mutation.row_key.clone()).or_default();
            for cell in &mutation.cells {
                row.insert(
                    (cell.family.clone(), cell.qualifier.clone()),
                    cell.value.clone(),
                );
            }
        }

        inner.successful_writes += 1;
        Ok(BatchAck::for_batch(mutations))
    }
}

impl TableAdmin for MemoryStore {
    async fn exists(&self, table: &str) -> Result<bool, AdminError> {
        let mut inner = self.lock();
        if !inner.available {
            return Err(AdminError::new(table, "store is unavailable"));
        }
        if inner.failing_admin > 0 {
            inner.failing_admin -= 1;
            return Err(AdminError::new(table, "injected admin failure"));
        }
        Ok(inner.tables.contains_key(table))
    }

    async fn create(&self, table: &str, families: &[String]) -> Result<(), AdminError> {
        let mut inner = self.lock();
        inner.create_calls += 1;
        if inner.failing_admin > 0 {
            inner.failing_admin -= 1;
            return Err(AdminError::new(table, "injected admin failure"));
        }
        if inner.tables.contains_key(table) {
            return Err(AdminError::new(table, "table already exists"));
        }
        inner.tables.insert(
            table.to_string(),
            Table {
                families: families.iter().cloned().collect(),
                rows: BTreeMap::new(),
            },
        );
        Ok(())
    }
}
