//! Import job configuration
//!
//! Jobs are described in a YAML file:
//! ```yaml
//! table: inventory
//! column_family: cf
//! create_table: true
//! add_row_key: false
//! row_key: ID
//! columns: [ID, NAME, PRICE]
//! column_map:
//!   PRICE:
//!     family: money
//! batch_size: 500
//! flush_interval_ms: 1000
//! workers: 4
//! ```

use eyre::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use crate::mapping::{ColumnMapping, RowKeyColumn};

static TABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_][A-Za-z0-9_.-]*:)?[A-Za-z0-9_][A-Za-z0-9_.-]*$")
        .expect("table name pattern is valid")
});

fn default_batch_size() -> usize {
    100
}

fn default_flush_interval_ms() -> u64 {
    1000
}

fn default_workers() -> usize {
    1
}

/// Per-column override of the cell coordinate
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ColumnTarget {
    /// Column family (defaults to the job's `column_family`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    /// Qualifier (defaults to the column name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

/// Configuration of one import job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobConfig {
    /// Target HBase table, optionally `namespace:table`
    pub table: String,
    /// Column family for every column without an override
    pub column_family: String,
    /// Create the table when it does not exist
    #[serde(default)]
    pub create_table: bool,
    /// Also write the row-key column as a cell
    #[serde(default)]
    pub add_row_key: bool,
    /// Row-key column by name or index; the first column when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_key: Option<RowKeyColumn>,
    /// Ordered source column names, required for array-shaped records
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub column_map: BTreeMap<String, ColumnTarget>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl JobConfig {
    pub fn new(table: impl Into<String>, column_family: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column_family: column_family.into(),
            create_table: false,
            add_row_key: false,
            row_key: None,
            columns: Vec::new(),
            column_map: BTreeMap::new(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            workers: default_workers(),
        }
    }

    pub fn with_create_table(mut self, create_table: bool) -> Self {
        self.create_table = create_table;
        self
    }

    pub fn with_add_row_key(mut self, add_row_key: bool) -> Self {
        self.add_row_key = add_row_key;
        self
    }

    pub fn with_row_key(mut self, row_key: RowKeyColumn) -> Self {
        self.row_key = Some(row_key);
        self
    }

    pub fn with_columns(mut self, columns: Vec<&str>) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Build the column mapping this job writes with
    pub fn mapping(&self) -> ColumnMapping {
        let mut mapping =
            ColumnMapping::new(&self.column_family).with_add_row_key(self.add_row_key);
        if let Some(row_key) = &self.row_key {
            mapping = mapping.with_row_key(row_key.clone());
        }
        for (column, target) in &self.column_map {
            let family = target.family.as_deref().unwrap_or(&self.column_family);
            let qualifier = target.qualifier.as_deref().unwrap_or(column);
            mapping = mapping.with_column(column, family, qualifier);
        }
        mapping
    }

    /// Check the configuration for values HBase or the pipeline would reject
    pub fn validate(&self) -> Result<()> {
        if !TABLE_NAME.is_match(&self.table) {
            bail!("Invalid table name: '{}'", self.table);
        }
        validate_family(&self.column_family)?;
        for (column, target) in &self.column_map {
            if let Some(family) = &target.family {
                validate_family(family)
                    .with_context(|| format!("Invalid mapping for column '{}'", column))?;
            }
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        Ok(())
    }

    /// Read a job from a YAML file and validate it
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read job file: {}", path.as_ref().display())
        })?;

        let config: Self =
            serde_yaml::from_str(&content).with_context(|| "Failed to parse job file YAML")?;
        config.validate()?;

        Ok(config)
    }

    /// Write the job to a YAML file
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml =
            serde_yaml::to_string(self).with_context(|| "Failed to serialize job to YAML")?;

        std::fs::write(path.as_ref(), yaml).with_context(|| {
            format!("Failed to write job file: {}", path.as_ref().display())
        })?;

        Ok(())
    }
}

fn validate_family(family: &str) -> Result<()> {
    if family.is_empty() || family.contains(':') || family.starts_with('.') {
        bail!("Invalid column family: '{}'", family);
    }
    if family.chars().any(|c| c.is_control()) {
        bail!("Column family contains control characters: '{}'", family);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_minimal_yaml() {
        let config: JobConfig = serde_yaml::from_str("table: t\ncolumn_family: cf\n").unwrap();
        assert!(!config.create_table);
        assert!(!config.add_row_key);
        assert!(config.row_key.is_none());
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.flush_interval(), Duration::from_millis(1000));
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn test_row_key_by_name_or_index() {
        let by_name: JobConfig =
            serde_yaml::from_str("table: t\ncolumn_family: cf\nrow_key: ID\n").unwrap();
        assert_eq!(by_name.row_key, Some(RowKeyColumn::Name("ID".to_string())));

        let by_index: JobConfig =
            serde_yaml::from_str("table: t\ncolumn_family: cf\nrow_key: 2\n").unwrap();
        assert_eq!(by_index.row_key, Some(RowKeyColumn::Index(2)));
    }

    #[test]
    fn test_validate() {
        assert!(JobConfig::new("inventory", "cf").validate().is_ok());
        assert!(JobConfig::new("ns:inventory", "cf").validate().is_ok());
        assert!(JobConfig::new("bad table", "cf").validate().is_err());
        assert!(JobConfig::new("t", "a:b").validate().is_err());
        assert!(JobConfig::new("t", "").validate().is_err());
        assert!(JobConfig::new("t", "cf").with_batch_size(0).validate().is_err());
        assert!(JobConfig::new("t", "cf").with_workers(0).validate().is_err());
    }

    #[test]
    fn test_mapping_applies_overrides() {
        let mut config = JobConfig::new("t", "cf").with_add_row_key(true);
        config.column_map.insert(
            "PRICE".to_string(),
            ColumnTarget {
                family: Some("money".to_string()),
                qualifier: None,
            },
        );

        let mapping = config.mapping();
        assert!(mapping.add_row_key());
        assert_eq!(mapping.coordinate("PRICE").family, "money");
        assert_eq!(mapping.coordinate("PRICE").qualifier, "PRICE");
        assert_eq!(mapping.coordinate("NAME").family, "cf");
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("jobs/job.yml");
        let config = JobConfig::new("t", "cf")
            .with_create_table(true)
            .with_columns(vec!["ID", "NAME"]);

        config.write(&path).unwrap();
        assert_eq!(JobConfig::read(&path).unwrap(), config);
    }
}
