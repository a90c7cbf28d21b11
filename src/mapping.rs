//! Column mapping from source columns to HBase cell coordinates

use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::record::Record;

/// The source column that supplies the row key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowKeyColumn {
    /// Zero-based column position
    Index(usize),
    /// Column name
    Name(String),
}

impl fmt::Display for RowKeyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{}", i),
            Self::Name(n) => f.write_str(n),
        }
    }
}

impl std::str::FromStr for RowKeyColumn {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<usize>() {
            Ok(i) => Self::Index(i),
            Err(_) => Self::Name(s.to_string()),
        })
    }
}

/// (family, qualifier) address of a cell within a row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellCoordinate {
    pub family: String,
    pub qualifier: String,
}

/// Maps each source column to a cell coordinate and names the row-key column
///
/// Columns without an explicit override land in the default family with the
/// column name as qualifier. When no row-key column is configured the first
/// column of each record is the key.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    default_family: String,
    overrides: HashMap<String, CellCoordinate>,
    row_key: Option<RowKeyColumn>,
    add_row_key: bool,
}

impl ColumnMapping {
    pub fn new(default_family: impl Into<String>) -> Self {
        Self {
            default_family: default_family.into(),
            overrides: HashMap::new(),
            row_key: None,
            add_row_key: false,
        }
    }

    /// Use a specific column as the row key instead of the first one
    pub fn with_row_key(mut self, column: RowKeyColumn) -> Self {
        self.row_key = Some(column);
        self
    }

    /// Also write the row-key column as a regular cell (default: false)
    pub fn with_add_row_key(mut self, add_row_key: bool) -> Self {
        self.add_row_key = add_row_key;
        self
    }

    /// Route a column to an explicit family and qualifier
    pub fn with_column(
        mut self,
        column: impl Into<String>,
        family: impl Into<String>,
        qualifier: impl Into<String>,
    ) -> Self {
        self.overrides.insert(
            column.into(),
            CellCoordinate {
                family: family.into(),
                qualifier: qualifier.into(),
            },
        );
        self
    }

    pub fn default_family(&self) -> &str {
        &self.default_family
    }

    pub fn row_key(&self) -> Option<&RowKeyColumn> {
        self.row_key.as_ref()
    }

    pub fn add_row_key(&self) -> bool {
        self.add_row_key
    }

    /// Coordinate a column's value is written to
    pub fn coordinate(&self, column: &str) -> CellCoordinate {
        self.overrides
            .get(column)
            .cloned()
            .unwrap_or_else(|| CellCoordinate {
                family: self.default_family.clone(),
                qualifier: column.to_string(),
            })
    }

    /// Every column family this mapping can write to
    pub fn families(&self) -> BTreeSet<String> {
        let mut families: BTreeSet<String> =
            self.overrides.values().map(|c| c.family.clone()).collect();
        families.insert(self.default_family.clone());
        families
    }

    /// Position of the row-key column within a record
    ///
    /// # Errors
    /// Returns an error if the record has no such column
    pub fn row_key_position(&self, record: &Record) -> Result<usize> {
        match &self.row_key {
            None if record.is_empty() => Err(eyre!("Record has no columns to derive a row key")),
            None => Ok(0),
            Some(RowKeyColumn::Index(i)) if *i < record.len() => Ok(*i),
            Some(RowKeyColumn::Index(i)) => Err(eyre!(
                "Row key column index {} is out of range for a record with {} column(s)",
                i,
                record.len()
            )),
            Some(RowKeyColumn::Name(name)) => record
                .position(name)
                .ok_or_else(|| eyre!("Row key column '{}' not found in record", name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_coordinate_uses_column_name() {
        let mapping = ColumnMapping::new("cf");
        assert_eq!(
            mapping.coordinate("PRICE"),
            CellCoordinate {
                family: "cf".to_string(),
                qualifier: "PRICE".to_string()
            }
        );
    }

    #[test]
    fn test_override_and_families() {
        let mapping = ColumnMapping::new("cf").with_column("PRICE", "money", "p");
        assert_eq!(mapping.coordinate("PRICE").family, "money");
        assert_eq!(mapping.coordinate("PRICE").qualifier, "p");
        let families: Vec<_> = mapping.families().into_iter().collect();
        assert_eq!(families, vec!["cf".to_string(), "money".to_string()]);
    }

    #[test]
    fn test_row_key_position() {
        let record = Record::new().with("A", None).with("B", None);

        assert_eq!(ColumnMapping::new("cf").row_key_position(&record).unwrap(), 0);

        let by_name = ColumnMapping::new("cf").with_row_key(RowKeyColumn::Name("B".into()));
        assert_eq!(by_name.row_key_position(&record).unwrap(), 1);

        let missing = ColumnMapping::new("cf").with_row_key(RowKeyColumn::Name("Z".into()));
        assert!(missing.row_key_position(&record).is_err());

        let out_of_range = ColumnMapping::new("cf").with_row_key(RowKeyColumn::Index(2));
        assert!(out_of_range.row_key_position(&record).is_err());

        assert!(ColumnMapping::new("cf").row_key_position(&Record::new()).is_err());
    }

    #[test]
    fn test_row_key_column_from_str() {
        assert_eq!("3".parse::<RowKeyColumn>().unwrap(), RowKeyColumn::Index(3));
        assert_eq!(
            "ID".parse::<RowKeyColumn>().unwrap(),
            RowKeyColumn::Name("ID".to_string())
        );
    }
}
