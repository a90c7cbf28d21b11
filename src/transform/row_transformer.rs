//! Record-to-mutation transformer
//!
//! Turns one source record into at most one row mutation:
//! - the row-key column supplies the row key; a null key drops the row
//! - null columns produce no cell at all, never an empty one
//! - the row-key column is only written as a cell when the mapping asks
//!   for it

use crate::etl::Transformer;
use crate::mapping::ColumnMapping;
use crate::mutation::{Cell, MutationSpec};
use crate::record::Record;
use eyre::Result;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Build the mutation for a record under a column mapping
///
/// Returns `Ok(None)` when the record's row-key value is null.
///
/// # Errors
/// Returns an error if the mapping names a row-key column the record does
/// not have
pub fn transform(record: &Record, mapping: &ColumnMapping) -> Result<Option<MutationSpec>> {
    let key_position = mapping.row_key_position(record)?;
    let fields = record.fields();

    let Some(key) = &fields[key_position].value else {
        return Ok(None);
    };

    let mut mutation = MutationSpec::new(key.to_bytes());
    for (position, field) in fields.iter().enumerate() {
        if position == key_position && !mapping.add_row_key() {
            continue;
        }
        let Some(value) = &field.value else {
            continue;
        };
        let coordinate = mapping.coordinate(&field.name);
        mutation.push(Cell::new(
            coordinate.family,
            coordinate.qualifier,
            value.to_bytes(),
        ));
    }

    Ok(Some(mutation))
}

/// [`Transformer`] from [`Record`] to an optional [`MutationSpec`]
///
/// # Example
/// ```
/// use hbase_import::etl::Transformer;
/// use hbase_import::mapping::ColumnMapping;
/// use hbase_import::record::Record;
/// use hbase_import::transform::RowTransformer;
///
/// let transformer = RowTransformer::new(ColumnMapping::new("cf"));
/// let record = Record::new()
///     .with("ID", Some(0.into()))
///     .with("QTY", Some(1.into()));
///
/// let mutation = transformer.transform(record).unwrap().unwrap();
/// assert_eq!(mutation.row_key, b"0");
/// assert_eq!(mutation.cell("cf", "QTY").unwrap().value, b"1");
/// assert!(mutation.cell("cf", "ID").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct RowTransformer {
    mapping: ColumnMapping,
}

impl RowTransformer {
    pub fn new(mapping: ColumnMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Row key bytes of a record, if it has a non-null key
    pub fn row_key(&self, record: &Record) -> Option<Vec<u8>> {
        let position = self.mapping.row_key_position(record).ok()?;
        record.fields()[position].value.as_ref().map(|v| v.to_bytes())
    }

    /// Stable shard index for a record's row key
    ///
    /// Records with the same key always land on the same shard; records
    /// without a key go to shard 0.
    pub fn shard(&self, record: &Record, shards: usize) -> usize {
        if shards <= 1 {
            return 0;
        }
        match self.row_key(record) {
            Some(key) => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                (hasher.finish() % shards as u64) as usize
            }
            None => 0,
        }
    }
}

impl Transformer for RowTransformer {
    type Input = Record;
    type Output = Option<MutationSpec>;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        transform(&input, &self.mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::RowKeyColumn;
    use crate::record::FieldValue;

    fn ints(values: &[Option<i64>]) -> Record {
        let mut record = Record::new();
        for (i, v) in values.iter().enumerate() {
            record.push(format!("DATA_COL{}", i), v.map(FieldValue::Integer));
        }
        record
    }

    #[test]
    fn test_basic_row() {
        let mapping = ColumnMapping::new("cf");
        let mutation = transform(&ints(&[Some(0), Some(1)]), &mapping)
            .unwrap()
            .unwrap();

        assert_eq!(mutation.row_key, b"0");
        assert_eq!(mutation.cells.len(), 1);
        assert_eq!(mutation.cell("cf", "DATA_COL1").unwrap().value, b"1");
    }

    #[test]
    fn test_null_column_has_no_cell() {
        let mapping = ColumnMapping::new("cf");
        let mutation = transform(&ints(&[Some(0), Some(42), None]), &mapping)
            .unwrap()
            .unwrap();

        assert_eq!(mutation.cell("cf", "DATA_COL1").unwrap().value, b"42");
        assert!(mutation.cell("cf", "DATA_COL2").is_none());
        assert!(mutation.cells.iter().all(|c| !c.value.is_empty()));
    }

    #[test]
    fn test_null_row_key_drops_row() {
        let mapping = ColumnMapping::new("cf");
        assert!(
            transform(&ints(&[None, Some(1), Some(2)]), &mapping)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_only_null_columns_yields_empty_mutation() {
        let mapping = ColumnMapping::new("cf");
        let mutation = transform(&ints(&[Some(0), None]), &mapping)
            .unwrap()
            .unwrap();
        assert!(mutation.is_empty());
    }

    #[test]
    fn test_add_row_key_writes_key_as_cell() {
        let mapping = ColumnMapping::new("cf").with_add_row_key(true);
        let mutation = transform(&ints(&[Some(0), Some(1)]), &mapping)
            .unwrap()
            .unwrap();

        assert_eq!(mutation.row_key, b"0");
        assert_eq!(mutation.cell("cf", "DATA_COL0").unwrap().value, b"0");
        assert_eq!(mutation.cell("cf", "DATA_COL1").unwrap().value, b"1");
    }

    #[test]
    fn test_configured_key_column() {
        let mapping = ColumnMapping::new("cf").with_row_key(RowKeyColumn::Name("ID".into()));
        let record = Record::new()
            .with("NAME", Some("abc".into()))
            .with("ID", Some(7.into()));

        let mutation = transform(&record, &mapping).unwrap().unwrap();
        assert_eq!(mutation.row_key, b"7");
        assert_eq!(mutation.cell("cf", "NAME").unwrap().value, b"abc");
        assert!(mutation.cell("cf", "ID").is_none());
    }

    #[test]
    fn test_missing_key_column_is_an_error() {
        let mapping = ColumnMapping::new("cf").with_row_key(RowKeyColumn::Name("ID".into()));
        assert!(transform(&ints(&[Some(0)]), &mapping).is_err());
    }

    #[test]
    fn test_integer_and_text_records_match() {
        let mapping = ColumnMapping::new("cf");
        let as_int = Record::new().with("K", Some(1.into())).with("V", Some(2.into()));
        let as_text = Record::new()
            .with("K", Some("1".into()))
            .with("V", Some("2".into()));

        assert_eq!(
            transform(&as_int, &mapping).unwrap(),
            transform(&as_text, &mapping).unwrap()
        );
    }

    #[test]
    fn test_transform_many_keeps_order() {
        let transformer = RowTransformer::new(ColumnMapping::new("cf"));
        let out = transformer
            .transform_many(vec![ints(&[Some(2), Some(1)]), ints(&[None]), ints(&[Some(1)])])
            .unwrap();

        let keys: Vec<_> = out.iter().map(|m| m.as_ref().map(|m| m.row_key.clone())).collect();
        assert_eq!(keys, vec![Some(b"2".to_vec()), None, Some(b"1".to_vec())]);
    }

    #[test]
    fn test_shard_is_stable_per_key() {
        let transformer = RowTransformer::new(ColumnMapping::new("cf"));
        let a = ints(&[Some(12), Some(1)]);
        let b = ints(&[Some(12), Some(2)]);

        assert_eq!(transformer.shard(&a, 8), transformer.shard(&b, 8));
        assert!(transformer.shard(&a, 8) < 8);
        assert_eq!(transformer.shard(&ints(&[None]), 8), 0);
        assert_eq!(transformer.shard(&a, 1), 0);
    }
}
