//! Source records and their typed field values
//!
//! A [`Record`] is one extracted source row: an ordered list of named fields,
//! each of which may be absent (SQL `NULL`).

use std::fmt;

/// A typed value extracted from a source column
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
    Binary(Vec<u8>),
}

impl FieldValue {
    /// The external byte form written to the store.
    ///
    /// Every kind except [`FieldValue::Binary`] is written as its text form,
    /// so `Integer(1)` and `Text("1")` produce the same bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Binary(bytes) => bytes.clone(),
            other => other.to_string().into_bytes(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            // Debug keeps the fractional part of integral values: 1.0, not 1
            Self::Real(v) => write!(f, "{:?}", v),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
            Self::Binary(v) => f.write_str(&String::from_utf8_lossy(v)),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

/// One named column of a record
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// `None` when the source value was NULL
    pub value: Option<FieldValue>,
}

impl Field {
    pub fn new(name: impl Into<String>, value: Option<FieldValue>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One extracted source row
///
/// # Example
/// ```
/// use hbase_import::record::{FieldValue, Record};
///
/// let record = Record::new()
///     .with("ID", Some(FieldValue::Integer(0)))
///     .with("NAME", None);
///
/// assert_eq!(record.len(), 2);
/// assert!(record.get("NAME").unwrap().value.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Append a field, builder style
    pub fn with(mut self, name: impl Into<String>, value: Option<FieldValue>) -> Self {
        self.fields.push(Field::new(name, value));
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: Option<FieldValue>) {
        self.fields.push(Field::new(name, value));
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field by column name
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a column by name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_and_text_share_byte_form() {
        assert_eq!(
            FieldValue::Integer(1).to_bytes(),
            FieldValue::Text("1".to_string()).to_bytes()
        );
        assert_eq!(
            FieldValue::Boolean(true).to_bytes(),
            FieldValue::from("true").to_bytes()
        );
        assert_eq!(FieldValue::Real(2.5).to_bytes(), b"2.5".to_vec());
    }

    #[test]
    fn test_integral_real_keeps_fraction() {
        assert_eq!(FieldValue::Real(1.0).to_bytes(), b"1.0".to_vec());
        assert_eq!(FieldValue::Real(-3.0).to_string(), "-3.0");
        assert_ne!(
            FieldValue::Real(1.0).to_bytes(),
            FieldValue::Integer(1).to_bytes()
        );
    }

    #[test]
    fn test_binary_is_written_raw() {
        let value = FieldValue::Binary(vec![0, 159, 146, 150]);
        assert_eq!(value.to_bytes(), vec![0, 159, 146, 150]);
    }

    #[test]
    fn test_lookup_by_name() {
        let record = Record::new()
            .with("A", Some(1.into()))
            .with("B", None)
            .with("C", Some("x".into()));

        assert_eq!(record.position("C"), Some(2));
        assert_eq!(record.get("A").unwrap().value, Some(FieldValue::Integer(1)));
        assert!(record.get("B").unwrap().value.is_none());
        assert!(record.get("D").is_none());
    }
}
