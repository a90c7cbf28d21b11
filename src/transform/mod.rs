//! Transformer implementations for import records

mod row_transformer;

pub use row_transformer::{RowTransformer, transform};
