//! Core ETL (Extract, Transform, Load) abstractions
//!
//! This module provides the trait definitions and the single-worker pipeline
//! that pulls records from a source, transforms them into mutations and
//! writes them to the store in batches.

mod extract;
mod load;
mod pipeline;
mod transform;

pub use extract::{ChannelExtractor, Extractor, VecExtractor};
pub use load::{Ack, MutationWriter, WriterStats};
pub use pipeline::{ImportReport, Pipeline};
pub use transform::Transformer;
