//! Schema-driven extraction
//!
//! Turns HTML into [`Record`]s by applying an extraction schema, and
//! filters duplicate records within a stream.

mod dedup;
mod parser;
mod record;

pub use dedup::{DedupStrategy, Deduplicator};
pub use parser::SchemaParser;
pub use record::{Record, RecordMeta};
