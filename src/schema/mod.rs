//! Extraction schema documents
//!
//! A schema names an item selector, the fields to pull from each item, and
//! optionally how to find the next page. Schemas are authored as TOML or
//! JSON and are immutable once loaded.
//!
//! # Example
//!
//! ```no_run
//! use gleaner::schema::load_schema;
//! use std::path::Path;
//!
//! let schema = load_schema(Path::new("jobs/blog.toml")).unwrap();
//! println!("{} extracts {} fields", schema.name, schema.fields.len());
//! ```

mod loader;
mod types;

pub use loader::{load_schema, parse_schema, validate_schema, SchemaFormat};
pub use types::{ExtractionSchema, FieldSpec, PaginationSpec};
