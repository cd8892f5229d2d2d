//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - package(name, summary, metadata, dist, extra, mtime)
//! - function(package, name, summary, metadata, dist, extra, mtime)
//! - schema_version(version)

pub mod migrate;
pub mod schema;
pub mod sqlite;

pub use migrate::{Migration, SchemaSpec, ensure_schema};
pub use sqlite::CatalogStore;
