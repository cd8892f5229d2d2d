//! # Pkgdex - Package & Function Metadata Catalog
//!
//! Records structured metadata about packages and the functions they expose,
//! kept in sync with a live set of introspectable code units.
//!
//! Pkgdex provides:
//! - A versioned SQLite schema with a data-driven upgrade ladder
//! - An entity store for packages, functions and derived arguments
//! - Incremental, scoped synchronization against a metadata provider
//! - Read-only listings and aggregate statistics

pub mod catalog;
pub mod config;
pub mod entity;
pub mod metadata;
pub mod output;
pub mod provider;
pub mod query;
pub mod response;
pub mod selector;
pub mod storage;
pub mod sync;
pub mod ui;

// Re-exports for convenient access
pub use catalog::Catalog;
pub use entity::{Function, Package};
pub use provider::{Locator, MetadataProvider, ModuleLoader};
pub use response::Response;
pub use selector::Selector;
pub use storage::CatalogStore;
pub use sync::{SyncOptions, SyncReport, Synchronizer};

/// Result type alias for Pkgdex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Pkgdex operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Schema version {found} is newer than this build supports ({latest})")]
    SchemaTooNew { found: u32, latest: u32 },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Cannot open database: {0}")]
    Connection(String),

    #[error("Failed to load {name}: {reason}")]
    Load { name: String, reason: String },

    #[error("Failed to fetch metadata for {locator}: {status} {message}")]
    Fetch {
        locator: String,
        status: u16,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Envelope status code for this error
    pub fn status(&self) -> u16 {
        match self {
            Error::NotFound(_) => response::NOT_FOUND,
            Error::InvalidSelector(_) | Error::InvalidMetadata(_) => response::BAD_REQUEST,
            Error::SchemaTooNew { .. } => 409,
            Error::Connection(_) => 503,
            Error::Fetch { status, .. } if *status >= 400 => *status,
            Error::Fetch { .. } => 502,
            _ => response::SERVER_ERROR,
        }
    }
}
