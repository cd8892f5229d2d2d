//! Catalog entities
//!
//! Two persisted kinds:
//! - `Package`: a named unit of introspectable code, keyed by name
//! - `Function`: a callable owned by exactly one package, keyed by `(package, name)`
//!
//! Metadata is kept as an opaque serialized blob; only the `metadata` module
//! and the query layer look inside it.

use serde::{Deserialize, Serialize};

/// Separator between package path segments and between a package and its functions
pub const SEP: &str = "::";

/// A stored package row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Unique package name (e.g. `Demo::Foo`)
    pub name: String,
    /// One-line summary taken from package-level metadata
    pub summary: Option<String>,
    /// Serialized metadata blob
    pub metadata: Option<String>,
    /// Originating distribution name
    pub dist: Option<String>,
    /// Free-form annotation
    pub extra: Option<String>,
    /// Last known source modification time (epoch seconds)
    pub mtime: Option<i64>,
}

impl Package {
    /// Create a bare package row with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: None,
            metadata: None,
            dist: None,
            extra: None,
            mtime: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn with_dist(mut self, dist: impl Into<String>) -> Self {
        self.dist = Some(dist.into());
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    pub fn with_mtime(mut self, mtime: i64) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// Recorded mtime, treating 0 as never refreshed
    pub fn known_mtime(&self) -> Option<i64> {
        self.mtime.filter(|t| *t > 0)
    }
}

/// A stored function row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Owning package name
    pub package: String,
    /// Function name, unique within the package
    pub name: String,
    pub summary: Option<String>,
    pub metadata: Option<String>,
    pub dist: Option<String>,
    pub extra: Option<String>,
    pub mtime: Option<i64>,
}

impl Function {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
            summary: None,
            metadata: None,
            dist: None,
            extra: None,
            mtime: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// `package::name`
    pub fn qualified_name(&self) -> String {
        format!("{}{}{}", self.package, SEP, self.name)
    }
}

/// Split `Pkg::Sub::func` into `("Pkg::Sub", "func")`.
///
/// Returns `None` when the input holds no separator.
pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
    let (package, function) = name.rsplit_once(SEP)?;
    if package.is_empty() || function.is_empty() {
        return None;
    }
    Some((package, function))
}

/// `candidate` sits strictly below `prefix` in the `::` hierarchy
pub fn nested_under(candidate: &str, prefix: &str) -> bool {
    candidate
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(SEP))
        .is_some_and(|rest| !rest.is_empty())
}
