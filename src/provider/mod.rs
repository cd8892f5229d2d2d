//! Metadata provider framework
//!
//! The catalog never produces metadata itself. Two collaborators supply it:
//! - `MetadataProvider`: describes a package or function, enumerates a package's functions
//! - `ModuleLoader`: makes units describable, discovers them, reports source mtimes
//!
//! Both are object-safe and take `&self`; implementations that cache use
//! interior mutability. Everything runs on one thread.

pub mod manifest;
pub mod memory;

pub use manifest::ManifestProvider;
pub use memory::MemoryProvider;

use serde_json::Value;

use crate::Result;
use crate::entity::SEP;
use crate::response::Response;

/// Address of something a provider can describe
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Package(String),
    Function { package: String, name: String },
}

impl Locator {
    pub fn package(name: impl Into<String>) -> Self {
        Locator::Package(name.into())
    }

    pub fn function(package: impl Into<String>, name: impl Into<String>) -> Self {
        Locator::Function {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Owning package name
    pub fn package_name(&self) -> &str {
        match self {
            Locator::Package(name) => name,
            Locator::Function { package, .. } => package,
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Package(name) => write!(f, "{}", name),
            Locator::Function { package, name } => write!(f, "{}{}{}", package, SEP, name),
        }
    }
}

/// Source of structured metadata
pub trait MetadataProvider {
    /// Metadata object for a package or function
    fn describe(&self, locator: &Locator) -> Response<Value>;

    /// Names of the functions a package exposes
    fn enumerate(&self, package: &str) -> Response<Vec<String>>;
}

/// Discovers and loads introspectable units
pub trait ModuleLoader {
    /// Make `name` describable. Fails with `Error::Load`.
    fn load(&self, name: &str) -> Result<()>;

    /// Every loadable unit nested under `prefix`, recursively
    fn modules_under(&self, prefix: &str) -> Result<Vec<String>>;

    /// Every already-registered package nested under `prefix`, without loading
    fn loaded_under(&self, prefix: &str) -> Vec<String>;

    /// Modification time of the unit's source, in epoch seconds
    fn source_mtime(&self, name: &str) -> Option<i64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::package("Demo::Foo").to_string(), "Demo::Foo");
        assert_eq!(Locator::function("Demo::Foo", "run").to_string(), "Demo::Foo::run");
        assert_eq!(Locator::function("Demo::Foo", "run").package_name(), "Demo::Foo");
    }
}
