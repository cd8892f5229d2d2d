//! In-memory provider
//!
//! Holds package and function metadata in plain maps. Useful for embedding
//! the catalog in programs that already have metadata at hand, and for tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, HashSet};

use serde_json::Value;

use super::{Locator, MetadataProvider, ModuleLoader};
use crate::entity::nested_under;
use crate::response::Response;
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct MemoryPackage {
    metadata: Value,
    functions: Vec<(String, Value)>,
    mtime: Option<i64>,
}

/// Provider and loader backed by in-memory metadata
#[derive(Debug, Default)]
pub struct MemoryProvider {
    // Registration order is the discovery order
    order: Vec<String>,
    packages: HashMap<String, MemoryPackage>,
    broken: HashSet<String>,
    loaded: RefCell<BTreeSet<String>>,
    describe_calls: Cell<usize>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loadable package. Replaces an earlier registration.
    pub fn add_package(&mut self, name: &str, metadata: Value) -> &mut Self {
        if !self.packages.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.packages.insert(
            name.to_string(),
            MemoryPackage {
                metadata,
                functions: Vec::new(),
                mtime: None,
            },
        );
        self
    }

    /// Register a package that counts as already loaded
    pub fn add_loaded_package(&mut self, name: &str, metadata: Value) -> &mut Self {
        self.add_package(name, metadata);
        self.loaded.borrow_mut().insert(name.to_string());
        self
    }

    pub fn add_function(&mut self, package: &str, name: &str, metadata: Value) -> &mut Self {
        if let Some(pkg) = self.packages.get_mut(package) {
            pkg.functions.retain(|(n, _)| n != name);
            pkg.functions.push((name.to_string(), metadata));
        }
        self
    }

    pub fn set_mtime(&mut self, package: &str, mtime: Option<i64>) -> &mut Self {
        if let Some(pkg) = self.packages.get_mut(package) {
            pkg.mtime = mtime;
        }
        self
    }

    /// Replace a package's metadata, keeping its functions and mtime
    pub fn set_metadata(&mut self, package: &str, metadata: Value) -> &mut Self {
        if let Some(pkg) = self.packages.get_mut(package) {
            pkg.metadata = metadata;
        }
        self
    }

    /// Make every later `load` of `name` fail
    pub fn break_package(&mut self, name: &str) -> &mut Self {
        self.broken.insert(name.to_string());
        self
    }

    /// Number of `describe` requests served so far
    pub fn describe_calls(&self) -> usize {
        self.describe_calls.get()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.borrow().contains(name)
    }

    fn loaded_package(&self, name: &str) -> Option<&MemoryPackage> {
        if !self.is_loaded(name) {
            return None;
        }
        self.packages.get(name)
    }
}

impl MetadataProvider for MemoryProvider {
    fn describe(&self, locator: &Locator) -> Response<Value> {
        self.describe_calls.set(self.describe_calls.get() + 1);
        let Some(pkg) = self.loaded_package(locator.package_name()) else {
            return Response::not_found(locator);
        };
        match locator {
            Locator::Package(_) => Response::ok(pkg.metadata.clone()),
            Locator::Function { name, .. } => pkg
                .functions
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, meta)| Response::ok(meta.clone()))
                .unwrap_or_else(|| Response::not_found(locator)),
        }
    }

    fn enumerate(&self, package: &str) -> Response<Vec<String>> {
        match self.loaded_package(package) {
            Some(pkg) => Response::ok(pkg.functions.iter().map(|(n, _)| n.clone()).collect()),
            None => Response::not_found(package),
        }
    }
}

impl ModuleLoader for MemoryProvider {
    fn load(&self, name: &str) -> Result<()> {
        if self.broken.contains(name) {
            return Err(Error::Load {
                name: name.to_string(),
                reason: "compilation failed".to_string(),
            });
        }
        if !self.packages.contains_key(name) {
            return Err(Error::Load {
                name: name.to_string(),
                reason: "no such module".to_string(),
            });
        }
        self.loaded.borrow_mut().insert(name.to_string());
        Ok(())
    }

    fn modules_under(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .order
            .iter()
            .filter(|name| nested_under(name, prefix))
            .cloned()
            .collect())
    }

    fn loaded_under(&self, prefix: &str) -> Vec<String> {
        let loaded = self.loaded.borrow();
        self.order
            .iter()
            .filter(|name| loaded.contains(*name) && nested_under(name, prefix))
            .cloned()
            .collect()
    }

    fn source_mtime(&self, name: &str) -> Option<i64> {
        self.packages.get(name).and_then(|pkg| pkg.mtime)
    }
}
