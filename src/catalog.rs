//! Catalog facade
//!
//! Wraps a `CatalogStore` and exposes every public operation as a
//! `Response` envelope: status 200 with a payload, or an error status and
//! message derived from `Error::status`.

use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::Dsn;
use crate::entity::{Function, Package, SEP, split_qualified};
use crate::metadata;
use crate::provider::{MetadataProvider, ModuleLoader};
use crate::query::{
    ArgumentFilter, ArgumentRow, ArgumentStat, CatalogQuery, FunctionStat, Listing, Stats,
};
use crate::response::Response;
use crate::selector::is_valid_name;
use crate::storage::CatalogStore;
use crate::sync::{SyncOptions, SyncReport, Synchronizer};
use crate::ui::progress_message::ProgressMessage;
use crate::{Error, Result};

/// Explicit add/update of one package or function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub package: String,
    /// When set, the function row is written instead of the package row
    pub function: Option<String>,
    pub metadata: Value,
    pub dist: Option<String>,
    pub extra: Option<String>,
    pub mtime: Option<i64>,
}

impl UpdateRequest {
    pub fn package(name: impl Into<String>, metadata: Value) -> Self {
        Self {
            package: name.into(),
            function: None,
            metadata,
            dist: None,
            extra: None,
            mtime: None,
        }
    }

    pub fn function(package: impl Into<String>, name: impl Into<String>, metadata: Value) -> Self {
        Self {
            function: Some(name.into()),
            ..Self::package(package, metadata)
        }
    }
}

pub struct Catalog {
    store: CatalogStore,
}

impl Catalog {
    /// Open (creating and upgrading as needed) the database behind `dsn`
    pub fn open(dsn: &Dsn) -> Result<Self> {
        Ok(Self {
            store: CatalogStore::open(dsn)?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            store: CatalogStore::open_in_memory()?,
        })
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    fn query(&self) -> CatalogQuery<'_> {
        CatalogQuery::new(&self.store)
    }

    pub fn sync(
        &self,
        provider: &dyn MetadataProvider,
        loader: &dyn ModuleLoader,
        options: &SyncOptions,
        progress: Option<Sender<ProgressMessage>>,
    ) -> Response<SyncReport> {
        let mut synchronizer = Synchronizer::new(&self.store, provider, loader);
        if let Some(tx) = progress {
            synchronizer = synchronizer.with_progress(tx);
        }
        synchronizer.run(options).into()
    }

    /// Write one package or function row. Returns the name written.
    pub fn update(&self, request: &UpdateRequest) -> Response<String> {
        self.try_update(request).into()
    }

    fn try_update(&self, request: &UpdateRequest) -> Result<String> {
        if !is_valid_name(&request.package) {
            return Err(Error::InvalidSelector(request.package.clone()));
        }
        if !request.metadata.is_object() {
            return Err(Error::InvalidMetadata(format!(
                "metadata for {} must be an object",
                request.package
            )));
        }
        let blob = serde_json::to_string(&request.metadata)?;
        let dist = request.dist.clone().or_else(|| metadata::dist(&request.metadata));

        match &request.function {
            None => {
                self.store.upsert_package(&Package {
                    name: request.package.clone(),
                    summary: metadata::summary(&request.metadata),
                    metadata: Some(blob),
                    dist,
                    extra: request.extra.clone(),
                    mtime: request.mtime,
                })?;
                info!(package = %request.package, "package updated");
                Ok(request.package.clone())
            }
            Some(name) => {
                if name.is_empty() || name.contains(SEP) {
                    return Err(Error::InvalidSelector(name.clone()));
                }
                // The owning package's own summary is left alone
                self.store.ensure_package(&request.package)?;
                let function = Function {
                    package: request.package.clone(),
                    name: name.clone(),
                    summary: metadata::summary(&request.metadata),
                    metadata: Some(blob),
                    dist,
                    extra: request.extra.clone(),
                    mtime: request.mtime,
                };
                self.store.upsert_function(&function)?;
                info!(function = %function.qualified_name(), "function updated");
                Ok(function.qualified_name())
            }
        }
    }

    /// Delete a function (`Pkg::func`) or, failing that, a package and its functions
    pub fn delete(&self, name: &str) -> Response<String> {
        self.try_delete(name).into()
    }

    fn try_delete(&self, name: &str) -> Result<String> {
        if let Some((package, function)) = split_qualified(name) {
            if self.store.delete_function(package, function)? {
                info!(function = name, "function deleted");
                return Ok(name.to_string());
            }
        }
        if self.store.get_package(name)?.is_none() {
            return Err(Error::NotFound(name.to_string()));
        }
        let functions = self.store.delete_functions_of(name)?;
        self.store.delete_package(name)?;
        info!(package = name, functions, "package deleted");
        Ok(name.to_string())
    }

    pub fn packages(&self, term: Option<&str>, detail: bool) -> Response<Listing<Package>> {
        self.query().list_packages(term, detail).into()
    }

    pub fn functions(
        &self,
        term: Option<&str>,
        package: Option<&str>,
        detail: bool,
    ) -> Response<Listing<Function>> {
        self.query().list_functions(term, package, detail).into()
    }

    pub fn arguments(
        &self,
        filter: &ArgumentFilter,
        detail: bool,
    ) -> Response<Listing<ArgumentRow>> {
        self.query().list_arguments(filter, detail).into()
    }

    pub fn stats(&self) -> Response<Stats> {
        self.query().stats().into()
    }

    pub fn function_stats(&self) -> Response<Vec<FunctionStat>> {
        self.query().function_stats().into()
    }

    pub fn argument_stats(&self) -> Response<Vec<ArgumentStat>> {
        self.query().argument_stats().into()
    }

    pub fn meta(&self, name: &str) -> Response<Value> {
        self.query().get_metadata(name).into()
    }
}
