//! Incremental synchronization
//!
//! A run has three phases:
//! 1. Expand selectors into candidates (`expand`)
//! 2. Refresh every stale candidate from the metadata provider
//! 3. Optionally delete stored packages that are in scope but gone
//!
//! Any load or fetch failure aborts the run. Rows already written stay
//! written; the staleness check makes a re-run cheap.

pub mod expand;
pub mod staleness;

use std::collections::HashSet;

use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entity::{Function, Package};
use crate::metadata;
use crate::provider::{Locator, MetadataProvider, ModuleLoader};
use crate::response::Response;
use crate::selector::{self, ExclusionSet, Selector};
use crate::storage::CatalogStore;
use crate::ui::progress_message::{PackageAction, ProgressMessage, ProgressPhase};
use crate::{Error, Result};

pub use expand::expand;
pub use staleness::needs_refresh;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    pub selectors: Vec<String>,
    pub exclude: Vec<String>,
    /// Refresh even when the stored mtime is current
    pub force: bool,
    /// Delete stored packages in scope that no longer resolve
    pub delete: bool,
    /// Decide what would be refreshed without writing
    pub dry_run: bool,
}

/// Outcome of a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub candidates: Vec<String>,
    pub refreshed: Vec<String>,
    pub unchanged: Vec<String>,
    pub would_refresh: Vec<String>,
    pub excluded: Vec<String>,
    pub deleted: Vec<String>,
    pub functions_written: usize,
    pub dry_run: bool,
}

enum Outcome {
    Refreshed(usize),
    Excluded,
}

pub struct Synchronizer<'a> {
    store: &'a CatalogStore,
    provider: &'a dyn MetadataProvider,
    loader: &'a dyn ModuleLoader,
    progress: Option<Sender<ProgressMessage>>,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        store: &'a CatalogStore,
        provider: &'a dyn MetadataProvider,
        loader: &'a dyn ModuleLoader,
    ) -> Self {
        Self {
            store,
            provider,
            loader,
            progress: None,
        }
    }

    /// Report per-candidate progress over a channel
    pub fn with_progress(mut self, tx: Sender<ProgressMessage>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn run(&self, options: &SyncOptions) -> Result<SyncReport> {
        let selectors = selector::parse_all(&options.selectors)?;
        let exclusions = ExclusionSet::parse(&options.exclude)?;

        let candidates = expand(&selectors, &exclusions, self.loader)?;
        info!(candidates = candidates.len(), "sync started");

        let mut report = SyncReport {
            candidates: candidates.clone(),
            dry_run: options.dry_run,
            ..Default::default()
        };

        let total = candidates.len();
        self.send(ProgressMessage::Started {
            phase: ProgressPhase::Refreshing,
            total,
        });
        for (i, name) in candidates.iter().enumerate() {
            let action = self.visit(name, options, &mut report)?;
            self.send(ProgressMessage::Progress {
                phase: ProgressPhase::Refreshing,
                current: i + 1,
                total,
                package: name.clone(),
                action,
            });
        }
        self.send(ProgressMessage::Finished {
            phase: ProgressPhase::Refreshing,
        });

        if options.delete && !options.dry_run {
            let excluded: HashSet<&str> = report.excluded.iter().map(String::as_str).collect();
            let present: HashSet<&str> = candidates
                .iter()
                .map(String::as_str)
                .filter(|name| !excluded.contains(name))
                .collect();
            report.deleted = self.delete_missing(&selectors, &exclusions, &present)?;
        }

        info!(
            refreshed = report.refreshed.len(),
            unchanged = report.unchanged.len(),
            excluded = report.excluded.len(),
            deleted = report.deleted.len(),
            "sync finished"
        );
        Ok(report)
    }

    fn visit(
        &self,
        name: &str,
        options: &SyncOptions,
        report: &mut SyncReport,
    ) -> Result<PackageAction> {
        let stored = self.store.get_package(name)?;
        let disk_mtime = self.loader.source_mtime(name);

        if !needs_refresh(options.force, stored.as_ref(), disk_mtime) {
            debug!(name, "unchanged");
            report.unchanged.push(name.to_string());
            return Ok(PackageAction::Unchanged);
        }
        if options.dry_run {
            report.would_refresh.push(name.to_string());
            return Ok(PackageAction::WouldRefresh);
        }

        match self.refresh(name, stored.as_ref(), disk_mtime)? {
            Outcome::Refreshed(functions) => {
                info!(name, functions, "refreshed");
                report.refreshed.push(name.to_string());
                report.functions_written += functions;
                Ok(PackageAction::Refreshed)
            }
            Outcome::Excluded => {
                info!(name, "excluded by metadata");
                report.excluded.push(name.to_string());
                Ok(PackageAction::Excluded)
            }
        }
    }

    fn refresh(
        &self,
        name: &str,
        stored: Option<&Package>,
        disk_mtime: Option<i64>,
    ) -> Result<Outcome> {
        let meta = fetch(self.provider.describe(&Locator::package(name)), name)?;
        let function_names = fetch(self.provider.enumerate(name), name)?;

        if metadata::is_excluded(&meta) {
            self.store.delete_functions_of(name)?;
            self.store.delete_package(name)?;
            return Ok(Outcome::Excluded);
        }

        let dist = metadata::dist(&meta);
        let package = Package {
            name: name.to_string(),
            summary: metadata::summary(&meta),
            metadata: Some(serde_json::to_string(&meta)?),
            dist: dist.clone(),
            extra: stored.and_then(|p| p.extra.clone()),
            mtime: disk_mtime,
        };
        self.store.upsert_package(&package)?;
        self.store.delete_functions_of(name)?;

        let mut written = 0;
        for function_name in &function_names {
            let locator = Locator::function(name, function_name.as_str());
            let mut meta = fetch(self.provider.describe(&locator), &locator)?;
            if metadata::is_excluded(&meta) {
                debug!(function = %locator, "function excluded");
                continue;
            }
            let dropped = metadata::strip_excluded_args(&mut meta);
            if dropped > 0 {
                debug!(function = %locator, dropped, "arguments excluded");
            }

            let function = Function {
                package: name.to_string(),
                name: function_name.clone(),
                summary: metadata::summary(&meta),
                metadata: Some(serde_json::to_string(&meta)?),
                dist: metadata::dist(&meta).or_else(|| dist.clone()),
                extra: None,
                mtime: disk_mtime,
            };
            self.store.upsert_function(&function)?;
            written += 1;
        }
        Ok(Outcome::Refreshed(written))
    }

    /// Delete stored packages a selector covers that did not turn up this run
    fn delete_missing(
        &self,
        selectors: &[Selector],
        exclusions: &ExclusionSet,
        present: &HashSet<&str>,
    ) -> Result<Vec<String>> {
        let doomed: Vec<String> = self
            .store
            .package_names()?
            .into_iter()
            .filter(|name| !present.contains(name.as_str()))
            .filter(|name| !exclusions.is_excluded(name))
            .filter(|name| selectors.iter().any(|s| s.covers(name)))
            .collect();

        let total = doomed.len();
        self.send(ProgressMessage::Started {
            phase: ProgressPhase::Deleting,
            total,
        });
        for (i, name) in doomed.iter().enumerate() {
            let functions = self.store.delete_functions_of(name)?;
            self.store.delete_package(name)?;
            info!(name = %name, functions, "deleted");
            self.send(ProgressMessage::Progress {
                phase: ProgressPhase::Deleting,
                current: i + 1,
                total,
                package: name.clone(),
                action: PackageAction::Deleted,
            });
        }
        self.send(ProgressMessage::Finished {
            phase: ProgressPhase::Deleting,
        });
        Ok(doomed)
    }

    fn send(&self, msg: ProgressMessage) {
        if let Some(tx) = &self.progress {
            // Progress is advisory; a closed receiver must not stop the run
            let _ = tx.send(msg);
        }
    }
}

/// Unwrap a provider envelope, turning any non-200 status into a fetch failure
fn fetch<T>(response: Response<T>, locator: impl std::fmt::Display) -> Result<T> {
    match response.into_result() {
        Ok(payload) => Ok(payload),
        Err((status, message)) => Err(Error::Fetch {
            locator: locator.to_string(),
            status,
            message,
        }),
    }
}
