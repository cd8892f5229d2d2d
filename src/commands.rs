use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context as _;
use serde::Serialize;
use serde_json::Value;

use pkgdex::catalog::{Catalog, UpdateRequest};
use pkgdex::config::{CatalogConfig, Dsn, default_dsn, load_config};
use pkgdex::output::{OutputMode, emit};
use pkgdex::provider::ManifestProvider;
use pkgdex::query::{ArgumentFilter, Listing};
use pkgdex::response::Response;
use pkgdex::sync::{SyncOptions, SyncReport};
use pkgdex::ui::table::{
    argument_stats_table, arguments_table, function_stats_table, functions_table, packages_table,
    stats_table,
};
use pkgdex::ui::{self, Icons, PackageAction, ProgressManager};

use crate::Cli;

/// Settings shared by every subcommand, CLI flags over config file over defaults
pub struct Context {
    pub mode: OutputMode,
    pub verbose: bool,
    pub dsn: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub config: CatalogConfig,
}

impl Context {
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let config = load_config(cli.config.as_deref())?.unwrap_or_default();
        let dsn = cli
            .dsn
            .clone()
            .or_else(|| config.database.clone())
            .unwrap_or_else(default_dsn);
        Ok(Self {
            mode: OutputMode::from_flag(cli.json),
            verbose: cli.verbose,
            dsn,
            user: cli.user.clone().or_else(|| config.user.clone()),
            password: cli.password.clone().or_else(|| config.password.clone()),
            config,
        })
    }

    fn open(&self) -> pkgdex::Result<Catalog> {
        let dsn = Dsn::parse(&self.dsn)?.with_credentials(self.user.clone(), self.password.clone());
        Catalog::open(&dsn)
    }

    /// Run `op` against the catalog, or report why it could not be opened
    fn with_catalog<T: Serialize>(
        &self,
        op: impl FnOnce(&Catalog) -> Response<T>,
        render: impl FnOnce(&T),
    ) -> anyhow::Result<bool> {
        let response = match self.open() {
            Ok(catalog) => op(&catalog),
            Err(e) => Response::from(Err(e)),
        };
        Ok(emit(self.mode, &response, render)?)
    }
}

pub struct SyncArgs {
    pub selectors: Vec<String>,
    pub exclude: Vec<String>,
    pub root: Option<PathBuf>,
    pub force: bool,
    pub delete: bool,
    pub dry_run: bool,
}

pub fn run_sync(ctx: &Context, args: SyncArgs) -> anyhow::Result<bool> {
    let root = args
        .root
        .or_else(|| ctx.config.root.as_ref().map(PathBuf::from))
        .context("no manifest directory; pass --root or set `root` in the config file")?;
    let selectors = if args.selectors.is_empty() {
        ctx.config.selectors.clone()
    } else {
        args.selectors
    };
    if selectors.is_empty() {
        anyhow::bail!("no selectors given and none configured");
    }
    let mut exclude = ctx.config.exclude.clone();
    exclude.extend(args.exclude);

    let options = SyncOptions {
        selectors,
        exclude,
        force: args.force,
        delete: args.delete,
        dry_run: args.dry_run,
    };
    let provider = ManifestProvider::new(root);

    if ctx.mode.is_human() {
        ui::header(Icons::DATABASE, &format!("Syncing {}", ctx.dsn));
        ui::status(Icons::PACKAGE, "Manifests", &provider.root().display().to_string());
    }

    let started = Instant::now();
    let (progress, tx) = if ctx.mode.is_human() {
        let (manager, tx) = ProgressManager::new(ctx.verbose);
        (Some(manager), Some(tx))
    } else {
        (None, None)
    };

    let response = match ctx.open() {
        Ok(catalog) => catalog.sync(&provider, &provider, &options, tx),
        Err(e) => {
            // Closing the channel lets the progress thread finish
            drop(tx);
            Response::from(Err(e))
        }
    };

    let (refreshed, functions) = response
        .payload
        .as_ref()
        .map(|r| (r.refreshed.len(), r.functions_written))
        .unwrap_or_default();
    if let Some(manager) = progress {
        if response.is_success() {
            manager.finish_with_summary(started.elapsed(), refreshed, functions);
        } else {
            manager.finish();
        }
    }

    Ok(emit(ctx.mode, &response, render_sync_report)?)
}

fn render_sync_report(report: &SyncReport) {
    for name in &report.refreshed {
        ui::package_action(name, PackageAction::Refreshed);
    }
    for name in &report.would_refresh {
        ui::package_action(name, PackageAction::WouldRefresh);
    }
    for name in &report.excluded {
        ui::package_action(name, PackageAction::Excluded);
    }
    for name in &report.deleted {
        ui::package_action(name, PackageAction::Deleted);
    }

    ui::section("Summary");
    ui::summary_row("Candidates", &report.candidates.len().to_string());
    ui::summary_row("Refreshed", &report.refreshed.len().to_string());
    ui::summary_row("Unchanged", &report.unchanged.len().to_string());
    if report.dry_run {
        ui::summary_row("Would refresh", &report.would_refresh.len().to_string());
        ui::warn("Dry run: nothing was written");
    }
    ui::summary_row("Excluded", &report.excluded.len().to_string());
    ui::summary_row("Deleted", &report.deleted.len().to_string());
    ui::summary_row("Functions written", &report.functions_written.to_string());
}

/// Metadata from an inline JSON string or a file; `{}` when neither is given
pub fn read_metadata(inline: Option<&str>, file: Option<&Path>) -> anyhow::Result<Value> {
    let text = match (inline, file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read metadata file {}", path.display()))?,
        (None, None) => return Ok(Value::Object(Default::default())),
    };
    serde_json::from_str(&text).context("metadata is not valid JSON")
}

pub fn run_update(ctx: &Context, request: &UpdateRequest) -> anyhow::Result<bool> {
    ctx.with_catalog(
        |catalog| catalog.update(request),
        |name| ui::success(&format!("Updated {}", name)),
    )
}

pub fn run_delete(ctx: &Context, name: &str) -> anyhow::Result<bool> {
    ctx.with_catalog(
        |catalog| catalog.delete(name),
        |name| ui::success(&format!("Deleted {}", name)),
    )
}

fn render_listing<T>(listing: &Listing<T>, table: impl FnOnce(&[T]) -> String) {
    match listing {
        Listing::Names(names) => ui::names(names),
        Listing::Detailed(rows) => {
            let rendered = table(rows.as_slice());
            if rendered.is_empty() {
                println!("{}", ui::muted("(none)"));
            } else {
                println!("{}", rendered);
            }
        }
    }
}

pub fn run_packages(ctx: &Context, term: Option<&str>, detail: bool) -> anyhow::Result<bool> {
    ctx.with_catalog(
        |catalog| catalog.packages(term, detail),
        |listing| render_listing(listing, packages_table),
    )
}

pub fn run_functions(
    ctx: &Context,
    term: Option<&str>,
    package: Option<&str>,
    detail: bool,
) -> anyhow::Result<bool> {
    ctx.with_catalog(
        |catalog| catalog.functions(term, package, detail),
        |listing| render_listing(listing, functions_table),
    )
}

pub fn run_arguments(ctx: &Context, filter: &ArgumentFilter, detail: bool) -> anyhow::Result<bool> {
    ctx.with_catalog(
        |catalog| catalog.arguments(filter, detail),
        |listing| render_listing(listing, arguments_table),
    )
}

pub fn run_stats(ctx: &Context) -> anyhow::Result<bool> {
    ctx.with_catalog(
        |catalog| catalog.stats(),
        |stats| {
            let packages = stats.packages.to_string();
            let functions = stats.functions.to_string();
            ui::header(Icons::STATS, "Catalog");
            println!(
                "{}",
                stats_table(&[
                    ("Packages", packages.as_str()),
                    ("Functions", functions.as_str()),
                    ("Database", stats.dsn.as_str()),
                ])
            );
        },
    )
}

pub fn run_function_stats(ctx: &Context) -> anyhow::Result<bool> {
    ctx.with_catalog(
        |catalog| catalog.function_stats(),
        |stats| println!("{}", function_stats_table(stats)),
    )
}

pub fn run_argument_stats(ctx: &Context) -> anyhow::Result<bool> {
    ctx.with_catalog(
        |catalog| catalog.argument_stats(),
        |stats| println!("{}", argument_stats_table(stats)),
    )
}

pub fn run_meta(ctx: &Context, name: &str) -> anyhow::Result<bool> {
    ctx.with_catalog(
        |catalog| catalog.meta(name),
        |meta| match serde_json::to_string_pretty(meta) {
            Ok(text) => println!("{}", text),
            Err(e) => ui::error(&format!("cannot render metadata: {}", e)),
        },
    )
}
