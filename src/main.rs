//! Pkgdex CLI - Package & function metadata catalog

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "pkgdex")]
#[command(version)]
#[command(about = "Package & function metadata catalog")]
#[command(long_about = r#"
Pkgdex records metadata about packages and the functions they expose, and
keeps it in sync with a directory of JSON manifests.

Example usage:
  pkgdex --dsn sqlite:catalog.db sync --root ./meta Demo::
  pkgdex packages --detail
  pkgdex arguments --type int
  pkgdex meta Demo::Foo::run
"#)]
struct Cli {
    /// Database connection string (dbi:SQLite:dbname=PATH, sqlite:PATH, PATH, :memory:)
    #[arg(long, global = true)]
    dsn: Option<String>,

    /// Database user
    #[arg(long, global = true)]
    user: Option<String>,

    /// Database password
    #[arg(long, global = true)]
    password: Option<String>,

    /// Config file (defaults to ./pkgdex.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the raw (status, message, payload) envelope as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize the catalog with the manifest directory
    Sync {
        /// Selectors: Name, Name::, +Name, +Name::
        selectors: Vec<String>,

        /// Exclusion rules, same grammar as selectors
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Manifest directory
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Refresh even when nothing changed on disk
        #[arg(short, long)]
        force: bool,

        /// Delete packages in scope that no longer exist
        #[arg(short, long)]
        delete: bool,

        /// Report what would be refreshed without writing
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Add or update one package or function
    Update {
        /// Package name
        package: String,

        /// Function name; writes the function instead of the package
        #[arg(short, long)]
        function: Option<String>,

        /// Metadata as a JSON object
        #[arg(short, long, conflicts_with = "metadata_file")]
        metadata: Option<String>,

        /// Read metadata from a JSON file
        #[arg(long)]
        metadata_file: Option<PathBuf>,

        /// Distribution name
        #[arg(long)]
        dist: Option<String>,

        /// Free-form annotation
        #[arg(long)]
        extra: Option<String>,

        /// Source modification time (epoch seconds)
        #[arg(long)]
        mtime: Option<i64>,
    },

    /// Delete a function (Pkg::func) or a package and its functions
    Delete {
        name: String,
    },

    /// List packages
    Packages {
        /// Substring of name, dist or extra
        term: Option<String>,

        /// Show full rows
        #[arg(short, long)]
        detail: bool,
    },

    /// List functions
    Functions {
        /// Substring of name, summary, dist or extra
        term: Option<String>,

        /// Only functions of this package
        #[arg(short, long)]
        package: Option<String>,

        #[arg(short, long)]
        detail: bool,
    },

    /// List function arguments
    Arguments {
        /// Substring of argument name or summary
        term: Option<String>,

        #[arg(short, long)]
        package: Option<String>,

        #[arg(short, long)]
        function: Option<String>,

        /// Inferred scalar type (str, int, ...)
        #[arg(short = 't', long = "type")]
        schema_type: Option<String>,

        #[arg(short, long)]
        detail: bool,
    },

    /// Show catalog statistics
    Stats,

    /// Show argument counts per function
    FunctionStats,

    /// Show how many functions declare each argument name
    ArgumentStats,

    /// Print stored metadata for a function (Pkg::func) or package
    Meta {
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let ctx = commands::Context::resolve(&cli)?;

    let success = match cli.command {
        Commands::Sync {
            selectors,
            exclude,
            root,
            force,
            delete,
            dry_run,
        } => commands::run_sync(
            &ctx,
            commands::SyncArgs {
                selectors,
                exclude,
                root,
                force,
                delete,
                dry_run,
            },
        )?,

        Commands::Update {
            package,
            function,
            metadata,
            metadata_file,
            dist,
            extra,
            mtime,
        } => {
            let metadata = commands::read_metadata(metadata.as_deref(), metadata_file.as_deref())?;
            let request = pkgdex::catalog::UpdateRequest {
                package,
                function,
                metadata,
                dist,
                extra,
                mtime,
            };
            commands::run_update(&ctx, &request)?
        }

        Commands::Delete { name } => commands::run_delete(&ctx, &name)?,

        Commands::Packages { term, detail } => {
            commands::run_packages(&ctx, term.as_deref(), detail)?
        }

        Commands::Functions {
            term,
            package,
            detail,
        } => commands::run_functions(&ctx, term.as_deref(), package.as_deref(), detail)?,

        Commands::Arguments {
            term,
            package,
            function,
            schema_type,
            detail,
        } => {
            let filter = pkgdex::query::ArgumentFilter {
                term,
                package,
                function,
                schema_type,
            };
            commands::run_arguments(&ctx, &filter, detail)?
        }

        Commands::Stats => commands::run_stats(&ctx)?,

        Commands::FunctionStats => commands::run_function_stats(&ctx)?,

        Commands::ArgumentStats => commands::run_argument_stats(&ctx)?,

        Commands::Meta { name } => commands::run_meta(&ctx, &name)?,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
