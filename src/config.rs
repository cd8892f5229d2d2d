use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

pub const DEFAULT_DB_FILE: &str = "pkgdex.db";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CatalogConfig {
    /// Database connection string
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Manifest directory used by the bundled provider
    pub root: Option<String>,
    /// Default selectors for `sync`
    pub selectors: Vec<String>,
    /// Default exclusions for `sync`
    pub exclude: Vec<String>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("pkgdex.toml")
}

pub fn default_database_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DB_FILE)
}

pub fn default_dsn() -> String {
    format!("dbi:SQLite:dbname={}", default_database_path().display())
}

/// Read the config file. A missing default file is not an error; a missing
/// explicit one is.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CatalogConfig>> {
    let path = match path {
        Some(p) if !p.exists() => anyhow::bail!("config file not found: {}", p.display()),
        Some(p) => p.to_path_buf(),
        None => default_config_path(),
    };
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CatalogConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Where a connection string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    File(PathBuf),
    Memory,
}

/// Parsed connection string plus optional credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    raw: String,
    pub target: Target,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Dsn {
    /// Parse a connection string.
    ///
    /// Accepted forms: `dbi:SQLite:dbname=PATH`, `sqlite://PATH`,
    /// `sqlite:PATH`, `:memory:` and a bare path. Other drivers are refused.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::Connection("empty connection string".to_string()));
        }

        let location = if let Some(rest) = raw.strip_prefix("dbi:") {
            let (driver, args) = rest
                .split_once(':')
                .ok_or_else(|| Error::Connection(format!("malformed DSN: {}", raw)))?;
            if !driver.eq_ignore_ascii_case("sqlite") {
                return Err(Error::Connection(format!("unsupported driver: {}", driver)));
            }
            dbi_dbname(args)
                .ok_or_else(|| Error::Connection(format!("DSN has no dbname: {}", raw)))?
        } else if let Some(rest) = raw.strip_prefix("sqlite://") {
            rest.to_string()
        } else if let Some(rest) = raw.strip_prefix("sqlite:") {
            rest.to_string()
        } else if let Some((scheme, _)) = raw.split_once("://") {
            return Err(Error::Connection(format!("unsupported driver: {}", scheme)));
        } else {
            raw.to_string()
        };

        let target = match location.as_str() {
            "" => return Err(Error::Connection(format!("DSN has no database: {}", raw))),
            ":memory:" => Target::Memory,
            path => Target::File(PathBuf::from(path)),
        };

        Ok(Self {
            raw: raw.to_string(),
            target,
            user: None,
            password: None,
        })
    }

    pub fn memory() -> Self {
        Self {
            raw: ":memory:".to_string(),
            target: Target::Memory,
            user: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, user: Option<String>, password: Option<String>) -> Self {
        self.user = user;
        self.password = password;
        self
    }

    /// The connection string as given
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for Dsn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

// `dbname=foo.db;timeout=5` -> `foo.db`; also accepts `database=` and a bare value
fn dbi_dbname(args: &str) -> Option<String> {
    for part in args.split(';') {
        let part = part.trim();
        match part.split_once('=') {
            Some((key, value)) if key == "dbname" || key == "database" || key == "db" => {
                return Some(value.to_string());
            }
            Some(_) => continue,
            None if !part.is_empty() => return Some(part.to_string()),
            None => continue,
        }
    }
    None
}
