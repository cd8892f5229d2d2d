//! Versioned schema engine
//!
//! Brings a database from its recorded schema version up to a target version
//! by replaying a declarative ladder of steps. Steps are plain data so the
//! engine stays independent of any particular schema.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::{Error, Result};

/// Table holding the single applied-version row
pub const VERSION_TABLE: &str = "schema_version";

/// One upgrade step: statements that move the schema from `version - 1` to `version`
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub statements: &'static [&'static str],
}

/// Declarative schema ladder
#[derive(Debug, Clone, Copy)]
pub struct SchemaSpec {
    pub latest: u32,
    /// Statements creating the `latest` schema on an empty database
    pub install: &'static [&'static str],
    /// `upgrade_to_vN` steps for `N` in `2..=latest`
    pub upgrades: &'static [Migration],
}

impl SchemaSpec {
    fn upgrade_to(&self, version: u32) -> Option<&Migration> {
        self.upgrades.iter().find(|m| m.version == version)
    }
}

/// Read the recorded version, if the tracking table exists and holds a row.
pub fn current_version(conn: &Connection) -> Result<Option<u32>> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [VERSION_TABLE],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(None);
    }
    let version: Option<u32> = conn
        .query_row(
            &format!("SELECT version FROM {} LIMIT 1", VERSION_TABLE),
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version)
}

/// Make sure the schema is at `spec.latest`, returning the final version.
///
/// A database without a version record gets `install` and is stamped with
/// `latest`. An older database replays each missing step in ascending order,
/// each in its own transaction along with its version bump, so an interrupted
/// upgrade resumes from the last completed step. A newer database is refused.
pub fn ensure_schema(conn: &mut Connection, spec: &SchemaSpec) -> Result<u32> {
    let found = match current_version(conn)? {
        None => {
            install(conn, spec)?;
            return Ok(spec.latest);
        }
        Some(v) => v,
    };

    if found == spec.latest {
        debug!(version = found, "schema up to date");
        return Ok(found);
    }
    if found > spec.latest {
        return Err(Error::SchemaTooNew {
            found,
            latest: spec.latest,
        });
    }

    // Validate the whole ladder before touching anything
    for version in (found + 1)..=spec.latest {
        if spec.upgrade_to(version).is_none() {
            return Err(Error::Schema(format!(
                "schema ladder has no step to version {}",
                version
            )));
        }
    }

    for version in (found + 1)..=spec.latest {
        let Some(step) = spec.upgrade_to(version) else {
            continue;
        };
        let tx = conn.transaction()?;
        for stmt in step.statements {
            tx.execute_batch(stmt)?;
        }
        tx.execute(
            &format!("UPDATE {} SET version = ?1", VERSION_TABLE),
            params![version],
        )?;
        tx.commit()?;
        info!(version, "schema upgraded");
    }

    Ok(spec.latest)
}

fn install(conn: &mut Connection, spec: &SchemaSpec) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (version INTEGER NOT NULL)",
        VERSION_TABLE
    ))?;
    for stmt in spec.install {
        tx.execute_batch(stmt)?;
    }
    tx.execute(
        &format!("INSERT INTO {} (version) VALUES (?1)", VERSION_TABLE),
        params![spec.latest],
    )?;
    tx.commit()?;
    info!(version = spec.latest, "schema installed");
    Ok(())
}
