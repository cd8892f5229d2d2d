//! SQLite storage implementation

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::debug;

use super::migrate::ensure_schema;
use super::schema::CATALOG_SCHEMA;
use crate::Result;
use crate::config::{Dsn, Target, ensure_db_dir};
use crate::entity::{Function, Package};
use crate::Error;

const PACKAGE_COLUMNS: &str = "name, summary, metadata, dist, extra, mtime";
const FUNCTION_COLUMNS: &str = "package, name, summary, metadata, dist, extra, mtime";

/// SQLite-backed catalog of packages and functions
pub struct CatalogStore {
    conn: Connection,
    dsn: Dsn,
    schema_version: u32,
}

impl CatalogStore {
    /// Open the database a DSN points at, creating and upgrading it as needed
    pub fn open(dsn: &Dsn) -> Result<Self> {
        let conn = match &dsn.target {
            Target::Memory => Connection::open_in_memory(),
            Target::File(path) => {
                ensure_db_dir(path).map_err(|e| Error::Connection(format!("{}: {}", dsn, e)))?;
                Connection::open(path)
            }
        }
        .map_err(|e| Error::Connection(format!("{}: {}", dsn, e)))?;
        Self::from_connection(conn, dsn.clone())
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, Dsn::memory())
    }

    fn from_connection(mut conn: Connection, dsn: Dsn) -> Result<Self> {
        // SQLite opens lazily; an unreadable file first fails here
        let schema_version = ensure_schema(&mut conn, &CATALOG_SCHEMA)
            .map_err(|e| unreachable_database(&dsn, e))?;
        debug!(%dsn, schema_version, "catalog opened");
        Ok(Self {
            conn,
            dsn,
            schema_version,
        })
    }

    pub fn dsn(&self) -> &Dsn {
        &self.dsn
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    // ========== Package Operations ==========

    /// Insert a package, or update every mutable field of an existing one
    pub fn upsert_package(&self, package: &Package) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO package (name, summary, metadata, dist, extra, mtime)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(name) DO UPDATE SET
                summary = excluded.summary,
                metadata = excluded.metadata,
                dist = excluded.dist,
                extra = excluded.extra,
                mtime = excluded.mtime
            "#,
            params![
                package.name,
                package.summary,
                package.metadata,
                package.dist,
                package.extra,
                package.mtime,
            ],
        )?;
        Ok(())
    }

    /// Insert a bare package row unless one already exists
    pub fn ensure_package(&self, name: &str) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO package (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            [name],
        )?;
        Ok(inserted > 0)
    }

    /// Get a package by name
    pub fn get_package(&self, name: &str) -> Result<Option<Package>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM package WHERE name = ?1", PACKAGE_COLUMNS),
                [name],
                row_to_package,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Delete a package row. Function rows are left alone; callers remove them first.
    pub fn delete_package(&self, name: &str) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM package WHERE name = ?1", [name])?;
        Ok(deleted > 0)
    }

    /// All package names, sorted
    pub fn package_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM package ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Packages whose name, dist or extra contains `term` (case-sensitive), by name
    pub fn find_packages(&self, term: Option<&str>) -> Result<Vec<Package>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM package
            WHERE ?1 IS NULL
               OR instr(name, ?1) > 0
               OR instr(IFNULL(dist, ''), ?1) > 0
               OR instr(IFNULL(extra, ''), ?1) > 0
            ORDER BY name
            "#,
            PACKAGE_COLUMNS
        ))?;
        let packages = stmt
            .query_map([term], row_to_package)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(packages)
    }

    pub fn count_packages(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM package", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Function Operations ==========

    /// Insert a function, or update every mutable field of an existing one
    pub fn upsert_function(&self, function: &Function) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO function (package, name, summary, metadata, dist, extra, mtime)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(package, name) DO UPDATE SET
                summary = excluded.summary,
                metadata = excluded.metadata,
                dist = excluded.dist,
                extra = excluded.extra,
                mtime = excluded.mtime
            "#,
            params![
                function.package,
                function.name,
                function.summary,
                function.metadata,
                function.dist,
                function.extra,
                function.mtime,
            ],
        )?;
        Ok(())
    }

    pub fn get_function(&self, package: &str, name: &str) -> Result<Option<Function>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM function WHERE package = ?1 AND name = ?2",
                    FUNCTION_COLUMNS
                ),
                params![package, name],
                row_to_function,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn delete_function(&self, package: &str, name: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM function WHERE package = ?1 AND name = ?2",
            params![package, name],
        )?;
        Ok(deleted > 0)
    }

    /// Delete every function row of a package, returning how many went
    pub fn delete_functions_of(&self, package: &str) -> Result<usize> {
        let deleted = self.conn.execute("DELETE FROM function WHERE package = ?1", [package])?;
        Ok(deleted)
    }

    /// Functions matching an optional name/summary substring and an optional
    /// exact package, ordered by `(package, name)`
    pub fn find_functions(
        &self,
        term: Option<&str>,
        package: Option<&str>,
    ) -> Result<Vec<Function>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM function
            WHERE (?1 IS NULL
                   OR instr(name, ?1) > 0
                   OR instr(IFNULL(summary, ''), ?1) > 0
                   OR instr(IFNULL(dist, ''), ?1) > 0
                   OR instr(IFNULL(extra, ''), ?1) > 0)
              AND (?2 IS NULL OR package = ?2)
            ORDER BY package, name
            "#,
            FUNCTION_COLUMNS
        ))?;
        let functions = stmt
            .query_map(params![term, package], row_to_function)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(functions)
    }

    pub fn count_functions(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM function", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn row_to_package(row: &rusqlite::Row) -> rusqlite::Result<Package> {
    Ok(Package {
        name: row.get(0)?,
        summary: row.get(1)?,
        metadata: row.get(2)?,
        dist: row.get(3)?,
        extra: row.get(4)?,
        mtime: row.get(5)?,
    })
}

fn row_to_function(row: &rusqlite::Row) -> rusqlite::Result<Function> {
    Ok(Function {
        package: row.get(0)?,
        name: row.get(1)?,
        summary: row.get(2)?,
        metadata: row.get(3)?,
        dist: row.get(4)?,
        extra: row.get(5)?,
        mtime: row.get(6)?,
    })
}

fn unreachable_database(dsn: &Dsn, e: Error) -> Error {
    match e {
        Error::Storage(rusqlite::Error::SqliteFailure(failure, _))
            if matches!(failure.code, ErrorCode::NotADatabase | ErrorCode::CannotOpen) =>
        {
            Error::Connection(format!("{}: {}", dsn, failure))
        }
        other => other,
    }
}
