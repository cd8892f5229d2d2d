//! Database schema definitions
//!
//! The on-disk layout has gone through five versions:
//! 1. bare `module` / `function` tables
//! 2. `module` renamed to `package` (pre-release, rebuilt from scratch)
//! 3. `dist` and `extra` on packages, `extra` on functions
//! 4. `dist` on functions
//! 5. `mtime` on functions

use super::migrate::{Migration, SchemaSpec};

pub const LATEST_VERSION: u32 = 5;

/// SQL to create the package table
pub const CREATE_PACKAGE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS package (
    name TEXT PRIMARY KEY,
    summary TEXT,
    metadata TEXT,
    dist TEXT,
    extra TEXT,
    mtime INTEGER
)
"#;

/// SQL to create the function table
pub const CREATE_FUNCTION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS function (
    package TEXT NOT NULL,
    name TEXT NOT NULL,
    summary TEXT,
    metadata TEXT,
    dist TEXT,
    extra TEXT,
    mtime INTEGER,
    UNIQUE(package, name)
)
"#;

/// Layout of a version 1 database, kept so the full ladder can be exercised
pub const HISTORICAL_V1: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS module (
        name TEXT PRIMARY KEY,
        summary TEXT,
        metadata TEXT,
        mtime INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS function (
        module TEXT NOT NULL,
        name TEXT NOT NULL,
        summary TEXT,
        metadata TEXT,
        UNIQUE(module, name)
    )
    "#,
];

/// Statements creating the latest layout on an empty database
pub const INSTALL: &[&str] = &[
    CREATE_PACKAGE_TABLE,
    CREATE_FUNCTION_TABLE,
    "CREATE INDEX IF NOT EXISTS idx_package_dist ON package(dist)",
    "CREATE INDEX IF NOT EXISTS idx_function_name ON function(name)",
];

const UPGRADES: &[Migration] = &[
    // Pre-release: nothing worth keeping, rebuild with package terminology
    Migration {
        version: 2,
        statements: &[
            "DROP TABLE IF EXISTS module",
            "DROP TABLE IF EXISTS function",
            r#"
            CREATE TABLE package (
                name TEXT PRIMARY KEY,
                summary TEXT,
                metadata TEXT,
                mtime INTEGER
            )
            "#,
            r#"
            CREATE TABLE function (
                package TEXT NOT NULL,
                name TEXT NOT NULL,
                summary TEXT,
                metadata TEXT,
                UNIQUE(package, name)
            )
            "#,
        ],
    },
    Migration {
        version: 3,
        statements: &[
            "ALTER TABLE package ADD COLUMN dist TEXT",
            "ALTER TABLE package ADD COLUMN extra TEXT",
            "ALTER TABLE function ADD COLUMN extra TEXT",
            "CREATE INDEX IF NOT EXISTS idx_package_dist ON package(dist)",
        ],
    },
    Migration {
        version: 4,
        statements: &["ALTER TABLE function ADD COLUMN dist TEXT"],
    },
    Migration {
        version: 5,
        statements: &[
            "ALTER TABLE function ADD COLUMN mtime INTEGER",
            "CREATE INDEX IF NOT EXISTS idx_function_name ON function(name)",
        ],
    },
];

/// The catalog's schema ladder
pub const CATALOG_SCHEMA: SchemaSpec = SchemaSpec {
    latest: LATEST_VERSION,
    install: INSTALL,
    upgrades: UPGRADES,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrate::{current_version, ensure_schema};
    use rusqlite::Connection;

    fn columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table)).unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    fn database_at(version: u32) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        for stmt in HISTORICAL_V1 {
            conn.execute_batch(stmt).unwrap();
        }
        for step in UPGRADES.iter().filter(|m| m.version <= version) {
            for stmt in step.statements {
                conn.execute_batch(stmt).unwrap();
            }
        }
        conn.execute_batch("CREATE TABLE schema_version (version INTEGER NOT NULL)").unwrap();
        conn.execute("INSERT INTO schema_version VALUES (?1)", [version]).unwrap();
        conn
    }

    #[test]
    fn test_ladder_is_contiguous() {
        let versions: Vec<u32> = UPGRADES.iter().map(|m| m.version).collect();
        assert_eq!(versions, (2..=LATEST_VERSION).collect::<Vec<_>>());
    }

    #[test]
    fn test_every_historical_version_reaches_install_layout() {
        let mut fresh = Connection::open_in_memory().unwrap();
        ensure_schema(&mut fresh, &CATALOG_SCHEMA).unwrap();
        let mut want_pkg = columns(&fresh, "package");
        let mut want_fn = columns(&fresh, "function");
        want_pkg.sort();
        want_fn.sort();

        for start in 1..LATEST_VERSION {
            let mut conn = database_at(start);
            assert_eq!(ensure_schema(&mut conn, &CATALOG_SCHEMA).unwrap(), LATEST_VERSION);
            assert_eq!(current_version(&conn).unwrap(), Some(LATEST_VERSION));

            let mut pkg = columns(&conn, "package");
            let mut func = columns(&conn, "function");
            pkg.sort();
            func.sort();
            assert_eq!(pkg, want_pkg, "package columns from v{start}");
            assert_eq!(func, want_fn, "function columns from v{start}");
        }
    }

    #[test]
    fn test_v1_module_table_is_gone_after_upgrade() {
        let mut conn = database_at(1);
        ensure_schema(&mut conn, &CATALOG_SCHEMA).unwrap();
        let modules: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'module'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(modules, 0);
    }

    #[test]
    fn test_additive_steps_keep_rows() {
        let mut conn = database_at(3);
        conn.execute(
            "INSERT INTO package (name, summary, dist) VALUES ('Demo::Foo', 'Does foo', 'Demo')",
            [],
        )
        .unwrap();
        ensure_schema(&mut conn, &CATALOG_SCHEMA).unwrap();
        let summary: String = conn
            .query_row("SELECT summary FROM package WHERE name = 'Demo::Foo'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(summary, "Does foo");
    }
}
