//! Versioned schema for the run store
//!
//! Each entry in [`MIGRATIONS`] is applied once, in order. The applied
//! version is tracked in `schema_migrations`, which the first migration
//! creates.

use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database was written by a newer mvnspy
    #[error("Run store schema v{found} is newer than this build (v{supported})")]
    TooNew { found: i32, supported: i32 },
}

/// Newest schema version this build writes
pub const CURRENT_VERSION: i32 = 1;

/// One schema step
pub struct Migration {
    pub version: i32,
    pub name: &'static str,
    /// SQL batch applying the step
    pub up: &'static str,
}

/// Schema steps, oldest first
pub static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "run_artifacts_and_fingerprints",
    up: include_str!("schema.sql"),
}];

/// Applied schema version; 0 for a fresh database
///
/// # Errors
///
/// Returns an error if SQLite cannot be queried.
pub fn get_version(conn: &Connection) -> Result<i32, MigrationError> {
    let tracked = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'",
            [],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !tracked {
        return Ok(0);
    }
    let version = conn.query_row("SELECT IFNULL(MAX(version), 0) FROM schema_migrations", [], |row| {
        row.get(0)
    })?;
    Ok(version)
}

/// Bring the schema up to [`CURRENT_VERSION`]
///
/// Returns the versions that were applied by this call.
///
/// # Errors
///
/// Fails on a SQL error, or with [`MigrationError::TooNew`] when the
/// database is ahead of this build.
pub fn migrate(conn: &Connection) -> Result<Vec<i32>, MigrationError> {
    let found = get_version(conn)?;
    if found > CURRENT_VERSION {
        return Err(MigrationError::TooNew {
            found,
            supported: CURRENT_VERSION,
        });
    }

    MIGRATIONS
        .iter()
        .skip_while(|m| m.version <= found)
        .map(|m| -> Result<i32, MigrationError> {
            debug!(version = m.version, name = m.name, "Applying run store migration");
            conn.execute_batch(m.up)?;
            Ok(m.version)
        })
        .collect()
}

/// True when no migration is pending
#[must_use]
pub fn is_up_to_date(conn: &Connection) -> bool {
    matches!(get_version(conn), Ok(v) if v >= CURRENT_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn fresh() -> Connection {
        Connection::open_in_memory().expect("in-memory sqlite")
    }

    #[test]
    fn test_fresh_database_has_no_version() {
        let conn = fresh();
        assert_eq!(get_version(&conn).expect("version"), 0);
        assert!(!is_up_to_date(&conn));
    }

    #[test]
    fn test_migrate_creates_store_tables() {
        let conn = fresh();
        assert_eq!(migrate(&conn).expect("migrate"), vec![1]);
        assert!(is_up_to_date(&conn));

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('run_artifacts', 'fingerprints') ORDER BY name")
            .expect("prepare")
            .query_map([], |row| row.get(0))
            .expect("query")
            .collect::<Result<_, _>>()
            .expect("rows");
        assert_eq!(tables, vec!["fingerprints".to_string(), "run_artifacts".to_string()]);
    }

    #[test]
    fn test_second_migrate_is_a_no_op() {
        let conn = fresh();
        migrate(&conn).expect("first");
        assert_eq!(migrate(&conn).expect("second"), Vec::<i32>::new());
    }

    #[test]
    fn test_newer_database_is_rejected() {
        let conn = fresh();
        migrate(&conn).expect("migrate");
        conn.execute("INSERT INTO schema_migrations (version) VALUES (99)", [])
            .expect("insert");
        assert!(matches!(
            migrate(&conn),
            Err(MigrationError::TooNew { found: 99, supported: CURRENT_VERSION })
        ));
    }

    #[test]
    fn test_last_migration_is_current() {
        assert!(MIGRATIONS.windows(2).all(|w| w[0].version < w[1].version));
        assert_eq!(MIGRATIONS.last().map(|m| m.version), Some(CURRENT_VERSION));
    }
}
