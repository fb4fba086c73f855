//! Schema definitions and migrations for the deletion tracker.

use rusqlite::Connection;

use super::error::TrackerError;

/// Current schema version. Increment when making schema changes.
pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS downloaded_photos (
    photo_id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    downloaded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_downloaded_filename ON downloaded_photos(filename);

CREATE TABLE IF NOT EXISTS deleted_photos (
    photo_id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    deleted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_deleted_filename ON deleted_photos(filename);
"#;

pub(crate) fn get_schema_version(conn: &Connection) -> Result<i32, TrackerError> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), TrackerError> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

/// Initializes or migrates the schema. Idempotent, safe on both new and
/// existing databases.
pub(crate) fn migrate(conn: &Connection) -> Result<(), TrackerError> {
    let current_version = get_schema_version(conn)?;

    if current_version > SCHEMA_VERSION {
        return Err(TrackerError::UnsupportedSchemaVersion {
            found: current_version,
            expected: SCHEMA_VERSION,
        });
    }

    if current_version < SCHEMA_VERSION {
        conn.execute_batch(SCHEMA_V1)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
        tracing::debug!("Initialized tracker schema at version {}", SCHEMA_VERSION);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_db_migrates() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn migration_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
        let result = migrate(&conn);
        assert!(matches!(
            result,
            Err(TrackerError::UnsupportedSchemaVersion { .. })
        ));
    }

    #[test]
    fn tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM downloaded_photos", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 0);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM deleted_photos", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
