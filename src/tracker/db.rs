//! Deletion tracker trait and SQLite implementation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use super::error::TrackerError;
use super::schema;

/// Row counts for the two tracked tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub downloaded: u64,
    pub deleted: u64,
}

/// Persistent record of what was downloaded and what the user has since
/// deleted locally. Object-safe so the engine can hold `Arc<dyn DeletionTracker>`.
#[async_trait]
pub trait DeletionTracker: Send + Sync {
    /// Whether this photo was previously deleted locally and must not be
    /// downloaded again.
    async fn is_deleted(&self, photo_id: &str) -> Result<bool, TrackerError>;

    /// Records a completed download. Upserts on repeated syncs.
    async fn record_download(&self, photo_id: &str, filename: &str) -> Result<(), TrackerError>;

    /// Moves every downloaded photo whose file is no longer present locally
    /// into the deleted set. Returns how many were marked.
    async fn mark_missing_as_deleted(
        &self,
        local_filenames: &HashSet<String>,
    ) -> Result<u64, TrackerError>;

    async fn stats(&self) -> Result<TrackerStats, TrackerError>;

    /// Runs SQLite's integrity check; `true` means the database is sound.
    async fn integrity_check(&self) -> Result<bool, TrackerError>;

    /// Writes a compacted copy of the database next to the original.
    async fn create_backup(&self) -> Result<(), TrackerError>;

    /// Replaces all rows with the last backup's contents. Returns `false`
    /// when no backup exists.
    async fn restore_from_backup(&self) -> Result<bool, TrackerError>;
}

/// SQLite implementation of the deletion tracker.
pub struct SqliteTracker {
    /// Wrapped in Mutex because rusqlite::Connection is not Sync. Guards are
    /// always dropped before any await point.
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTracker")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteTracker {
    /// Opens or creates the database at the given path.
    pub async fn open(path: &Path) -> Result<Self, TrackerError> {
        let path = path.to_path_buf();
        let path_clone = path.clone();

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path_clone).map_err(|e| TrackerError::Open {
                path: path_clone.clone(),
                source: e,
            })?;

            // WAL keeps readers unblocked during maintenance writes; NORMAL
            // synchronous is still durable under WAL.
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(TrackerError::Migration)?;
            conn.pragma_update(None, "synchronous", "NORMAL")
                .map_err(TrackerError::Migration)?;

            schema::migrate(&conn)?;

            Ok::<_, TrackerError>(conn)
        })
        .await??;

        debug!("Deletion tracker ready at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Opens an in-memory database (for testing).
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, TrackerError> {
        let conn = Connection::open_in_memory().map_err(|e| TrackerError::Open {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, TrackerError> {
        self.conn
            .lock()
            .map_err(|_| TrackerError::Query("tracker lock poisoned".to_string()))
    }

    fn backup_path(&self) -> PathBuf {
        match self.path.file_name() {
            Some(name) => {
                let mut backup = name.to_os_string();
                backup.push(".backup");
                self.path.with_file_name(backup)
            }
            None => self.path.with_extension("backup"),
        }
    }
}

#[async_trait]
impl DeletionTracker for SqliteTracker {
    async fn is_deleted(&self, photo_id: &str) -> Result<bool, TrackerError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached("SELECT 1 FROM deleted_photos WHERE photo_id = ?1")
            .map_err(TrackerError::query)?;
        let found = stmt
            .query_row([photo_id], |_row| Ok(()))
            .optional()
            .map_err(TrackerError::query)?;
        Ok(found.is_some())
    }

    async fn record_download(&self, photo_id: &str, filename: &str) -> Result<(), TrackerError> {
        let downloaded_at = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.prepare_cached(
            "INSERT INTO downloaded_photos (photo_id, filename, downloaded_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(photo_id) DO UPDATE SET
                 filename = excluded.filename,
                 downloaded_at = excluded.downloaded_at",
        )
        .map_err(TrackerError::query)?
        .execute(params![photo_id, filename, downloaded_at])
        .map_err(TrackerError::query)?;
        Ok(())
    }

    async fn mark_missing_as_deleted(
        &self,
        local_filenames: &HashSet<String>,
    ) -> Result<u64, TrackerError> {
        let conn = self.lock()?;

        let rows: Vec<(String, String)> = {
            let mut stmt = conn
                .prepare_cached("SELECT photo_id, filename FROM downloaded_photos")
                .map_err(TrackerError::query)?;
            let mapped = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(TrackerError::query)?;
            mapped
                .collect::<Result<Vec<_>, _>>()
                .map_err(TrackerError::query)?
        };

        let missing: Vec<(String, String)> = rows
            .into_iter()
            .filter(|(_, filename)| !local_filenames.contains(filename))
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }

        let deleted_at = Utc::now().to_rfc3339();
        conn.execute_batch("BEGIN").map_err(TrackerError::query)?;
        let result = (|| -> Result<(), rusqlite::Error> {
            let mut insert = conn.prepare_cached(
                "INSERT INTO deleted_photos (photo_id, filename, deleted_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(photo_id) DO NOTHING",
            )?;
            let mut delete =
                conn.prepare_cached("DELETE FROM downloaded_photos WHERE photo_id = ?1")?;
            for (photo_id, filename) in &missing {
                insert.execute(params![photo_id, filename, deleted_at])?;
                delete.execute([photo_id])?;
            }
            Ok(())
        })();
        match result {
            Ok(()) => conn.execute_batch("COMMIT").map_err(TrackerError::query)?,
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(TrackerError::query(e));
            }
        }

        info!("Marked {} photos as locally deleted", missing.len());
        Ok(missing.len() as u64)
    }

    async fn stats(&self) -> Result<TrackerStats, TrackerError> {
        let conn = self.lock()?;
        let downloaded: i64 = conn
            .query_row("SELECT COUNT(*) FROM downloaded_photos", [], |row| {
                row.get(0)
            })
            .map_err(TrackerError::query)?;
        let deleted: i64 = conn
            .query_row("SELECT COUNT(*) FROM deleted_photos", [], |row| row.get(0))
            .map_err(TrackerError::query)?;
        Ok(TrackerStats {
            downloaded: downloaded as u64,
            deleted: deleted as u64,
        })
    }

    async fn integrity_check(&self) -> Result<bool, TrackerError> {
        let conn = self.lock()?;
        let verdict: String = conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .map_err(TrackerError::query)?;
        Ok(verdict == "ok")
    }

    async fn create_backup(&self) -> Result<(), TrackerError> {
        let backup = self.backup_path();
        // VACUUM INTO refuses to overwrite, so clear the previous backup.
        let _ = std::fs::remove_file(&backup);

        let conn = self.lock()?;
        conn.execute(
            "VACUUM INTO ?1",
            params![backup.to_string_lossy().into_owned()],
        )
        .map_err(TrackerError::query)?;
        debug!("Tracker backup written to {}", backup.display());
        Ok(())
    }

    async fn restore_from_backup(&self) -> Result<bool, TrackerError> {
        let backup = self.backup_path();
        if !backup.exists() {
            warn!("No tracker backup found at {}", backup.display());
            return Ok(false);
        }

        let conn = self.lock()?;
        conn.execute(
            "ATTACH DATABASE ?1 AS backup",
            params![backup.to_string_lossy().into_owned()],
        )
        .map_err(TrackerError::query)?;

        let copied = conn.execute_batch(
            "BEGIN;
             DELETE FROM main.downloaded_photos;
             INSERT INTO main.downloaded_photos SELECT * FROM backup.downloaded_photos;
             DELETE FROM main.deleted_photos;
             INSERT INTO main.deleted_photos SELECT * FROM backup.deleted_photos;
             COMMIT;",
        );
        if copied.is_err() {
            let _ = conn.execute_batch("ROLLBACK");
        }
        let detached = conn.execute_batch("DETACH DATABASE backup");

        copied.map_err(TrackerError::query)?;
        detached.map_err(TrackerError::query)?;
        debug!("Tracker restored from {}", backup.display());
        Ok(true)
    }
}
