use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

const DATABASE_FILE: &str = "agent.db";

/// Handle to the on-disk key/value store shared by foreground commands and
/// background deliveries. Every call opens its own connection, so writes from
/// either context are atomic per key and never share in-memory state.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Open (and create if needed) the database inside `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        if let Err(e) = std::fs::create_dir_all(dir) {
            log::error!("Failed to create data directory at {:?}: {}", dir, e);
            return Err(Error::storage(format!("Failed to create data directory: {}", e)));
        }

        Self::at_path(dir.join(DATABASE_FILE))
    }

    pub fn at_path(path: PathBuf) -> Result<Self> {
        log::info!("Database path: {:?}", path);
        let db = Self { path };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME NOT NULL
            )",
            [],
        )?;

        log::debug!("Database schema ready");
        Ok(())
    }

    pub fn connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.connection()?;

        let value = conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            "INSERT OR REPLACE INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now()],
        )?;

        Ok(())
    }

    /// Value together with the time it was last written.
    pub fn get_entry(&self, key: &str) -> Result<Option<(String, DateTime<Utc>)>> {
        let conn = self.connection()?;

        let entry = conn
            .query_row(
                "SELECT value, updated_at FROM preferences WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, DateTime<Utc>>(1)?)),
            )
            .optional()?;

        Ok(entry)
    }

    /// Bumps `updated_at` only while the key still holds `value`. Returns
    /// whether the row was touched.
    pub fn touch(&self, key: &str, value: &str) -> Result<bool> {
        let conn = self.connection()?;

        let changed = conn.execute(
            "UPDATE preferences SET updated_at = ?3 WHERE key = ?1 AND value = ?2",
            params![key, value, Utc::now()],
        )?;

        Ok(changed > 0)
    }

    /// Removing a missing key is not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.connection()?;
        conn.execute("DELETE FROM preferences WHERE key = ?1", params![key])?;
        Ok(())
    }
}
