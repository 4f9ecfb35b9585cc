//! SQLite database layer backing the agent registry.
//!
//! Uses rusqlite with WAL mode for on-disk databases. All statements from
//! async code run via `tokio::task::spawn_blocking` so the runtime is never
//! blocked, and the connection sits behind a mutex so concurrent
//! registrations are serialized.

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, thiserror::Error)]
#[error("Database error: {0}")]
pub struct DbError(pub String);

/// Thread-safe handle to the SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a SQLite database at the given path.
    ///
    /// `":memory:"` is accepted and behaves like [`Database::open_in_memory`].
    pub fn open(db_path: &str) -> Result<Self, DbError> {
        if db_path == ":memory:" {
            return Self::open_in_memory();
        }

        let path = Path::new(db_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DbError(format!("Failed to create database dir: {}", e)))?;
            }
        }

        let conn = Connection::open(db_path)
            .map_err(|e| DbError(format!("Failed to open database: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| DbError(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_tables()?;

        tracing::info!("SQLite database opened at: {}", db_path);
        Ok(db)
    }

    /// Open an in-memory database (one isolated instance per call).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DbError(format!("Failed to open in-memory db: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_tables()?;
        Ok(db)
    }

    /// Execute a closure with access to the database connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError(format!("Lock poisoned: {}", e)))?;
        f(&conn).map_err(|e| DbError(e.to_string()))
    }

    /// Execute a closure with access to the database connection (async-friendly).
    pub async fn with_conn_async<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| DbError(format!("Task join error: {}", e)))?
    }

    fn initialize_tables(&self) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS agents (
                    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
                    id              TEXT NOT NULL UNIQUE,
                    name            TEXT NOT NULL,
                    role            TEXT NOT NULL,
                    description     TEXT NOT NULL DEFAULT '',
                    provider        TEXT NOT NULL,
                    model           TEXT NOT NULL,
                    temperature     REAL NOT NULL,
                    tools           TEXT NOT NULL DEFAULT '[]',
                    created_at      INTEGER NOT NULL
                );
                ",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_on_disk_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("troupe.db");
        let db = Database::open(path.to_str().unwrap()).unwrap();
        let count: i64 = db
            .with_conn(|conn| conn.query_row("SELECT COUNT(*) FROM agents", [], |row| row.get(0)))
            .unwrap();
        assert_eq!(count, 0);
        assert!(path.exists());
    }
}
