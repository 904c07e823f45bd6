//! Database connection and schema management.

use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use crate::storage::error::StorageResult;

/// Database connection wrapper.
///
/// Manages the SQLite connection and creates the `returns` table on open.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database file, creating it when missing.
    ///
    /// # Errors
    /// * `StorageError::Connection` - If the connection or schema creation fails
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// # Errors
    /// * `StorageError::Connection` - If the connection or schema creation fails
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Gets a reference to the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Gets a mutable reference to the underlying connection.
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    fn init_schema(&self) -> StorageResult<()> {
        info!("Initializing database schema");

        self.conn.execute(
            r"
            CREATE TABLE IF NOT EXISTS returns (
                return_id TEXT PRIMARY KEY,
                filing_id TEXT NOT NULL,
                status TEXT NOT NULL,
                eta_date TEXT,
                confidence REAL NOT NULL,
                history_json TEXT NOT NULL,
                snap_context_json TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_returns_filing_id ON returns(filing_id)",
            [],
        )?;

        Ok(())
    }
}
