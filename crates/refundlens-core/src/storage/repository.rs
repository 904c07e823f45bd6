//! Repository for stored refund filings.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tracing::info;

use crate::filing::{FilingStatus, RefundReturn, StatusHistoryEntry};
use crate::storage::database::Database;
use crate::storage::error::{StorageError, StorageResult};

/// Repository trait for filing operations.
pub trait ReturnRepository {
    /// Stores a new filing.
    fn create(&mut self, record: &RefundReturn) -> StorageResult<()>;

    /// Retrieves a filing by its return id.
    fn get_by_id(&self, return_id: &str) -> StorageResult<RefundReturn>;

    /// Number of stored filings.
    fn count(&self) -> StorageResult<usize>;
}

/// SQLite implementation of `ReturnRepository`.
pub struct SqliteReturnRepository<'a> {
    db: &'a mut Database,
}

impl<'a> SqliteReturnRepository<'a> {
    /// Creates a new SQLite filing repository.
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }
}

const SELECT_COLUMNS: &str = "SELECT return_id, filing_id, status, eta_date, confidence, \
     history_json, snap_context_json, created_at FROM returns";

fn invalid_column(idx: usize, column_name: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(idx, column_name.to_string(), rusqlite::types::Type::Text)
}

fn parse_json_field<T>(row: &Row, idx: usize, column_name: &str) -> rusqlite::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let json_str: String = row.get(idx)?;
    serde_json::from_str(&json_str).map_err(|_| invalid_column(idx, column_name))
}

fn parse_timestamp(row: &Row, idx: usize, column_name: &str) -> rusqlite::Result<DateTime<Utc>> {
    let timestamp_str: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&timestamp_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid_column(idx, column_name))
}

fn parse_date(row: &Row, idx: usize, column_name: &str) -> rusqlite::Result<Option<NaiveDate>> {
    let date_str: Option<String> = row.get(idx)?;
    date_str
        .map(|s| s.parse::<NaiveDate>().map_err(|_| invalid_column(idx, column_name)))
        .transpose()
}

fn parse_status(row: &Row, idx: usize) -> rusqlite::Result<FilingStatus> {
    let status: String = row.get(idx)?;
    status.parse().map_err(|_| invalid_column(idx, "status"))
}

fn map_row(row: &Row) -> rusqlite::Result<RefundReturn> {
    let history: Vec<StatusHistoryEntry> = parse_json_field(row, 5, "history_json")?;
    Ok(RefundReturn {
        return_id: row.get(0)?,
        filing_id: row.get(1)?,
        status: parse_status(row, 2)?,
        eta_date: parse_date(row, 3, "eta_date")?,
        confidence: row.get(4)?,
        history,
        snap_context: parse_json_field(row, 6, "snap_context_json")?,
        created_at: parse_timestamp(row, 7, "created_at")?,
    })
}

impl ReturnRepository for SqliteReturnRepository<'_> {
    fn create(&mut self, record: &RefundReturn) -> StorageResult<()> {
        if !(0.0..=1.0).contains(&record.confidence) {
            return Err(StorageError::InvalidData(format!(
                "confidence {} is outside [0, 1]",
                record.confidence
            )));
        }
        let history_json = serde_json::to_string(&record.history)?;
        let snap_context_json = serde_json::to_string(&record.snap_context)?;
        self.db.conn_mut().execute(
            "INSERT INTO returns (return_id, filing_id, status, eta_date, confidence, history_json, snap_context_json, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.return_id,
                record.filing_id,
                record.status.as_str(),
                record.eta_date.map(|d| d.to_string()),
                record.confidence,
                history_json,
                snap_context_json,
                record.created_at.to_rfc3339()
            ],
        )?;
        info!(return_id = %record.return_id, status = %record.status, "Created filing");
        Ok(())
    }

    fn get_by_id(&self, return_id: &str) -> StorageResult<RefundReturn> {
        let mut stmt = self.db.conn().prepare(&format!("{SELECT_COLUMNS} WHERE return_id = ?1"))?;
        stmt.query_row(params![return_id], map_row)
            .optional()?
            .ok_or_else(|| StorageError::NotFound(format!("returns with id {return_id} not found")))
    }

    fn count(&self) -> StorageResult<usize> {
        let count: i64 =
            self.db.conn().query_row("SELECT COUNT(*) FROM returns", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|e| StorageError::InvalidData(e.to_string()))
    }
}
