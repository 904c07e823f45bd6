//! Async handle over the SQLite filing repository.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::filing::{FilingStatusSnapshot, RefundReturn};
use crate::lookup::{FilingLookup, LookupError};
use crate::scheduler::DemoReturnWriter;
use crate::storage::database::Database;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::repository::{ReturnRepository, SqliteReturnRepository};

/// Shared, cloneable filing store.
///
/// SQLite calls run on the blocking pool; the connection is guarded by a mutex
/// held only for the duration of one statement.
#[derive(Clone)]
pub struct ReturnStore {
    db: Arc<Mutex<Database>>,
}

impl std::fmt::Debug for ReturnStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReturnStore").finish_non_exhaustive()
    }
}

impl ReturnStore {
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(Mutex::new(db)) }
    }

    /// Opens a file-backed store, or an in-memory one when `path` is `None`.
    ///
    /// # Errors
    /// Returns a `StorageError` if the database cannot be opened.
    pub fn open(path: Option<&std::path::Path>) -> StorageResult<Self> {
        let db = match path {
            Some(path) => Database::open(path)?,
            None => Database::open_in_memory()?,
        };
        Ok(Self::new(db))
    }

    async fn with_repository<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteReturnRepository<'_>) -> StorageResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut guard =
                db.lock().map_err(|_| StorageError::Task("database mutex poisoned".to_string()))?;
            let mut repo = SqliteReturnRepository::new(&mut guard);
            op(&mut repo)
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }

    /// Loads the full record for `return_id`.
    ///
    /// # Errors
    /// `StorageError::NotFound` for unknown ids, other variants for database failures.
    pub async fn get_return(&self, return_id: &str) -> StorageResult<RefundReturn> {
        let return_id = return_id.to_string();
        self.with_repository(move |repo| repo.get_by_id(&return_id)).await
    }

    /// Stores a record.
    ///
    /// # Errors
    /// Returns a `StorageError` if the insert fails.
    pub async fn insert(&self, record: RefundReturn) -> StorageResult<()> {
        self.with_repository(move |repo| repo.create(&record)).await
    }

    /// Inserts a fresh demo filing and returns its id.
    ///
    /// # Errors
    /// Returns a `StorageError` if the insert fails.
    pub async fn insert_demo_return(&self) -> StorageResult<String> {
        let record = RefundReturn::demo(Utc::now());
        let return_id = record.return_id.clone();
        self.insert(record).await?;
        Ok(return_id)
    }

    /// Number of stored filings.
    ///
    /// # Errors
    /// Returns a `StorageError` if the query fails.
    pub async fn count(&self) -> StorageResult<usize> {
        self.with_repository(|repo| repo.count()).await
    }
}

#[async_trait]
impl FilingLookup for ReturnStore {
    async fn fetch_status(&self, filing_id: &str) -> Result<FilingStatusSnapshot, LookupError> {
        match self.get_return(filing_id).await {
            Ok(record) => {
                debug!(filing_id = %filing_id, status = %record.status, "Fetched filing status");
                Ok(record.snapshot())
            }
            Err(StorageError::NotFound(_)) => Err(LookupError::NotFound(filing_id.to_string())),
            Err(e) => {
                debug!(filing_id = %filing_id, error = %e, "Filing status query failed");
                Err(LookupError::Backend(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl DemoReturnWriter for ReturnStore {
    async fn write_demo_return(&self) -> CoreResult<String> {
        self.insert_demo_return().await.map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filing::FilingStatus;

    #[tokio::test]
    async fn test_demo_insert_is_fetchable() {
        let store = ReturnStore::open(None).unwrap();
        let id = store.insert_demo_return().await.unwrap();

        let snapshot = store.fetch_status(&id).await.unwrap();
        assert_eq!(snapshot.status(), FilingStatus::Approved);
        assert_eq!(snapshot.confidence_percent(), 94);
        assert_eq!(snapshot.history_len(), 2);
        assert!(snapshot.estimated_date().is_some());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = ReturnStore::open(None).unwrap();
        assert_eq!(
            store.fetch_status("missing").await,
            Err(LookupError::NotFound("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_query_failure_is_backend_error() {
        let store = ReturnStore::open(None).unwrap();
        store.db.lock().unwrap().conn().execute_batch("DROP TABLE returns").unwrap();

        assert!(matches!(store.fetch_status("any").await, Err(LookupError::Backend(_))));
    }

    #[tokio::test]
    async fn test_clones_share_one_database() {
        let store = ReturnStore::open(None).unwrap();
        let other = store.clone();
        other.write_demo_return().await.unwrap();
        other.write_demo_return().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
