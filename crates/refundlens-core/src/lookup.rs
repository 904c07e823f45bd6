//! Read-only filing status lookup consumed by the explanation pipeline.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::filing::FilingStatusSnapshot;

/// Why a status lookup produced no snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No filing has the requested id.
    #[error("filing {0} not found")]
    NotFound(String),

    /// The backing store failed.
    #[error("filing lookup failed: {0}")]
    Backend(String),
}

/// Fetches the current status of a filing by id.
#[async_trait]
pub trait FilingLookup: Send + Sync {
    /// Returns a fresh snapshot for `filing_id`.
    ///
    /// # Errors
    /// `LookupError::NotFound` for unknown ids, `LookupError::Backend` for store failures.
    async fn fetch_status(&self, filing_id: &str) -> Result<FilingStatusSnapshot, LookupError>;
}

/// Lookup over a fixed set of snapshots.
#[derive(Debug, Clone, Default)]
pub struct StaticFilingLookup {
    snapshots: HashMap<String, FilingStatusSnapshot>,
}

impl StaticFilingLookup {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_snapshot(mut self, filing_id: impl Into<String>, snapshot: FilingStatusSnapshot) -> Self {
        self.snapshots.insert(filing_id.into(), snapshot);
        self
    }
}

#[async_trait]
impl FilingLookup for StaticFilingLookup {
    async fn fetch_status(&self, filing_id: &str) -> Result<FilingStatusSnapshot, LookupError> {
        self.snapshots
            .get(filing_id)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(filing_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filing::FilingStatus;

    #[tokio::test]
    async fn test_static_lookup() {
        let snapshot = FilingStatusSnapshot::new(FilingStatus::Review, 0.5);
        let lookup = StaticFilingLookup::new().with_snapshot("abc", snapshot.clone());

        assert_eq!(lookup.fetch_status("abc").await, Ok(snapshot));
        assert_eq!(lookup.fetch_status("xyz").await, Err(LookupError::NotFound("xyz".to_string())));
    }
}
