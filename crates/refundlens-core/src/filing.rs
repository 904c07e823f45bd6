//! Filing records and the read-only status snapshot handed to the explanation pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Processing stage of a tax-refund filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilingStatus {
    /// Submitted, not yet acknowledged.
    Filed,
    /// Acknowledged by the tax authority.
    Accepted,
    /// Refund amount approved.
    Approved,
    /// Refund payment issued.
    Sent,
    /// Held for additional review.
    Review,
    /// Refund received.
    Completed,
}

impl FilingStatus {
    /// All statuses in processing order.
    pub const ALL: [Self; 6] =
        [Self::Filed, Self::Accepted, Self::Approved, Self::Sent, Self::Review, Self::Completed];

    /// Wire name of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Filed => "FILED",
            Self::Accepted => "ACCEPTED",
            Self::Approved => "APPROVED",
            Self::Sent => "SENT",
            Self::Review => "REVIEW",
            Self::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status string is not one of the known stages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown filing status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for FilingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// One transition in a filing's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    /// Stage name at the time of the transition.
    pub stage: String,
    /// When the filing entered the stage.
    pub timestamp: DateTime<Utc>,
}

impl StatusHistoryEntry {
    pub fn new(stage: FilingStatus, timestamp: DateTime<Utc>) -> Self {
        Self { stage: stage.as_str().to_string(), timestamp }
    }
}

/// A stored refund filing as exposed by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundReturn {
    pub return_id: String,
    pub filing_id: String,
    pub status: FilingStatus,
    pub eta_date: Option<NaiveDate>,
    pub confidence: f64,
    pub history: Vec<StatusHistoryEntry>,
    pub snap_context: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl RefundReturn {
    /// The demo filing inserted by the scheduler and the manual insert endpoint:
    /// approved with 94% confidence, due ten days out, filed now and accepted a day later.
    pub fn demo(now: DateTime<Utc>) -> Self {
        Self {
            return_id: Uuid::new_v4().to_string(),
            filing_id: Uuid::new_v4().to_string(),
            status: FilingStatus::Approved,
            eta_date: Some(now.date_naive() + Duration::days(10)),
            confidence: 0.94,
            history: vec![
                StatusHistoryEntry::new(FilingStatus::Filed, now),
                StatusHistoryEntry::new(FilingStatus::Accepted, now + Duration::hours(24)),
            ],
            snap_context: serde_json::json!({}),
            created_at: now,
        }
    }

    /// Point-in-time snapshot of this filing for one explanation request.
    pub fn snapshot(&self) -> FilingStatusSnapshot {
        FilingStatusSnapshot::new(self.status, self.confidence)
            .with_estimated_date(self.eta_date)
            .with_history_len(self.history.len())
    }
}

/// Immutable status read used as context for one explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingStatusSnapshot {
    status: FilingStatus,
    confidence: f64,
    estimated_date: Option<NaiveDate>,
    history_len: usize,
}

impl FilingStatusSnapshot {
    /// Creates a snapshot; confidence is clamped into `[0, 1]` and non-finite values become 0.
    pub fn new(status: FilingStatus, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };
        Self { status, confidence, estimated_date: None, history_len: 0 }
    }

    #[must_use]
    pub fn with_estimated_date(mut self, date: Option<NaiveDate>) -> Self {
        self.estimated_date = date;
        self
    }

    #[must_use]
    pub fn with_history_len(mut self, history_len: usize) -> Self {
        self.history_len = history_len;
        self
    }

    pub fn status(&self) -> FilingStatus {
        self.status
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Confidence as a whole percentage, rounded to the nearest integer with ties to even.
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence * 100.0).round_ties_even() as u32
    }

    pub fn estimated_date(&self) -> Option<NaiveDate> {
        self.estimated_date
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }
}
