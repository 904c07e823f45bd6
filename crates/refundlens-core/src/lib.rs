//! Core domain for refundlens.
//!
//! Filing records and status snapshots, the `FilingLookup` seam used by the
//! explanation pipeline, layered configuration, SQLite storage, and the demo
//! filing scheduler.

pub mod config;
pub mod error;
pub mod filing;
pub mod lookup;
pub mod scheduler;
pub mod storage;

pub use config::{
    AiConfig, Config, ConfigError, DatabaseConfig, LogConfig, PacingConfig, SchedulerConfig,
    ServerConfig,
};
pub use error::{CoreError, CoreResult};
pub use filing::{FilingStatus, FilingStatusSnapshot, RefundReturn, StatusHistoryEntry, UnknownStatus};
pub use lookup::{FilingLookup, LookupError, StaticFilingLookup};
pub use scheduler::{DemoReturnScheduler, DemoReturnWriter, Schedule, SchedulerHandle};
pub use storage::{ReturnStore, StorageError};
