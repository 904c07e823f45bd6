//! Background task that periodically inserts a demo filing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::CoreResult;

/// Something that can store one new demo filing.
#[async_trait]
pub trait DemoReturnWriter: Send + Sync {
    /// Inserts a demo filing and returns its id.
    async fn write_demo_return(&self) -> CoreResult<String>;
}

/// When the scheduler fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Once a day at the given UTC wall-clock time.
    DailyAt(NaiveTime),
    /// At a fixed interval from start.
    Every(Duration),
}

impl Schedule {
    /// Daily at 00:00 UTC.
    pub const fn midnight() -> Self {
        Self::DailyAt(NaiveTime::MIN)
    }

    /// Time to wait from `now` until the next run. A daily run due exactly now is
    /// scheduled for tomorrow.
    pub fn delay_until_next(&self, now: DateTime<Utc>) -> Duration {
        match *self {
            Self::Every(interval) => interval,
            Self::DailyAt(time) => {
                let today = now.date_naive().and_time(time).and_utc();
                let next = if today > now { today } else { today + TimeDelta::days(1) };
                (next - now).to_std().unwrap_or(Duration::ZERO)
            }
        }
    }
}

/// Owns the periodic demo insertion task.
pub struct DemoReturnScheduler {
    writer: Arc<dyn DemoReturnWriter>,
    schedule: Schedule,
}

impl std::fmt::Debug for DemoReturnScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoReturnScheduler").field("schedule", &self.schedule).finish_non_exhaustive()
    }
}

impl DemoReturnScheduler {
    #[must_use]
    pub fn new(writer: Arc<dyn DemoReturnWriter>, schedule: Schedule) -> Self {
        Self { writer, schedule }
    }

    /// Spawns the scheduler loop and returns the handle that stops it.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let Self { writer, schedule } = self;

        let task = tokio::spawn(async move {
            info!(schedule = ?schedule, "Demo return scheduler started");

            loop {
                let delay = schedule.delay_until_next(Utc::now());
                debug!(delay_secs = delay.as_secs(), "Next demo return insertion scheduled");

                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        info!("Demo return scheduler shutdown signal received");
                        break;
                    }
                    () = tokio::time::sleep(delay) => {
                        match writer.write_demo_return().await {
                            Ok(return_id) => info!(return_id = %return_id, "Inserted scheduled demo return"),
                            Err(e) => error!(error = %e, "Scheduled demo return insertion failed"),
                        }
                    }
                }
            }

            info!("Demo return scheduler stopped");
        });

        SchedulerHandle { shutdown_tx, task }
    }
}

/// Stops a running scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signals the loop to stop and waits for it to exit. An in-flight insertion
    /// finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Demo return scheduler task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::storage::StorageError;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingWriter {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl DemoReturnWriter for CountingWriter {
        async fn write_demo_return(&self) -> CoreResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CoreError::Storage(StorageError::InvalidData("boom".to_string())));
            }
            Ok(format!("demo-{n}"))
        }
    }

    #[test]
    fn test_midnight_delay() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 23, 0, 0).unwrap();
        assert_eq!(Schedule::midnight().delay_until_next(now), Duration::from_secs(3600));
    }

    #[test]
    fn test_midnight_delay_at_exact_midnight_waits_a_day() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
        assert_eq!(Schedule::midnight().delay_until_next(now), Duration::from_secs(86_400));
    }

    #[test]
    fn test_fixed_interval_delay() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 13, 7, 0).unwrap();
        let schedule = Schedule::Every(Duration::from_secs(30));
        assert_eq!(schedule.delay_until_next(now), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_runs_repeatedly_until_shutdown() {
        let writer = Arc::new(CountingWriter::default());
        let handle =
            DemoReturnScheduler::new(writer.clone(), Schedule::Every(Duration::from_millis(10)))
                .start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown().await;

        let calls = writer.calls.load(Ordering::SeqCst);
        assert!(calls >= 2, "expected at least two runs, got {calls}");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(writer.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_loop() {
        let writer = Arc::new(CountingWriter { calls: AtomicUsize::new(0), fail: true });
        let handle =
            DemoReturnScheduler::new(writer.clone(), Schedule::Every(Duration::from_millis(10)))
                .start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown().await;

        assert!(writer.calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_shutdown_before_first_run() {
        let writer = Arc::new(CountingWriter::default());
        let handle = DemoReturnScheduler::new(writer.clone(), Schedule::midnight()).start();
        handle.shutdown().await;
        assert_eq!(writer.calls.load(Ordering::SeqCst), 0);
    }
}
