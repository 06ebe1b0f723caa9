//! Hourly traffic accounting.
//!
//! Sleeps until the next wall-clock hour, flushes the byte counter and appends
//! one line to the traffic log. The wait is recomputed every cycle so the
//! schedule stays aligned to hour boundaries.

mod rotate;

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::stats::TrafficStats;

pub use rotate::{rotated_path, RotatingLog, ROTATE_AFTER_LINES};

const BYTES_PER_MB: f64 = 1_048_576.0;

/// `[YYYY-MM-DD HH:MM:SS] Hourly traffic: <MB> MB`
pub fn format_line<Tz: TimeZone>(at: &DateTime<Tz>, bytes: u64) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "[{}] Hourly traffic: {:.2} MB",
        at.format("%Y-%m-%d %H:%M:%S"),
        bytes as f64 / BYTES_PER_MB
    )
}

/// Time left until the next full hour. Always in `(0, 1h]`.
pub fn until_next_hour<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    let into_hour = Duration::from_secs(now.timestamp().rem_euclid(3600) as u64)
        + Duration::from_nanos(u64::from(now.timestamp_subsec_nanos().min(999_999_999)));
    Duration::from_secs(3600).saturating_sub(into_hour)
}

/// Flushes `stats` into a [`RotatingLog`] once per hour.
pub struct HourlyLogger {
    log: RotatingLog,
    stats: Arc<TrafficStats>,
}

impl HourlyLogger {
    pub fn new(path: impl Into<PathBuf>, stats: Arc<TrafficStats>) -> Self {
        Self {
            log: RotatingLog::new(path),
            stats,
        }
    }

    /// One cycle: flush the counter and append the line stamped `at`.
    /// Returns the bytes that were flushed.
    pub fn record<Tz: TimeZone>(&mut self, at: &DateTime<Tz>) -> Result<u64>
    where
        Tz::Offset: std::fmt::Display,
    {
        let bytes = self.stats.flush();
        self.log.append_line(&format_line(at, bytes))?;
        Ok(bytes)
    }

    /// Runs until `shutdown` is cancelled, writing once per wall-clock hour.
    /// Write failures are logged and the cycle is skipped.
    pub async fn run(self, shutdown: CancellationToken) {
        self.run_with(shutdown, || tokio::time::sleep(until_next_hour(&Local::now())))
            .await
    }

    /// [`run`](Self::run) with the wait before each cycle supplied by `wait`.
    pub async fn run_with<W, Fut>(mut self, shutdown: CancellationToken, mut wait: W)
    where
        W: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        tracing::debug!(path = %self.log.path().display(), "hourly logger started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = wait() => {}
            }
            match self.record(&Local::now()) {
                Ok(bytes) => tracing::debug!(bytes, "hourly traffic recorded"),
                Err(e) => tracing::warn!("traffic log write failed: {:#}", e),
            }
        }
        tracing::debug!("hourly logger stopped");
    }
}
