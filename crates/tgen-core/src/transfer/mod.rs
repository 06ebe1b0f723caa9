//! One synthetic download: GET an endpoint at a sampled speed and count the bytes.
//!
//! The curl transfer runs on a blocking thread (`spawn_blocking`) because the
//! rate limiter sleeps the thread it runs on. The async side owns the
//! admission slot and the byte report, so both happen exactly once whether
//! the transfer succeeds, fails, or its worker panics. Cancelling the token
//! passed in aborts the curl transfer, so shutdown never waits on a slow peer.

mod error;
mod fetch;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::admission::AdmissionSlot;
use crate::limiter::RateLimiter;
use crate::stats::TrafficStats;

pub use error::TransferError;
pub use fetch::{browser_headers, fetch_discard, USER_AGENT};

/// What a finished transfer reports back.
#[derive(Debug)]
pub struct TransferOutcome {
    pub url: String,
    /// Bytes received, including those read before an error.
    pub bytes: u64,
    pub elapsed: Duration,
    pub result: Result<(), TransferError>,
}

impl TransferOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs one transfer of `url` shaped by `limiter`, adds the bytes read to
/// `stats`, then drops `slot`. Ends early with `Cancelled` once `cancel` fires.
pub async fn run_transfer(
    url: String,
    limiter: RateLimiter,
    stats: Arc<TrafficStats>,
    slot: AdmissionSlot,
    cancel: CancellationToken,
) -> TransferOutcome {
    run_transfer_with(url, limiter, stats, slot, cancel, fetch_discard).await
}

/// [`run_transfer`] with the blocking body supplied by the caller.
pub(crate) async fn run_transfer_with<F>(
    url: String,
    limiter: RateLimiter,
    stats: Arc<TrafficStats>,
    slot: AdmissionSlot,
    cancel: CancellationToken,
    body: F,
) -> TransferOutcome
where
    F: FnOnce(&str, &RateLimiter, &AtomicU64, &CancellationToken) -> Result<(), TransferError>
        + Send
        + 'static,
{
    let _slot = slot;
    let start = Instant::now();
    let mbps = limiter.bytes_per_sec() as f64 * 8.0 / 1_000_000.0;
    tracing::info!(url = %url, "start @ {:.1} Mbps", mbps);

    let received = Arc::new(AtomicU64::new(0));
    let worker = {
        let url = url.clone();
        let received = Arc::clone(&received);
        tokio::task::spawn_blocking(move || {
            body(url.as_str(), &limiter, received.as_ref(), &cancel)
        })
    };
    let result = match worker.await {
        Ok(res) => res,
        Err(join_err) => Err(TransferError::from_join(join_err)),
    };

    let bytes = received.load(Ordering::Relaxed);
    stats.add(bytes);
    let elapsed = start.elapsed();

    match &result {
        Ok(()) => tracing::info!(url = %url, bytes, ?elapsed, "done"),
        Err(e) => tracing::warn!(url = %url, bytes, ?elapsed, "transfer error: {}", e),
    }

    TransferOutcome {
        url,
        bytes,
        elapsed,
        result,
    }
}
