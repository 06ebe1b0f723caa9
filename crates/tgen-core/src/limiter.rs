//! Token-bucket rate limiter for a single transfer.
//!
//! The bucket holds at most one second's worth of bytes and starts full.
//! `consume_until` debits first and then sleeps off any deficit, so a chunk larger
//! than the bucket is still granted, just later. It blocks the calling
//! thread; call it from the transfer's blocking worker, never from an async task.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Longest single sleep in [`RateLimiter::consume_until`] before the cancel
/// token is checked again.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Bytes per second for a speed given in (decimal) megabits per second.
pub fn mbps_to_bytes_per_sec(mbps: f64) -> u64 {
    if !(mbps > 0.0) {
        return 0;
    }
    (mbps * 1_000_000.0 / 8.0).round() as u64
}

#[derive(Debug)]
struct Bucket {
    /// Available tokens; negative while a granted request is still being paid off.
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    bytes_per_sec: u64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Limiter for `bytes_per_sec` with a burst of one second. Zero means unlimited.
    pub fn new(bytes_per_sec: u64) -> Self {
        Self {
            bytes_per_sec,
            bucket: Mutex::new(Bucket {
                tokens: bytes_per_sec as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn from_mbps(mbps: f64) -> Self {
        Self::new(mbps_to_bytes_per_sec(mbps))
    }

    pub fn bytes_per_sec(&self) -> u64 {
        self.bytes_per_sec
    }

    /// Bucket capacity in bytes.
    pub fn burst(&self) -> u64 {
        self.bytes_per_sec
    }

    /// Blocks until `bytes` tokens have been debited, sleeping in short slices
    /// so that `cancel` is noticed. Returns `false` if it was cancelled first.
    pub fn consume_until(&self, bytes: u64, cancel: &CancellationToken) -> bool {
        let deadline = Instant::now() + self.reserve(bytes);
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return true;
            }
            std::thread::sleep(left.min(CANCEL_POLL));
        }
    }

    /// Debits `bytes` and returns how long the caller must wait before the
    /// debit is covered.
    fn reserve(&self, bytes: u64) -> Duration {
        if bytes == 0 || self.bytes_per_sec == 0 {
            return Duration::ZERO;
        }
        let rate = self.bytes_per_sec as f64;
        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * rate).min(rate);
        bucket.last_refill = now;
        bucket.tokens -= bytes as f64;
        if bucket.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-bucket.tokens / rate)
        }
    }
}
