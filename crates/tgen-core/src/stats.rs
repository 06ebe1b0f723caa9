//! Byte counter shared by transfers and the hourly logger.

use std::sync::Mutex;

/// Bytes downloaded since the last flush. Share it as `Arc<TrafficStats>`;
/// transfers `add`, the hourly logger `flush`es.
#[derive(Debug, Default)]
pub struct TrafficStats {
    bytes: Mutex<u64>,
}

impl TrafficStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, bytes: u64) {
        let mut total = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        *total = total.saturating_add(bytes);
    }

    /// Returns the bytes accumulated since the previous flush and resets the counter to zero.
    pub fn flush(&self) -> u64 {
        let mut total = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *total)
    }

    /// Current value without resetting.
    pub fn peek(&self) -> u64 {
        *self.bytes.lock().unwrap_or_else(|e| e.into_inner())
    }
}
