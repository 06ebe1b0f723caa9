//! Helpers for spawned tasks.

use tokio::task::JoinError;

/// Why a spawned task did not complete: its panic message, or "cancelled".
pub(crate) fn join_failure(err: JoinError) -> String {
    if err.is_cancelled() {
        return "cancelled".to_string();
    }
    let payload = err.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
