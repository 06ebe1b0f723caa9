//! Transfer error type.

/// Why a transfer ended early or unsuccessfully. Bytes received before the
/// failure are still accounted for by the caller.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Curl reported an error (DNS, connect, reset, invalid URL, ...).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// The response had a non-2xx status (the body was still read).
    #[error("HTTP {0}")]
    Http(u32),
    /// Shutdown was requested while the transfer was running.
    #[error("cancelled by shutdown")]
    Cancelled,
    /// The blocking worker running the transfer panicked or was cancelled.
    #[error("transfer worker failed: {0}")]
    Worker(String),
}

impl TransferError {
    pub(super) fn from_join(err: tokio::task::JoinError) -> Self {
        TransferError::Worker(crate::task::join_failure(err))
    }
}
