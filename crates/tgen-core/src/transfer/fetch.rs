//! Blocking HTTP GET that reads the whole body through a rate limiter and discards it.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

use crate::limiter::RateLimiter;

use super::error::TransferError;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9";

/// Request headers sent with every GET, besides the User-Agent.
/// The referer is the target itself.
pub fn browser_headers(url: &str) -> Vec<String> {
    vec![
        format!("Accept: {}", ACCEPT),
        format!("Accept-Language: {}", ACCEPT_LANGUAGE),
        format!("Referer: {}", url),
        "Connection: keep-alive".to_string(),
    ]
}

/// GETs `url`, passing every received chunk through `limiter` and adding its
/// size to `received` before throttling. `received` holds the bytes read even
/// when this returns an error.
///
/// Once `cancel` fires the transfer is aborted from curl's progress callback
/// (or from the limiter, if it is mid-sleep) and `Cancelled` is returned.
pub fn fetch_discard(
    url: &str,
    limiter: &RateLimiter,
    received: &AtomicU64,
    cancel: &CancellationToken,
) -> Result<(), TransferError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.useragent(USER_AGENT)?;
    easy.progress(true)?;

    let mut list = curl::easy::List::new();
    for header in browser_headers(url) {
        list.append(&header)?;
    }
    easy.http_headers(list)?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            received.fetch_add(data.len() as u64, Ordering::Relaxed);
            if limiter.consume_until(data.len() as u64, cancel) {
                Ok(data.len())
            } else {
                // A short count makes curl abort with a write error.
                Ok(0)
            }
        })?;
        // Called at least about once a second, even while the peer is silent.
        transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
        transfer.perform()
    };
    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    performed?;

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(TransferError::Http(code));
    }
    Ok(())
}
