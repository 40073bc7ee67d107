use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Whether a failed request is worth repeating: timeouts, connection
/// failures, rate limiting and server errors.
pub fn is_transient(err: &reqwest::Error) -> bool {
    match err.status() {
        Some(status) => status.is_server_error() || status.as_u16() == 429,
        None => err.is_timeout() || err.is_connect() || err.is_request(),
    }
}

/// Runs `operation` once plus up to `retries` more times while it fails
/// with a transient error, sleeping `delay` between attempts.
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay: Duration,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut remaining = retries;
    loop {
        let err = match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => err,
        };
        if remaining == 0 || !is_transient(&err) {
            return Err(err.into());
        }
        remaining -= 1;
        debug!(remaining, error = %err, "Request failed, retrying");
        tokio::time::sleep(delay).await;
    }
}
