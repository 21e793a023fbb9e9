//! Maintenance workers never surface to users (§4.5): they retry transient
//! failures with backoff, then drop the item with an error log. This enum
//! is how a worker's collaborators signal which kind of failure occurred.

use memos_core::error::{Classify, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("transient: {0}")]
    Transient(String),
    #[error("terminal: {0}")]
    Terminal(String),
}

/// Classified `UpstreamUnavailable`/`Internal` only: an admin-triggered
/// refresh endpoint is the one place a worker's error crosses into the
/// HTTP surface, and a caller there can't act on transient-vs-terminal.
impl Classify for WorkerError {
    fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::Transient(_) => ErrorKind::UpstreamUnavailable,
            WorkerError::Terminal(_) => ErrorKind::Internal,
        }
    }
}

impl WorkerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, WorkerError::Transient(_))
    }
}

impl From<memos_store::StoreError> for WorkerError {
    fn from(err: memos_store::StoreError) -> Self {
        match err {
            memos_store::StoreError::Unavailable(msg) => WorkerError::Transient(msg),
            other => WorkerError::Terminal(other.to_string()),
        }
    }
}

impl From<memos_store::CoactivationError> for WorkerError {
    fn from(err: memos_store::CoactivationError) -> Self {
        WorkerError::Transient(err.to_string())
    }
}

impl From<memos_store::CausalHypothesisError> for WorkerError {
    fn from(err: memos_store::CausalHypothesisError) -> Self {
        WorkerError::Transient(err.to_string())
    }
}

/// Runs `f` up to `max_attempts` times with exponential backoff
/// (`base_delay_ms * 2^attempt`), retrying only `WorkerError::Transient`
/// failures. A terminal failure returns immediately.
pub async fn with_retry<T, F, Fut>(max_attempts: u32, base_delay_ms: u64, mut f: F) -> Result<T, WorkerError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, WorkerError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt + 1 < max_attempts => {
                let delay = base_delay_ms * 2u64.pow(attempt);
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::warn!(error = %err, attempt, "maintenance worker giving up after retries");
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let result = with_retry(3, 1, || {
            let count = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err(WorkerError::Transient("db hiccup".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), WorkerError> = with_retry(3, 1, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(WorkerError::Transient("still down".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_error_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), WorkerError> = with_retry(3, 1, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(WorkerError::Terminal("bad row".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
