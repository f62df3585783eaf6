//! Request-level deadlines for remote service calls.
//!
//! Every embedding, completion, and OCR call is wrapped so that a hung
//! endpoint surfaces as `CopyGuardError::Timeout`, which callers already
//! treat like any other transient service failure.

use std::future::Future;
use std::time::Duration;

use crate::error::{CopyGuardError, Result};

/// Run `fut`, failing with `Timeout` once `limit` elapses.
pub async fn bounded<T, F>(limit: Duration, label: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(label, ?limit, "service call timed out");
            Err(CopyGuardError::Timeout {
                label: label.to_string(),
                elapsed: limit,
            })
        }
    }
}
