use crate::{pool::WorkResult, retry::classify_fetch_error};
use connectors::{beacon::FetchOutcome, error::FetchError};
use engine_core::{
    metrics::Metrics,
    retry::{RetryError, RetryPolicy},
};
use std::future::Future;

/// Runs `op` under `policy`. A `NotFound` answer is returned as `Skipped`
/// after a single attempt; only transient errors are retried.
pub async fn fetch_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    metrics: &Metrics,
    op: F,
) -> WorkResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<FetchOutcome<T>, FetchError>>,
{
    let mut attempts = 0usize;
    let result = policy
        .run(
            || {
                attempts += 1;
                op()
            },
            classify_fetch_error,
        )
        .await;

    if attempts > 1 {
        metrics.increment_retries((attempts - 1) as u64);
    }

    match result {
        Ok(FetchOutcome::Found(value)) => WorkResult::Success(value),
        Ok(FetchOutcome::NotFound) => WorkResult::Skipped,
        Err(RetryError::Fatal(err)) => WorkResult::Failed(err.to_string()),
        Err(RetryError::AttemptsExceeded(err)) => {
            WorkResult::Failed(format!("{err} (gave up after {attempts} attempts)"))
        }
    }
}
