//! Retry loop for units of work.

use std::future::Future;

use schola_core::retry::RetryPolicy;

use crate::error::SchedulingError;

/// Run `attempt` until it succeeds, fails permanently, or the policy gives
/// up. Only transient storage failures (busy database, stale version) are
/// retried; every attempt opens a fresh unit of work and reloads its state.
pub(crate) async fn retrying<T, F, Fut>(
    policy: &RetryPolicy,
    op: &'static str,
    mut attempt: F,
) -> Result<T, SchedulingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SchedulingError>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(e) if e.is_transient_storage() && policy.should_retry(tries) => {
                let delay = policy.delay_for(tries);
                tracing::warn!(op, attempt = tries, ?delay, error = %e, "transient storage failure, retrying");
                tokio::time::sleep(delay).await;
                tries += 1;
            }
            other => return other,
        }
    }
}
