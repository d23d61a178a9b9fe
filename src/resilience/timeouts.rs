//! Deadline enforcement for guarded operations.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the operation future is dropped when
//!   the deadline passes
//! - A timeout is its own outcome so callers can tell it apart from the
//!   operation's error, while the breaker counts both as failures

use std::future::Future;
use std::time::Duration;

/// Result of running an operation under a deadline.
#[derive(Debug)]
pub enum CallOutcome<T, E> {
    Success(T),
    Failed(E),
    TimedOut,
}

impl<T, E> CallOutcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }

    /// Label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            CallOutcome::Success(_) => "success",
            CallOutcome::Failed(_) => "failure",
            CallOutcome::TimedOut => "timeout",
        }
    }
}

/// Run `operation` and wait at most `deadline` for it.
pub async fn call_with_timeout<F, Fut, T, E>(deadline: Duration, operation: F) -> CallOutcome<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(deadline, operation()).await {
        Ok(Ok(value)) => CallOutcome::Success(value),
        Ok(Err(e)) => CallOutcome::Failed(e),
        Err(_) => CallOutcome::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fast_success() {
        let outcome = call_with_timeout(Duration::from_secs(1), || async { Ok::<_, String>(7) }).await;
        assert!(matches!(outcome, CallOutcome::Success(7)));
        assert_eq!(outcome.label(), "success");
    }

    #[tokio::test]
    async fn test_error_is_passed_through() {
        let outcome = call_with_timeout(Duration::from_secs(1), || async { Err::<(), _>("boom") }).await;
        assert!(matches!(outcome, CallOutcome::Failed("boom")));
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_slow_operation_times_out() {
        let outcome = call_with_timeout(Duration::from_millis(10), || async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, String>(())
        })
        .await;
        assert!(matches!(outcome, CallOutcome::TimedOut));
        assert_eq!(outcome.label(), "timeout");
    }
}
