// Fixed-delay retry wrapper.
// Runs a fallible async attempt a bounded number of times and reports the outcome.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Attempt bound and fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Receives the final outcome of [`run_with_retry`].
///
/// Both callbacks are optional; by default success is ignored and the last
/// error is logged.
pub trait RetryHandler<T, E: Display> {
    fn on_success(&self, _value: &T) {}

    fn on_error(&self, err: &E) {
        error!(error = %err, "all retry attempts failed");
    }
}

/// Handler that only logs.
pub struct LogOnly;

impl<T, E: Display> RetryHandler<T, E> for LogOnly {}

/// Run `attempt` up to `policy.max_retries` times.
///
/// Returns the first successful value, or `None` once every attempt failed
/// and the handler's `on_error` has run. Never fails itself.
pub async fn run_with_retry<T, E, F, Fut, H>(
    policy: RetryPolicy,
    mut attempt: F,
    handler: &H,
) -> Option<T>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    H: RetryHandler<T, E> + ?Sized,
{
    let max = policy.max_retries.max(1);
    let mut n = 1;
    loop {
        match attempt().await {
            Ok(value) => {
                handler.on_success(&value);
                return Some(value);
            }
            Err(err) if n >= max => {
                handler.on_error(&err);
                return None;
            }
            Err(err) => {
                warn!(attempt = n, max_retries = max, error = %err, "attempt failed, retrying");
                if !policy.retry_delay.is_zero() {
                    tokio::time::sleep(policy.retry_delay).await;
                }
                n += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        successes: RefCell<Vec<u32>>,
        errors: RefCell<Vec<String>>,
    }

    impl RetryHandler<u32, String> for Recorder {
        fn on_success(&self, value: &u32) {
            self.successes.borrow_mut().push(*value);
        }

        fn on_error(&self, err: &String) {
            self.errors.borrow_mut().push(err.clone());
        }
    }

    fn no_delay(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            retry_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_always_failing_attempts_exactly_n_times() {
        let calls = AtomicU32::new(0);
        let recorder = Recorder::default();

        let out = run_with_retry(
            no_delay(4),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err::<u32, String>(format!("failure {}", n)) }
            },
            &recorder,
        )
        .await;

        assert_eq!(out, None);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(*recorder.errors.borrow(), vec!["failure 4".to_string()]);
        assert!(recorder.successes.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_fail_twice_then_succeed() {
        let calls = AtomicU32::new(0);
        let recorder = Recorder::default();

        let out = run_with_retry(
            no_delay(3),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err("not yet".to_string())
                    } else {
                        Ok(42)
                    }
                }
            },
            &recorder,
        )
        .await;

        assert_eq!(out, Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*recorder.successes.borrow(), vec![42]);
        assert!(recorder.errors.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_first_success_stops() {
        let calls = AtomicU32::new(0);
        let out = run_with_retry(
            no_delay(5),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<u32, String>(1) }
            },
            &LogOnly,
        )
        .await;

        assert_eq!(out, Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_max_retries_still_attempts_once() {
        let calls = AtomicU32::new(0);
        let out = run_with_retry(
            no_delay(0),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, String>("nope".to_string()) }
            },
            &LogOnly,
        )
        .await;

        assert_eq!(out, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_between_attempts_but_not_after_last() {
        let start = tokio::time::Instant::now();
        let policy = RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
        };

        run_with_retry(
            policy,
            || async { Err::<u32, String>("down".to_string()) },
            &LogOnly,
        )
        .await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2000));
        assert!(elapsed < Duration::from_millis(3000));
    }
}
