//! Bounded polling against a predicate
//!
//! Page readiness is never assumed after a fixed sleep. Every wait is a probe
//! repeated at `interval` until it yields a value or `timeout` elapses.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::{NutriError, Result};

/// Timeout and probe interval for a bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Same interval, different timeout
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }
}

/// Probe until it returns `Some`, or fail with [`NutriError::Timeout`].
///
/// The probe always runs at least once. Probe errors count as "not yet" and
/// are logged at debug level.
pub async fn poll_until<T, F, Fut>(what: &str, policy: PollPolicy, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + policy.timeout;

    loop {
        match probe().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) => debug!("Probe for {} failed: {}", what, e),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(NutriError::Timeout {
                what: what.to_string(),
                after: policy.timeout,
            });
        }
        sleep(policy.interval.min(deadline - now)).await;
    }
}

/// Probe until two consecutive readings agree and return the settled value.
///
/// When the timeout expires first the latest reading is returned; only a
/// probe that never succeeded produces an error.
pub async fn poll_until_stable<T, F, Fut>(what: &str, policy: PollPolicy, mut probe: F) -> Result<T>
where
    T: PartialEq,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let deadline = Instant::now() + policy.timeout;
    let mut last: Option<T> = None;
    let mut last_error: Option<NutriError> = None;

    loop {
        match probe().await {
            Ok(value) => {
                if last.as_ref() == Some(&value) {
                    return Ok(value);
                }
                last = Some(value);
            }
            Err(e) => {
                debug!("Probe for {} failed: {}", what, e);
                last_error = Some(e);
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return match (last, last_error) {
                (Some(value), _) => Ok(value),
                (None, Some(e)) => Err(e),
                (None, None) => Err(NutriError::Timeout {
                    what: what.to_string(),
                    after: policy.timeout,
                }),
            };
        }
        sleep(policy.interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quick() -> PollPolicy {
        PollPolicy::new(Duration::from_millis(200), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_poll_until_returns_first_value() {
        let calls = Cell::new(0);
        let value = poll_until("counter", quick(), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { Ok(if n >= 3 { Some(n) } else { None }) }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_poll_until_times_out() {
        let policy = PollPolicy::new(Duration::from_millis(30), Duration::from_millis(5));
        let err = poll_until("never", policy, || async { Ok::<Option<()>, _>(None) })
            .await
            .unwrap_err();

        assert!(matches!(err, NutriError::Timeout { .. }));
        assert!(err.to_string().contains("never"));
    }

    #[tokio::test]
    async fn test_poll_until_treats_errors_as_not_yet() {
        let calls = Cell::new(0);
        let value = poll_until("flaky", quick(), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n == 1 {
                    Err(NutriError::Script("not ready".to_string()))
                } else {
                    Ok(Some("ok"))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "ok");
    }

    #[tokio::test]
    async fn test_poll_until_stable_waits_for_agreement() {
        let readings = [4usize, 9, 12, 12];
        let calls = Cell::new(0);
        let value = poll_until_stable("anchors", quick(), || {
            let i = calls.get().min(readings.len() - 1);
            calls.set(calls.get() + 1);
            let reading = readings[i];
            async move { Ok(reading) }
        })
        .await
        .unwrap();

        assert_eq!(value, 12);
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test]
    async fn test_poll_until_stable_returns_latest_on_timeout() {
        let policy = PollPolicy::new(Duration::from_millis(20), Duration::from_millis(5));
        let calls = Cell::new(0usize);
        let value = poll_until_stable("growing", policy, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { Ok(n) }
        })
        .await
        .unwrap();

        assert_eq!(value, calls.get());
    }
}
