//! Bounded retry-until-success.
//!
//! [`poll`] turns an eventually-successful async operation into a bounded
//! wait: it calls the operation right away, returns the first `Ok`, and
//! otherwise retries every `interval` until `timeout` has elapsed.
//!
//! Only `Err` triggers a retry. An operation that should keep polling on an
//! empty result must map emptiness to an error itself (see
//! [`Error::NotReady`](crate::error::Error::NotReady)).

use std::fmt;
use std::future::Future;
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};
use crate::telemetry::metrics;

/// Interval and budget for one [`poll`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    interval: Duration,
    timeout: Duration,
}

impl PollConfig {
    /// Build a config, rejecting a zero interval or a timeout shorter than
    /// the interval.
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::Config("poll interval must be greater than zero".into()));
        }
        if timeout < interval {
            return Err(Error::Config(format!(
                "poll timeout {timeout:?} is shorter than the interval {interval:?}"
            )));
        }
        Ok(Self { interval, timeout })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// The budget ran out before the operation succeeded.
#[derive(Debug)]
pub struct PollTimeout<E> {
    pub elapsed: Duration,
    pub attempts: u32,
    /// Error from the most recent attempt that finished. `None` when every
    /// attempt was cut off by the budget.
    pub last_error: Option<E>,
}

impl<E: fmt::Display> fmt::Display for PollTimeout<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "polling timed out after {} attempt(s) in {:?}",
            self.attempts, self.elapsed
        )?;
        if let Some(ref e) = self.last_error {
            write!(f, ": {e}")?;
        }
        Ok(())
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for PollTimeout<E> {}

impl From<PollTimeout<Error>> for Error {
    fn from(t: PollTimeout<Error>) -> Self {
        Error::PollTimeout {
            elapsed: t.elapsed,
            attempts: t.attempts,
            last_error: t.last_error.map(Box::new),
        }
    }
}

/// Call `operation` until it returns `Ok` or `config.timeout()` elapses.
///
/// Each attempt is itself bounded by the remaining budget (never less than
/// one interval), so a hung call cannot stall the poller indefinitely.
pub async fn poll<T, E, F, Fut>(
    config: &PollConfig,
    mut operation: F,
) -> std::result::Result<T, PollTimeout<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: fmt::Display,
{
    let start = Instant::now();
    let mut attempts = 0u32;
    let mut last_error = None;

    loop {
        attempts += 1;
        let budget = config.timeout.saturating_sub(start.elapsed()).max(config.interval);

        match tokio::time::timeout(budget, operation()).await {
            Ok(Ok(value)) => {
                metrics::poll_attempts().add(1, &[KeyValue::new("result", "ok")]);
                debug!(attempts, elapsed_ms = start.elapsed().as_millis() as u64, "poll succeeded");
                return Ok(value);
            }
            Ok(Err(e)) => {
                metrics::poll_attempts().add(1, &[KeyValue::new("result", "error")]);
                debug!(attempt = attempts, error = %e, "poll attempt failed");
                last_error = Some(e);
            }
            Err(_) => {
                metrics::poll_attempts().add(1, &[KeyValue::new("result", "cut_off")]);
                debug!(attempt = attempts, "poll attempt exceeded the remaining budget");
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            return Err(PollTimeout {
                elapsed,
                attempts,
                last_error,
            });
        }
        tokio::time::sleep(config.interval.min(config.timeout - elapsed)).await;
    }
}
