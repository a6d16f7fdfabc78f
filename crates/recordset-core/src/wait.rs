//! Bounded polling for eventual consistency
//!
//! [`wait_until`] probes a condition at a fixed interval until it holds, the
//! deadline passes, or the caller cancels. Each probe is itself bounded by
//! the deadline, and the sleep between probes is interrupted by
//! cancellation, so nothing outlives the call.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::RecordSet;

/// Deadline used when a timeout does not fit in an `Instant` (about 30 years)
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Result of a single probe
#[derive(Debug)]
pub enum Poll<T> {
    /// The condition holds
    Ready(T),
    /// Not yet; carries whatever was seen this round
    Pending(Option<RecordSet>),
}

/// Cancellation signal handed down by the host
///
/// The wait is cancelled once the watched value becomes `true`. A dropped
/// sender never cancels.
pub type CancelSignal = watch::Receiver<bool>;

/// Poll `condition` every `poll_interval` until it is ready
///
/// # Errors
///
/// - [`Error::OperationTimeout`] when `timeout` elapses first
/// - [`Error::Cancelled`] when `cancel` fires first
/// - any error returned by `condition`, unchanged
///
/// Both wait errors carry the last state a probe reported.
pub async fn wait_until<T, F, Fut>(
    operation: &str,
    timeout: Duration,
    poll_interval: Duration,
    cancel: Option<&CancelSignal>,
    mut condition: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Poll<T>>>,
{
    let deadline = later(Instant::now(), timeout);
    let mut cancel = cancel.cloned();
    let mut last_observed: Option<RecordSet> = None;
    let mut attempt: usize = 0;

    loop {
        if is_cancelled(cancel.as_ref()) {
            return Err(cancelled(operation, last_observed));
        }

        attempt += 1;
        let probe = tokio::select! {
            result = tokio::time::timeout_at(deadline, condition()) => result,
            _ = wait_cancelled(cancel.as_mut()) => {
                return Err(cancelled(operation, last_observed));
            }
        };

        match probe {
            Ok(Ok(Poll::Ready(value))) => {
                debug!("{}: condition met after {} probe(s)", operation, attempt);
                return Ok(value);
            }
            Ok(Ok(Poll::Pending(observed))) => {
                if observed.is_some() {
                    last_observed = observed;
                }
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(timed_out(operation, timeout, last_observed)),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(timed_out(operation, timeout, last_observed));
        }

        let wake = later(now, poll_interval).min(deadline);
        debug!("{}: not ready (probe {}), polling again", operation, attempt);

        tokio::select! {
            _ = tokio::time::sleep_until(wake) => {}
            _ = wait_cancelled(cancel.as_mut()) => {
                return Err(cancelled(operation, last_observed));
            }
        }
    }
}

/// `now + by`, saturating at a far-future instant
fn later(now: Instant, by: Duration) -> Instant {
    now.checked_add(by)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

fn is_cancelled(cancel: Option<&CancelSignal>) -> bool {
    cancel.is_some_and(|rx| *rx.borrow())
}

/// Resolves once the signal reads `true`; never resolves without a live sender
async fn wait_cancelled(cancel: Option<&mut CancelSignal>) {
    let Some(rx) = cancel else {
        return std::future::pending().await;
    };
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn timed_out(operation: &str, timeout: Duration, last_observed: Option<RecordSet>) -> Error {
    Error::OperationTimeout {
        operation: operation.to_string(),
        zone_id: None,
        record_id: None,
        timeout,
        last_observed: last_observed.map(Box::new),
    }
}

fn cancelled(operation: &str, last_observed: Option<RecordSet>) -> Error {
    Error::Cancelled {
        operation: operation.to_string(),
        zone_id: None,
        record_id: None,
        last_observed: last_observed.map(Box::new),
    }
}
