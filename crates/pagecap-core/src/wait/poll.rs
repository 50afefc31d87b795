//! Poll loop: check a condition until it holds or the deadline passes.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// How a bounded poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The condition held after `polls` checks.
    Ready { polls: u32, elapsed: Duration },
    /// The deadline passed before the condition held.
    TimedOut { polls: u32, elapsed: Duration },
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }
}

/// Polls `check` every `interval` until it returns `Ok(true)` or `timeout` elapses.
///
/// The condition is checked at least once. An `Err` from `check` ends the poll
/// and is returned unchanged.
pub async fn poll_until<F, Fut, E>(
    interval: Duration,
    timeout: Duration,
    check: F,
) -> Result<PollOutcome, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    poll_until_deadline(interval, Instant::now() + timeout, check).await
}

/// Like [`poll_until`] but against an absolute deadline, for waits that share
/// a budget with other steps.
pub async fn poll_until_deadline<F, Fut, E>(
    interval: Duration,
    deadline: Instant,
    mut check: F,
) -> Result<PollOutcome, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let start = Instant::now();
    let mut polls = 0u32;
    loop {
        polls += 1;
        if check().await? {
            return Ok(PollOutcome::Ready {
                polls,
                elapsed: start.elapsed(),
            });
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(PollOutcome::TimedOut {
                polls,
                elapsed: start.elapsed(),
            });
        }
        // Never sleep past the deadline.
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}
