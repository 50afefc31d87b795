//! Quiet-window detection for network idle.

use std::time::Duration;
use tokio::time::Instant;

/// Tracks a monotonically growing activity counter (e.g. the number of
/// resource entries a page has recorded) and reports when it has stayed
/// unchanged for a full window.
#[derive(Debug, Clone)]
pub struct QuietWindow {
    window: Duration,
    last: Option<(u64, Instant)>,
}

impl QuietWindow {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Records the counter observed at `now`; returns true once it has not
    /// changed for at least the window.
    pub fn observe(&mut self, count: u64, now: Instant) -> bool {
        match self.last {
            Some((prev, since)) if prev == count => now.duration_since(since) >= self.window,
            _ => {
                self.last = Some((count, now));
                false
            }
        }
    }
}
