//! Browser capability seam.
//!
//! The capture pipeline only talks to a page through [`PageDriver`] and opens
//! pages through [`BrowserSession`], so the orchestration runs unchanged
//! against Chromium ([`chromium::ChromiumSession`]) or a test fake.

pub mod chromium;
pub mod devices;
mod error;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::wait::{poll_until, PollOutcome, QuietWindow};

pub use error::DriverError;

/// Viewport family a page is captured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Desktop,
    Mobile,
}

impl Platform {
    /// Capture order within one URL.
    pub const ALL: [Platform; 2] = [Platform::Desktop, Platform::Mobile];

    /// Output subfolder for this platform.
    pub fn dir_name(self) -> &'static str {
        match self {
            Platform::Desktop => "desktop",
            Platform::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.dir_name())
    }
}

/// Page lifecycle signals a caller can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// `document.readyState` has left `loading`.
    DomContentLoaded,
    /// `document.readyState` is `complete`.
    Load,
    /// Load is complete and no new resource request was recorded for `quiet`.
    NetworkIdle { quiet: Duration },
}

const DOM_CONTENT_LOADED_CHECK: &str = "document.readyState !== 'loading'";
const LOAD_CHECK: &str = "document.readyState === 'complete'";
const NETWORK_ACTIVITY_CHECK: &str = "({ complete: document.readyState === 'complete', \
     resources: performance.getEntriesByType('resource').length })";

#[derive(Debug, Deserialize)]
struct NetworkActivity {
    complete: bool,
    resources: u64,
}

/// An open browser page.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Evaluates a JavaScript expression in the page, awaiting a returned
    /// promise. `undefined` results come back as `Value::Null`.
    async fn evaluate(&self, script: &str) -> Result<Value, DriverError>;

    /// Registers a script to run in every new document before page scripts.
    async fn add_init_script(&self, script: &str) -> Result<(), DriverError>;

    /// Navigates to `url`, failing with [`DriverError::Timeout`] after `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Writes a PNG of the whole scrollable document to `path`.
    async fn screenshot_full_page(&self, path: &Path) -> Result<(), DriverError>;

    async fn close(&self) -> Result<(), DriverError>;

    /// Fixed delay on the page's clock.
    async fn wait_for_timeout(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }

    /// Polls the page every `interval` until `state` is reached or `timeout` elapses.
    ///
    /// Network idle defaults to load complete plus no new resource-timing
    /// entries for `quiet`; drivers with a native idle signal override this.
    async fn wait_for_load_state(
        &self,
        state: LoadState,
        timeout: Duration,
        interval: Duration,
    ) -> Result<PollOutcome, DriverError> {
        let page = self;
        match state {
            LoadState::DomContentLoaded | LoadState::Load => {
                poll_ready_state(page, state, timeout, interval).await
            }
            LoadState::NetworkIdle { quiet } => {
                let window = Mutex::new(QuietWindow::new(quiet));
                let window = &window;
                poll_until(interval, timeout, move || async move {
                    let value = page.evaluate(NETWORK_ACTIVITY_CHECK).await?;
                    let activity: NetworkActivity = serde_json::from_value(value)?;
                    let mut window = window
                        .lock()
                        .map_err(|_| DriverError::Script("network idle tracker poisoned".into()))?;
                    let quiet = window.observe(activity.resources, Instant::now());
                    Ok::<_, DriverError>(activity.complete && quiet)
                })
                .await
            }
        }
    }
}

/// Polls `document.readyState` until it satisfies `state`.
///
/// Network idle has no `readyState` equivalent and is treated as load.
pub(crate) async fn poll_ready_state<P: PageDriver + ?Sized>(
    page: &P,
    state: LoadState,
    timeout: Duration,
    interval: Duration,
) -> Result<PollOutcome, DriverError> {
    let check = match state {
        LoadState::DomContentLoaded => DOM_CONTENT_LOADED_CHECK,
        LoadState::Load | LoadState::NetworkIdle { .. } => LOAD_CHECK,
    };
    poll_until(interval, timeout, move || async move {
        Ok::<_, DriverError>(page.evaluate(check).await?.as_bool().unwrap_or(false))
    })
    .await
}

/// A running browser able to open pages for each platform.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Page: PageDriver;

    /// Opens a blank page configured for `platform` (viewport, emulation).
    async fn open_page(&self, platform: Platform) -> Result<Self::Page, DriverError>;

    /// Closes every browser process owned by the session.
    async fn close(&mut self) -> Result<(), DriverError>;
}
