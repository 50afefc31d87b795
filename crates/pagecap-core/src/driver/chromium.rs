//! Chromium over CDP (`chromiumoxide`).
//!
//! One headless browser per platform: the desktop one with a fixed viewport
//! and scale factor, the mobile one emulating a device profile. Each gets its
//! own throwaway user-data dir so the two processes never share a profile lock.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat, EventDomContentEventFired,
    EventLifecycleEvent,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::devices::{self, DeviceProfile};
use super::{poll_ready_state, BrowserSession, DriverError, LoadState, PageDriver, Platform};
use crate::config::{CaptureConfig, DesktopConfig, LaunchConfig};
use crate::wait::{poll_until, PollOutcome};

/// Switches every capture browser gets: autoplay without a user gesture and
/// relaxed web security so cross-origin media still loads.
pub const LAUNCH_ARGS: &[&str] = &[
    "--autoplay-policy=no-user-gesture-required",
    "--disable-web-security",
    "--allow-running-insecure-content",
    "--hide-scrollbars",
    "--mute-audio",
    "--no-first-run",
    "--no-default-browser-check",
];

/// Chromium's net-error pages are served from this origin.
const ERROR_PAGE_PREFIX: &str = "chrome-error://";
const CURRENT_URL: &str = "location.href";

/// Blank document new pages start on before `goto`.
const BLANK_PAGE: &str = "about:blank";

/// chromiumoxide's own per-command timeout, used as a floor.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
/// Headroom over the longest in-page script.
const COMMAND_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

/// Main-frame lifecycle event Chromium fires after 500 ms without network
/// connections.
const NETWORK_IDLE_EVENT: &str = "networkIdle";
/// First lifecycle event of every new document.
const INIT_EVENT: &str = "init";

/// Upper bound on one CDP command.
///
/// Auto-scroll runs `max_scroll_steps + 2` pauses inside a single evaluate and
/// the play script may wait up to the per-video timeout.
fn command_timeout(cfg: &CaptureConfig) -> Duration {
    let r = &cfg.readiness;
    let scroll_ms = r
        .scroll_pause_ms
        .saturating_mul(u64::from(r.max_scroll_steps) + 2);
    let longest_script = Duration::from_millis(scroll_ms).max(r.video.per_video_timeout());
    DEFAULT_COMMAND_TIMEOUT.max(longest_script + COMMAND_TIMEOUT_SLACK)
}

fn desktop_viewport(cfg: &DesktopConfig) -> Viewport {
    Viewport {
        width: cfg.width,
        height: cfg.height,
        device_scale_factor: Some(cfg.device_scale_factor),
        emulating_mobile: false,
        is_landscape: false,
        has_touch: false,
    }
}

fn device_viewport(device: &DeviceProfile) -> Viewport {
    Viewport {
        width: device.width,
        height: device.height,
        device_scale_factor: Some(device.device_scale_factor),
        emulating_mobile: device.is_mobile,
        is_landscape: false,
        has_touch: device.has_touch,
    }
}

/// Builds the launch config for one browser process.
fn browser_config(
    launch: &LaunchConfig,
    viewport: Viewport,
    user_agent: Option<&str>,
    profile_dir: &Path,
    request_timeout: Duration,
) -> Result<BrowserConfig, DriverError> {
    let mut builder = BrowserConfig::builder()
        .window_size(viewport.width, viewport.height)
        .viewport(viewport)
        .request_timeout(request_timeout)
        .user_data_dir(profile_dir)
        .args(LAUNCH_ARGS.iter().copied())
        .args(launch.extra_args.iter().cloned());

    if let Some(ua) = user_agent {
        builder = builder.arg(format!("--user-agent={ua}"));
    }
    if !launch.headless {
        builder = builder.with_head();
    }
    if !launch.sandbox {
        builder = builder.no_sandbox();
    }
    if let Some(ref path) = launch.chrome_path {
        builder = builder.chrome_executable(path);
    }

    builder.build().map_err(DriverError::Config)
}

/// A launched browser process plus the task pumping its CDP events.
struct LaunchedBrowser {
    platform: Platform,
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    _profile_dir: TempDir,
}

impl LaunchedBrowser {
    async fn launch(
        platform: Platform,
        launch: &LaunchConfig,
        viewport: Viewport,
        user_agent: Option<&str>,
        request_timeout: Duration,
    ) -> Result<Self, DriverError> {
        let profile_dir = tempfile::Builder::new()
            .prefix(&format!("pagecap-{platform}-"))
            .tempdir()?;
        let config = browser_config(
            launch,
            viewport,
            user_agent,
            profile_dir.path(),
            request_timeout,
        )?;

        let (browser, mut handler) = Browser::launch(config).await?;
        // The handler stream must be polled for the browser to make progress.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(%platform, "browser handler error: {e}");
                }
            }
        });

        tracing::info!(%platform, "launched headless browser");
        Ok(Self {
            platform,
            browser: Mutex::new(browser),
            handler,
            _profile_dir: profile_dir,
        })
    }

    async fn shutdown(&mut self) -> Result<(), DriverError> {
        let browser = self.browser.get_mut();
        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            tracing::debug!(platform = %self.platform, "waiting for browser exit: {e}");
        }
        self.handler.abort();
        closed?;
        tracing::info!(platform = %self.platform, "browser closed");
        Ok(())
    }
}

/// Desktop and mobile browsers for one capture run.
pub struct ChromiumSession {
    desktop: LaunchedBrowser,
    mobile: LaunchedBrowser,
}

impl ChromiumSession {
    /// Launches both browsers as configured.
    pub async fn launch(cfg: &CaptureConfig) -> Result<Self, DriverError> {
        let device = devices::find(&cfg.mobile.device).ok_or_else(|| {
            DriverError::Config(format!("unknown mobile device {:?}", cfg.mobile.device))
        })?;
        let request_timeout = command_timeout(cfg);

        let desktop = LaunchedBrowser::launch(
            Platform::Desktop,
            &cfg.browser,
            desktop_viewport(&cfg.desktop),
            None,
            request_timeout,
        )
        .await?;
        let mobile = match LaunchedBrowser::launch(
            Platform::Mobile,
            &cfg.browser,
            device_viewport(device),
            Some(device.user_agent),
            request_timeout,
        )
        .await
        {
            Ok(m) => m,
            Err(e) => {
                let mut desktop = desktop;
                let _ = desktop.shutdown().await;
                return Err(e);
            }
        };
        tracing::debug!(device = device.name, "mobile browser emulates device");

        Ok(Self { desktop, mobile })
    }

    fn browser(&self, platform: Platform) -> &Mutex<Browser> {
        match platform {
            Platform::Desktop => &self.desktop.browser,
            Platform::Mobile => &self.mobile.browser,
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    type Page = ChromiumPage;

    async fn open_page(&self, platform: Platform) -> Result<ChromiumPage, DriverError> {
        let browser = self.browser(platform).lock().await;
        let page = browser.new_page(BLANK_PAGE).await?;
        drop(browser);
        ChromiumPage::attach(page).await
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        let desktop = self.desktop.shutdown().await;
        let mobile = self.mobile.shutdown().await;
        desktop.and(mobile)
    }
}

/// Lifecycle event names the main frame reached since its document started.
#[derive(Debug, Default)]
struct FrameLifecycle {
    names: HashSet<String>,
}

impl FrameLifecycle {
    fn record(&mut self, name: &str) {
        if name == INIT_EVENT {
            self.names.clear();
        }
        self.names.insert(name.to_string());
    }

    fn reached(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    fn reset(&mut self) {
        self.names.clear();
    }
}

type Lifecycle = Arc<StdMutex<FrameLifecycle>>;

/// Fails when the page that parsed is Chromium's net-error page.
fn ensure_landed(url: &str, href: &Value) -> Result<(), DriverError> {
    match href.as_str() {
        Some(href) if href.starts_with(ERROR_PAGE_PREFIX) => Err(DriverError::Browser(format!(
            "navigation to {url} failed"
        ))),
        _ => Ok(()),
    }
}

/// A CDP page.
pub struct ChromiumPage {
    page: Page,
    lifecycle: Lifecycle,
    lifecycle_task: JoinHandle<()>,
}

impl ChromiumPage {
    /// Wraps `page` and starts recording its main-frame lifecycle events.
    async fn attach(page: Page) -> Result<Self, DriverError> {
        let mut events = page.event_listener::<EventLifecycleEvent>().await?;
        let main_frame = page.mainframe().await?;
        let lifecycle = Lifecycle::default();
        let seen = Arc::clone(&lifecycle);
        let lifecycle_task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if main_frame.as_ref().is_some_and(|id| *id != event.frame_id) {
                    continue;
                }
                let Ok(mut lifecycle) = seen.lock() else { break };
                lifecycle.record(&event.name);
            }
        });
        Ok(Self {
            page,
            lifecycle,
            lifecycle_task,
        })
    }

    fn reached(&self, event: &str) -> bool {
        self.lifecycle
            .lock()
            .map(|lifecycle| lifecycle.reached(event))
            .unwrap_or(false)
    }

    fn forget_lifecycle(&self) {
        if let Ok(mut lifecycle) = self.lifecycle.lock() {
            lifecycle.reset();
        }
    }

    /// Navigates and resolves on the main frame's DOMContentLoaded.
    ///
    /// `Page::goto` only resolves on `load`, so it is raced against the
    /// DOMContentLoaded event and dropped once the document is parsed.
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let mut dom_ready = self
            .page
            .event_listener::<EventDomContentEventFired>()
            .await?;
        let navigation = self.page.goto(url);
        tokio::pin!(navigation);

        tokio::select! {
            biased;
            loaded = &mut navigation => {
                loaded?;
                return Ok(());
            }
            Some(_) = dom_ready.next() => {}
        }

        // Failed navigations still parse Chromium's error page.
        let href = self.evaluate(CURRENT_URL).await?;
        ensure_landed(url, &href)
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        self.lifecycle_task.abort();
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(DriverError::Script)?;
        let result = self.page.evaluate_expression(params).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn add_init_script(&self, script: &str) -> Result<(), DriverError> {
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(script))
            .await?;
        Ok(())
    }

    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        self.forget_lifecycle();
        match tokio::time::timeout(timeout, self.navigate(url)).await {
            Ok(res) => res,
            Err(_) => Err(DriverError::Timeout {
                op: "navigation",
                after: timeout,
            }),
        }
    }

    async fn screenshot_full_page(&self, path: &Path) -> Result<(), DriverError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        let png = self.page.screenshot(params).await?;
        tokio::fs::write(path, &png).await?;
        tracing::debug!(path = %path.display(), bytes = png.len(), "screenshot written");
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.lifecycle_task.abort();
        self.page.clone().close().await?;
        Ok(())
    }

    /// Network idle comes from Chromium's own `networkIdle` lifecycle event,
    /// which also counts requests still in flight. `quiet` is fixed at 500 ms
    /// by Chromium.
    async fn wait_for_load_state(
        &self,
        state: LoadState,
        timeout: Duration,
        interval: Duration,
    ) -> Result<PollOutcome, DriverError> {
        match state {
            LoadState::NetworkIdle { .. } => {
                let page = self;
                poll_until(interval, timeout, move || async move {
                    Ok::<_, DriverError>(page.reached(NETWORK_IDLE_EVENT))
                })
                .await
            }
            _ => poll_ready_state(self, state, timeout, interval).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desktop_viewport_from_config() {
        let vp = desktop_viewport(&DesktopConfig::default());
        assert_eq!((vp.width, vp.height), (1366, 900));
        assert_eq!(vp.device_scale_factor, Some(2.0));
        assert!(!vp.emulating_mobile);
    }

    #[test]
    fn device_viewport_emulates_mobile() {
        let device = devices::find("iPhone 12").unwrap();
        let vp = device_viewport(device);
        assert_eq!((vp.width, vp.height), (390, 664));
        assert!(vp.emulating_mobile && vp.has_touch);
    }

    #[test]
    fn lifecycle_restarts_with_each_document() {
        let mut lifecycle = FrameLifecycle::default();
        for name in ["init", "DOMContentLoaded", "load", "networkIdle"] {
            lifecycle.record(name);
        }
        assert!(lifecycle.reached(NETWORK_IDLE_EVENT));

        lifecycle.record("init");
        assert!(!lifecycle.reached(NETWORK_IDLE_EVENT));
        assert!(!lifecycle.reached("load"));

        lifecycle.record("networkIdle");
        lifecycle.reset();
        assert!(!lifecycle.reached(NETWORK_IDLE_EVENT));
    }

    #[test]
    fn error_page_counts_as_failed_navigation() {
        let err = ensure_landed(
            "https://nope.invalid/",
            &Value::from("chrome-error://chromewebdata/"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("https://nope.invalid/"), "{err}");
        assert!(ensure_landed("https://a.com/", &Value::from("https://a.com/")).is_ok());
        assert!(ensure_landed("https://a.com/", &Value::Null).is_ok());
    }

    #[test]
    fn command_timeout_outlasts_a_full_auto_scroll() {
        let cfg = CaptureConfig::default();
        // 200 steps at 150 ms plus two settle pauses.
        assert_eq!(command_timeout(&cfg), Duration::from_millis(30_300) + COMMAND_TIMEOUT_SLACK);

        let mut quick = CaptureConfig::default();
        quick.readiness.max_scroll_steps = 10;
        assert_eq!(command_timeout(&quick), DEFAULT_COMMAND_TIMEOUT);
    }

    #[test]
    fn launch_args_allow_autoplay() {
        assert!(LAUNCH_ARGS.contains(&"--autoplay-policy=no-user-gesture-required"));
        assert!(LAUNCH_ARGS.contains(&"--disable-web-security"));
        assert!(LAUNCH_ARGS.contains(&"--allow-running-insecure-content"));
    }
}
