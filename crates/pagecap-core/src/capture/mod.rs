//! Batch capture: every URL, desktop then mobile, one page at a time.
//!
//! A failing page is logged and reported, never fatal: the batch always runs
//! to the end of the URL list.

mod events;

pub use events::{CaptureEvent, CaptureSummary, PlatformTally};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::config::CaptureConfig;
use crate::driver::chromium::ChromiumSession;
use crate::driver::{BrowserSession, DriverError, PageDriver, Platform};
use crate::output::OutputLayout;
use crate::readiness::{prepare_page, scripts, ReadinessReport};
use crate::url_model::{safe_name, NameRegistry};

async fn emit(events: Option<&mpsc::Sender<CaptureEvent>>, event: CaptureEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}

/// Sibling the screenshot is written to before it is renamed into place.
fn partial_path(path: &Path) -> PathBuf {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    PathBuf::from(partial)
}

/// Navigates, readies and screenshots `url` on a fresh page of `session`.
///
/// The whole visit is bounded by `cfg.page_timeout()`. The page is closed
/// whatever the outcome. `path` only changes when the visit succeeds: the PNG
/// is written to a `.part` sibling and renamed over it.
pub async fn capture_page<S: BrowserSession + ?Sized>(
    session: &S,
    platform: Platform,
    url: &str,
    path: &Path,
    cfg: &CaptureConfig,
) -> Result<ReadinessReport, DriverError> {
    let page = session.open_page(platform).await?;
    let partial = partial_path(path);

    let visit = async {
        page.add_init_script(scripts::VIDEO_PATCH_INIT).await?;
        page.goto(url, cfg.navigation_timeout()).await?;
        let report = prepare_page(&page, &cfg.readiness).await;
        page.screenshot_full_page(&partial).await?;
        tokio::fs::rename(&partial, path).await?;
        Ok::<_, DriverError>(report)
    };
    let result = match tokio::time::timeout(cfg.page_timeout(), visit).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::Timeout {
            op: "page visit",
            after: cfg.page_timeout(),
        }),
    };

    if let Err(e) = page.close().await {
        tracing::warn!(%platform, url, "closing page failed: {e}");
    }
    if result.is_err() {
        match tokio::fs::remove_file(&partial).await {
            Ok(()) => tracing::debug!(path = %partial.display(), "removed partial screenshot"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %partial.display(), "removing partial screenshot: {e}"),
        }
    }
    result
}

/// Captures every URL in order for each of `platforms` into `layout`.
///
/// Progress is sent on `events` when given. Screenshot names come from
/// [`safe_name`]; names already used in this batch get a `-N` suffix.
pub async fn capture_all<S: BrowserSession + ?Sized>(
    session: &S,
    urls: &[String],
    layout: &OutputLayout,
    cfg: &CaptureConfig,
    platforms: &[Platform],
    events: Option<&mpsc::Sender<CaptureEvent>>,
) -> CaptureSummary {
    let mut registry = NameRegistry::new();
    let mut summary = CaptureSummary {
        urls: urls.len(),
        ..CaptureSummary::default()
    };

    for (index, url) in urls.iter().enumerate() {
        let name = registry.claim(&safe_name(url), url);
        tracing::info!(url = %url, name = %name, "[{}/{}] processing", index + 1, urls.len());
        emit(
            events,
            CaptureEvent::UrlStarted {
                index,
                total: urls.len(),
                url: url.clone(),
                name: name.clone(),
            },
        )
        .await;

        for &platform in platforms {
            let path = layout.screenshot_path(platform, &name);
            match capture_page(session, platform, url, &path, cfg).await {
                Ok(report) => {
                    tracing::info!(%platform, url = %url, path = %path.display(), "screenshot saved");
                    summary.record(platform, true);
                    emit(
                        events,
                        CaptureEvent::PlatformCaptured {
                            url: url.clone(),
                            platform,
                            path,
                            report,
                        },
                    )
                    .await;
                }
                Err(e) => {
                    tracing::warn!(%platform, url = %url, "capture failed: {e}");
                    summary.record(platform, false);
                    emit(
                        events,
                        CaptureEvent::PlatformFailed {
                            url: url.clone(),
                            platform,
                            error: e.to_string(),
                        },
                    )
                    .await;
                }
            }
        }
    }

    summary.collisions = registry.collisions();
    summary
}

/// Runs [`capture_all`] and then closes the session's browsers.
pub async fn capture_batch<S: BrowserSession>(
    session: &mut S,
    urls: &[String],
    layout: &OutputLayout,
    cfg: &CaptureConfig,
    platforms: &[Platform],
    events: Option<&mpsc::Sender<CaptureEvent>>,
) -> CaptureSummary {
    let summary = capture_all(&*session, urls, layout, cfg, platforms, events).await;
    if let Err(e) = session.close().await {
        tracing::warn!("closing browsers failed: {e}");
    }
    summary
}

/// Creates the run folder, launches Chromium and captures `urls`.
pub async fn run(
    urls: &[String],
    cfg: &CaptureConfig,
    platforms: &[Platform],
    events: Option<&mpsc::Sender<CaptureEvent>>,
) -> Result<(OutputLayout, CaptureSummary)> {
    let layout = OutputLayout::create(&cfg.output_root)?;
    let mut session = ChromiumSession::launch(cfg)
        .await
        .context("launching headless Chromium")?;
    let summary = capture_batch(&mut session, urls, &layout, cfg, platforms, events).await;
    tracing::info!(?summary, dir = %layout.run_dir().display(), "batch finished");
    Ok((layout, summary))
}
