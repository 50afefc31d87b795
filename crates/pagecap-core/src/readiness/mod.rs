//! Page readiness routine run between navigation and screenshot.
//!
//! Steps, in order: DOM content loaded, network idle, auto-scroll, lazy image
//! promotion, lazy video promotion, video frame stepping, image loading, final
//! delay. Every step is bounded and best-effort: a failure is logged and the
//! routine moves on, so a degraded page still gets captured.

pub mod scripts;
mod video;

use serde::Deserialize;
use serde_json::json;

use crate::config::ReadinessConfig;
use crate::driver::{DriverError, LoadState, PageDriver};
use crate::wait::poll_until;

use scripts::call;

pub use video::{capture_target, step_video, step_videos, VideoOutcome, VideoTally};

/// What the readiness routine managed to do on one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadinessReport {
    pub dom_content_loaded: bool,
    pub network_idle: bool,
    pub scroll_steps: u32,
    /// `src` + `srcset` attributes filled from lazy-load attributes.
    pub promoted_image_attrs: u32,
    /// `src` attributes filled on `<video>` and `<source>` elements.
    pub promoted_video_attrs: u32,
    pub videos: VideoTally,
    /// Every image reported complete before the timeout.
    pub images_settled: bool,
}

#[derive(Debug, Deserialize)]
struct ImagePromotion {
    images: u32,
    src: u32,
    srcset: u32,
}

#[derive(Debug, Deserialize)]
struct VideoPromotion {
    videos: u32,
    src: u32,
}

async fn auto_scroll<P: PageDriver + ?Sized>(
    page: &P,
    cfg: &ReadinessConfig,
) -> Result<u32, DriverError> {
    let script = call(
        scripts::AUTO_SCROLL,
        &[
            json!(cfg.scroll_step_px),
            json!(cfg.scroll_pause_ms),
            json!(cfg.max_scroll_steps),
        ],
    );
    let steps = page.evaluate(&script).await?.as_u64().unwrap_or(0) as u32;
    if steps >= cfg.max_scroll_steps {
        tracing::warn!(steps, "auto-scroll hit the step cap before the page bottom");
    }
    Ok(steps)
}

async fn promote_lazy_images<P: PageDriver + ?Sized>(
    page: &P,
    cfg: &ReadinessConfig,
) -> Result<u32, DriverError> {
    let script = call(
        scripts::PROMOTE_LAZY_IMAGES,
        &[json!(cfg.image_src_attrs), json!(cfg.image_srcset_attrs)],
    );
    let promoted: ImagePromotion = serde_json::from_value(page.evaluate(&script).await?)?;
    tracing::debug!(
        images = promoted.images,
        src = promoted.src,
        srcset = promoted.srcset,
        "promoted lazy images"
    );
    Ok(promoted.src + promoted.srcset)
}

async fn promote_lazy_videos<P: PageDriver + ?Sized>(
    page: &P,
    cfg: &ReadinessConfig,
) -> Result<u32, DriverError> {
    let script = call(scripts::PROMOTE_LAZY_VIDEOS, &[json!(cfg.video_src_attrs)]);
    let promoted: VideoPromotion = serde_json::from_value(page.evaluate(&script).await?)?;
    tracing::debug!(videos = promoted.videos, src = promoted.src, "promoted lazy videos");
    Ok(promoted.src)
}

async fn wait_for_images<P: PageDriver + ?Sized>(
    page: &P,
    cfg: &ReadinessConfig,
) -> Result<bool, DriverError> {
    let outcome = poll_until(cfg.poll_interval(), cfg.images_timeout(), move || async move {
        Ok::<_, DriverError>(page.evaluate(scripts::IMAGES_READY).await?.as_bool() == Some(true))
    })
    .await?;
    Ok(outcome.is_ready())
}

/// Brings an already-navigated page to a capturable state.
///
/// Never fails: each step's error is logged as a warning and recorded in the
/// report as "not reached".
pub async fn prepare_page<P: PageDriver + ?Sized>(
    page: &P,
    cfg: &ReadinessConfig,
) -> ReadinessReport {
    let mut report = ReadinessReport::default();
    let interval = cfg.poll_interval();

    match page
        .wait_for_load_state(
            LoadState::DomContentLoaded,
            cfg.dom_content_loaded_timeout(),
            interval,
        )
        .await
    {
        Ok(outcome) if outcome.is_ready() => report.dom_content_loaded = true,
        Ok(outcome) => tracing::warn!(?outcome, "DOM content loaded not reached"),
        Err(e) => tracing::warn!("waiting for DOM content loaded failed: {e}"),
    }

    let network_idle = LoadState::NetworkIdle {
        quiet: cfg.network_quiet(),
    };
    match page
        .wait_for_load_state(network_idle, cfg.network_idle_timeout(), interval)
        .await
    {
        Ok(outcome) if outcome.is_ready() => {
            tracing::debug!(?outcome, "network idle");
            report.network_idle = true;
        }
        Ok(_) => tracing::warn!(
            timeout_ms = cfg.network_idle_timeout_ms,
            "network idle timeout, continuing"
        ),
        Err(e) => tracing::warn!("waiting for network idle failed: {e}"),
    }

    match auto_scroll(page, cfg).await {
        Ok(steps) => report.scroll_steps = steps,
        Err(e) => tracing::warn!("auto-scroll failed: {e}"),
    }

    match promote_lazy_images(page, cfg).await {
        Ok(n) => report.promoted_image_attrs = n,
        Err(e) => tracing::warn!("promoting lazy images failed: {e}"),
    }

    match promote_lazy_videos(page, cfg).await {
        Ok(n) => report.promoted_video_attrs = n,
        Err(e) => tracing::warn!("promoting lazy videos failed: {e}"),
    }

    match step_videos(page, cfg).await {
        Ok(tally) => report.videos = tally,
        Err(e) => tracing::warn!("video processing error: {e}"),
    }

    match wait_for_images(page, cfg).await {
        Ok(true) => report.images_settled = true,
        Ok(false) => tracing::warn!(
            timeout_ms = cfg.images_timeout_ms,
            "image loading timeout, capturing anyway"
        ),
        Err(e) => tracing::warn!("waiting for images failed: {e}"),
    }

    page.wait_for_timeout(cfg.extra_wait()).await;
    tracing::debug!(?report, "page ready for screenshot");
    report
}
