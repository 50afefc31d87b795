//! Advances each `<video>` to a frame near a target timestamp before capture.
//!
//! Videos are handled one at a time so total time stays bounded; every wait
//! is a bounded poll and the whole pass shares one overall deadline.

use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;

use super::scripts::{self, call};
use crate::config::ReadinessConfig;
use crate::driver::{DriverError, PageDriver};
use crate::wait::poll_until_deadline;

/// `HTMLMediaElement.HAVE_METADATA`.
const HAVE_METADATA: u8 = 1;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoPrep {
    has_source: bool,
    ready_state: u8,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoState {
    ready_state: u8,
    duration: Option<f64>,
    current_time: f64,
}

/// What happened to one video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VideoOutcome {
    /// Element disappeared between counting and processing.
    Missing,
    /// No `src` and no `<source>` child.
    NoSource,
    /// Metadata never produced a finite positive duration.
    NoDuration,
    /// Playback reached the target.
    Reached { target: f64, current_time: f64 },
    /// Deadline passed before playback reached the target.
    Stalled { target: f64, current_time: f64 },
}

/// Per-page totals of the video pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoTally {
    pub found: u32,
    pub advanced: u32,
    pub stalled: u32,
    pub skipped: u32,
    pub failed: u32,
    /// Videos after this point were not processed.
    pub deadline_hit: bool,
}

/// Playback position to reach: `target` seconds, but never past the end of
/// the clip minus `margin`.
pub fn capture_target(duration: f64, target: f64, margin: f64) -> f64 {
    target.min((duration - margin).max(0.0))
}

async fn video_state<P: PageDriver + ?Sized>(
    page: &P,
    index: u64,
) -> Result<Option<VideoState>, DriverError> {
    let value = page
        .evaluate(&call(scripts::VIDEO_STATE, &[json!(index)]))
        .await?;
    Ok(serde_json::from_value(value)?)
}

/// Plays video `index` up to its capture target and waits for a decoded frame.
///
/// Never runs past `page_deadline`.
pub async fn step_video<P: PageDriver + ?Sized>(
    page: &P,
    index: u64,
    cfg: &ReadinessConfig,
    page_deadline: Instant,
) -> Result<VideoOutcome, DriverError> {
    let video = &cfg.video;
    let interval = cfg.poll_interval();

    let prep: Option<VideoPrep> = serde_json::from_value(
        page.evaluate(&call(scripts::VIDEO_PREPARE, &[json!(index)]))
            .await?,
    )?;
    let Some(prep) = prep else {
        return Ok(VideoOutcome::Missing);
    };
    if !prep.has_source {
        return Ok(VideoOutcome::NoSource);
    }

    let deadline = (Instant::now() + video.per_video_timeout()).min(page_deadline);

    if prep.ready_state < HAVE_METADATA {
        let metadata_deadline = (Instant::now() + video.metadata_timeout()).min(deadline);
        let outcome = poll_until_deadline(interval, metadata_deadline, move || async move {
            let state = video_state(page, index).await?;
            Ok::<_, DriverError>(state.is_some_and(|s| s.ready_state >= HAVE_METADATA))
        })
        .await?;
        tracing::debug!(index, ?outcome, "video metadata wait");
    }

    let Some(state) = video_state(page, index).await? else {
        return Ok(VideoOutcome::Missing);
    };
    let Some(duration) = state.duration else {
        return Ok(VideoOutcome::NoDuration);
    };
    let target = capture_target(duration, video.target_second, video.end_margin_secs);
    tracing::debug!(index, duration, target, "video capture target");

    let play_budget = deadline.saturating_duration_since(Instant::now());
    let play = page
        .evaluate(&call(
            scripts::VIDEO_PLAY,
            &[json!(index), json!(play_budget.as_millis() as u64)],
        ))
        .await?;
    if play.as_str() != Some("started") {
        // Autoplay restrictions are common; keep polling the clock anyway.
        tracing::debug!(index, result = %play, "video play did not start");
    }

    let reached = poll_until_deadline(interval, deadline, move || async move {
        let current = video_state(page, index)
            .await?
            .map_or(0.0, |s| s.current_time);
        Ok::<_, DriverError>(current >= target)
    })
    .await?
    .is_ready();

    let current_time = video_state(page, index)
        .await?
        .map_or(state.current_time, |s| s.current_time);

    page.evaluate(&call(
        scripts::VIDEO_FRAME,
        &[
            json!(index),
            json!(video.frame_callback_timeout_ms),
            json!(video.frame_fallback_delay_ms),
        ],
    ))
    .await?;

    Ok(if reached {
        VideoOutcome::Reached {
            target,
            current_time,
        }
    } else {
        VideoOutcome::Stalled {
            target,
            current_time,
        }
    })
}

/// Steps every video on the page in document order under the overall video deadline.
pub async fn step_videos<P: PageDriver + ?Sized>(
    page: &P,
    cfg: &ReadinessConfig,
) -> Result<VideoTally, DriverError> {
    let count = page
        .evaluate(scripts::VIDEO_COUNT)
        .await?
        .as_u64()
        .unwrap_or(0);
    let mut tally = VideoTally {
        found: count as u32,
        ..VideoTally::default()
    };
    if count == 0 {
        return Ok(tally);
    }

    let deadline = Instant::now() + cfg.video.total_timeout();
    for index in 0..count {
        if Instant::now() >= deadline {
            tracing::warn!(
                processed = index,
                total = count,
                "video deadline reached, skipping remaining videos"
            );
            tally.deadline_hit = true;
            break;
        }

        match step_video(page, index, cfg, deadline).await {
            Ok(VideoOutcome::Reached {
                target,
                current_time,
            }) => {
                tracing::debug!(index, target, current_time, "video ready for capture");
                tally.advanced += 1;
            }
            Ok(VideoOutcome::Stalled {
                target,
                current_time,
            }) => {
                tracing::debug!(index, target, current_time, "video did not reach target");
                tally.stalled += 1;
            }
            Ok(outcome) => {
                tracing::debug!(index, ?outcome, "video skipped");
                tally.skipped += 1;
            }
            Err(e) => {
                tracing::warn!(index, "video processing failed: {e}");
                tally.failed += 1;
            }
        }
    }
    Ok(tally)
}
