use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::driver::devices;

/// URL captured when the URL list file does not exist.
pub const DEFAULT_URL: &str = "https://www.example.com";

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// Desktop browser viewport (optional `[desktop]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopConfig {
    pub width: u32,
    pub height: u32,
    /// Device pixel ratio; 2.0 yields retina-sized PNGs.
    pub device_scale_factor: f64,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 900,
            device_scale_factor: 2.0,
        }
    }
}

/// Mobile emulation (optional `[mobile]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MobileConfig {
    /// Name of a built-in device profile (see `pagecap devices`).
    pub device: String,
}

impl Default for MobileConfig {
    fn default() -> Self {
        Self {
            device: "iPhone 12".to_string(),
        }
    }
}

/// Chromium launch options (optional `[browser]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Chrome/Chromium executable; auto-detected when unset.
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    /// Set to false inside containers where the Chromium sandbox cannot start.
    pub sandbox: bool,
    /// Extra command-line switches appended after the built-in ones.
    pub extra_args: Vec<String>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            sandbox: true,
            extra_args: Vec::new(),
        }
    }
}

/// Video frame stepping knobs (optional `[readiness.video]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Playback position (seconds) each video should reach before capture.
    pub target_second: f64,
    /// Keep the target this far before the end of short clips.
    pub end_margin_secs: f64,
    /// Upper bound on time spent across all videos of one page.
    pub total_timeout_ms: u64,
    pub per_video_timeout_ms: u64,
    pub metadata_timeout_ms: u64,
    pub frame_callback_timeout_ms: u64,
    /// Delay used instead of `requestVideoFrameCallback` when unsupported.
    pub frame_fallback_delay_ms: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            target_second: 3.0,
            end_margin_secs: 0.1,
            total_timeout_ms: 30_000,
            per_video_timeout_ms: 5_000,
            metadata_timeout_ms: 3_000,
            frame_callback_timeout_ms: 500,
            frame_fallback_delay_ms: 200,
        }
    }
}

impl VideoConfig {
    pub fn total_timeout(&self) -> Duration {
        ms(self.total_timeout_ms)
    }

    pub fn per_video_timeout(&self) -> Duration {
        ms(self.per_video_timeout_ms)
    }

    pub fn metadata_timeout(&self) -> Duration {
        ms(self.metadata_timeout_ms)
    }
}

/// Page readiness knobs (optional `[readiness]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub dom_content_loaded_timeout_ms: u64,
    pub network_idle_timeout_ms: u64,
    /// Quiet window with no new resource requests that counts as network idle.
    pub network_quiet_ms: u64,
    /// Interval shared by every bounded poll (images, video clock, load states).
    pub poll_interval_ms: u64,
    pub scroll_step_px: u32,
    pub scroll_pause_ms: u64,
    /// Cap on scroll steps so infinite-scroll pages still finish.
    pub max_scroll_steps: u32,
    pub images_timeout_ms: u64,
    /// Fixed delay after everything else, before the screenshot.
    pub extra_wait_ms: u64,
    /// Lazy-load attributes promoted to `src`, in priority order.
    pub image_src_attrs: Vec<String>,
    /// Lazy-load attributes promoted to `srcset`, in priority order.
    pub image_srcset_attrs: Vec<String>,
    /// Lazy-load attributes promoted to `src` on `<video>` and `<source>`.
    pub video_src_attrs: Vec<String>,
    pub video: VideoConfig,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            dom_content_loaded_timeout_ms: 30_000,
            network_idle_timeout_ms: 20_000,
            network_quiet_ms: 500,
            poll_interval_ms: 100,
            scroll_step_px: 1000,
            scroll_pause_ms: 150,
            max_scroll_steps: 200,
            images_timeout_ms: 30_000,
            extra_wait_ms: 800,
            image_src_attrs: strings(&["data-src", "data-original", "data-lazy-src"]),
            image_srcset_attrs: strings(&["data-srcset", "data-lazy-srcset"]),
            video_src_attrs: strings(&["data-src", "data-original", "data-lazy-src"]),
            video: VideoConfig::default(),
        }
    }
}

impl ReadinessConfig {
    pub fn dom_content_loaded_timeout(&self) -> Duration {
        ms(self.dom_content_loaded_timeout_ms)
    }

    pub fn network_idle_timeout(&self) -> Duration {
        ms(self.network_idle_timeout_ms)
    }

    pub fn network_quiet(&self) -> Duration {
        ms(self.network_quiet_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        ms(self.poll_interval_ms)
    }

    pub fn images_timeout(&self) -> Duration {
        ms(self.images_timeout_ms)
    }

    pub fn extra_wait(&self) -> Duration {
        ms(self.extra_wait_ms)
    }
}

/// Global configuration loaded from `~/.config/pagecap/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Newline-delimited URL list (`#` starts a comment line).
    pub urls_file: PathBuf,
    /// Screenshots land in `<output_root>/<YYYY-MM-DD_HH-MM>/{desktop,mobile}/`.
    pub output_root: PathBuf,
    /// Captured alone when `urls_file` does not exist.
    pub default_url: String,
    pub navigation_timeout_ms: u64,
    /// Upper bound on one page visit: navigation, readiness and screenshot.
    pub page_timeout_ms: u64,
    pub desktop: DesktopConfig,
    pub mobile: MobileConfig,
    pub browser: LaunchConfig,
    pub readiness: ReadinessConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            urls_file: PathBuf::from("urls.txt"),
            output_root: PathBuf::from("screenshots"),
            default_url: DEFAULT_URL.to_string(),
            navigation_timeout_ms: 30_000,
            page_timeout_ms: 180_000,
            desktop: DesktopConfig::default(),
            mobile: MobileConfig::default(),
            browser: LaunchConfig::default(),
            readiness: ReadinessConfig::default(),
        }
    }
}

impl CaptureConfig {
    pub fn navigation_timeout(&self) -> Duration {
        ms(self.navigation_timeout_ms)
    }

    pub fn page_timeout(&self) -> Duration {
        ms(self.page_timeout_ms)
    }

    /// Rejects values that would make a wait loop spin or a viewport empty.
    pub fn validate(&self) -> Result<()> {
        if self.desktop.width == 0 || self.desktop.height == 0 {
            bail!("desktop viewport must be non-zero");
        }
        if self.desktop.device_scale_factor <= 0.0 {
            bail!("desktop device_scale_factor must be positive");
        }
        if devices::find(&self.mobile.device).is_none() {
            bail!(
                "unknown mobile device {:?} (known: {})",
                self.mobile.device,
                devices::names().join(", ")
            );
        }
        if self.readiness.poll_interval_ms == 0 {
            bail!("readiness.poll_interval_ms must be positive");
        }
        if self.readiness.scroll_step_px == 0 {
            bail!("readiness.scroll_step_px must be positive");
        }
        if !self.readiness.video.target_second.is_finite()
            || self.readiness.video.target_second < 0.0
        {
            bail!("readiness.video.target_second must be a non-negative number");
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("pagecap")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CaptureConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CaptureConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: CaptureConfig = toml::from_str(&data)?;
    Ok(cfg)
}
