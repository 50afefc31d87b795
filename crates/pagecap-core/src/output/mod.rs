//! Screenshot output layout.
//!
//! One run writes to `<root>/<YYYY-MM-DD_HH-MM>/{desktop,mobile}/<name>.png`.
//! The run folder name is fixed when the layout is created, so every URL of
//! one invocation lands in the same folder.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::driver::Platform;

/// `strftime` pattern of the per-run folder.
pub const RUN_FOLDER_FORMAT: &str = "%Y-%m-%d_%H-%M";

/// Screenshot file extension.
pub const SCREENSHOT_EXT: &str = "png";

/// Folder name for a run started at `started`.
pub fn run_folder_name(started: &DateTime<Local>) -> String {
    started.format(RUN_FOLDER_FORMAT).to_string()
}

/// Directories of one capture run.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    run_dir: PathBuf,
}

impl OutputLayout {
    /// Layout for a run started now.
    pub fn create(root: &Path) -> Result<Self> {
        Self::create_at(root, &Local::now())
    }

    /// Creates `<root>/<run folder>/desktop` and `.../mobile`.
    ///
    /// Existing folders are reused (two runs in the same minute share one).
    pub fn create_at(root: &Path, started: &DateTime<Local>) -> Result<Self> {
        let layout = Self {
            run_dir: root.join(run_folder_name(started)),
        };
        for platform in Platform::ALL {
            let dir = layout.platform_dir(platform);
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating output directory {}", dir.display()))?;
        }
        tracing::info!(dir = %layout.run_dir.display(), "output directories ready");
        Ok(layout)
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn platform_dir(&self, platform: Platform) -> PathBuf {
        self.run_dir.join(platform.dir_name())
    }

    /// Path of the screenshot named `stem` for `platform`.
    pub fn screenshot_path(&self, platform: Platform, stem: &str) -> PathBuf {
        self.platform_dir(platform)
            .join(format!("{stem}.{SCREENSHOT_EXT}"))
    }
}
