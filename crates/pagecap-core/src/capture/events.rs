//! Progress events and the end-of-run summary.

use std::path::PathBuf;

use crate::driver::Platform;
use crate::readiness::ReadinessReport;

/// Emitted by [`super::capture_all`] as the batch progresses.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// `index` is zero-based.
    UrlStarted {
        index: usize,
        total: usize,
        url: String,
        name: String,
    },
    PlatformCaptured {
        url: String,
        platform: Platform,
        path: PathBuf,
        report: ReadinessReport,
    },
    PlatformFailed {
        url: String,
        platform: Platform,
        error: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformTally {
    pub captured: usize,
    pub failed: usize,
}

/// Totals of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    pub urls: usize,
    pub desktop: PlatformTally,
    pub mobile: PlatformTally,
    /// URLs whose screenshot name needed a `-N` suffix.
    pub collisions: usize,
}

impl CaptureSummary {
    pub fn tally(&self, platform: Platform) -> PlatformTally {
        match platform {
            Platform::Desktop => self.desktop,
            Platform::Mobile => self.mobile,
        }
    }

    fn tally_mut(&mut self, platform: Platform) -> &mut PlatformTally {
        match platform {
            Platform::Desktop => &mut self.desktop,
            Platform::Mobile => &mut self.mobile,
        }
    }

    pub(super) fn record(&mut self, platform: Platform, captured: bool) {
        let tally = self.tally_mut(platform);
        if captured {
            tally.captured += 1;
        } else {
            tally.failed += 1;
        }
    }

    pub fn captured(&self) -> usize {
        self.desktop.captured + self.mobile.captured
    }

    pub fn failed(&self) -> usize {
        self.desktop.failed + self.mobile.failed
    }
}
