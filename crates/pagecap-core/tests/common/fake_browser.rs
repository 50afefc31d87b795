//! In-process stand-in for Chromium used by the capture integration tests.
//!
//! Pages answer the readiness scripts with an already-settled page and write a
//! tiny PNG on screenshot. URLs can be configured to fail navigation or hang.

#![allow(dead_code)]

use async_trait::async_trait;
use pagecap_core::driver::{BrowserSession, DriverError, PageDriver, Platform};
use pagecap_core::readiness::scripts;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// PNG signature; enough for tests that only check files exist.
pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

/// What happened across all pages of a session.
#[derive(Debug, Default)]
pub struct SessionLog {
    pub opened: Vec<Platform>,
    pub visited: Vec<(Platform, String)>,
    pub screenshots: Vec<PathBuf>,
    pub pages_closed: usize,
    pub session_closed: bool,
}

#[derive(Default)]
pub struct FakeSession {
    fail_urls: HashSet<String>,
    hang_urls: HashSet<String>,
    broken_screenshot_urls: HashSet<String>,
    fail_platform: Option<Platform>,
    pub log: Arc<Mutex<SessionLog>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigation to `url` fails on every platform.
    pub fn failing(mut self, url: &str) -> Self {
        self.fail_urls.insert(url.to_string());
        self
    }

    /// Navigation to `url` never completes.
    pub fn hanging(mut self, url: &str) -> Self {
        self.hang_urls.insert(url.to_string());
        self
    }

    /// The screenshot of `url` fails after writing part of the file.
    pub fn broken_screenshot(mut self, url: &str) -> Self {
        self.broken_screenshot_urls.insert(url.to_string());
        self
    }

    /// Every page of `platform` fails to open.
    pub fn broken_platform(mut self, platform: Platform) -> Self {
        self.fail_platform = Some(platform);
        self
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Page = FakePage;

    async fn open_page(&self, platform: Platform) -> Result<FakePage, DriverError> {
        if self.fail_platform == Some(platform) {
            return Err(DriverError::Browser(format!("{platform} browser crashed")));
        }
        self.log.lock().unwrap().opened.push(platform);
        Ok(FakePage {
            platform,
            fail_urls: self.fail_urls.clone(),
            hang_urls: self.hang_urls.clone(),
            broken_screenshot_urls: self.broken_screenshot_urls.clone(),
            current_url: Mutex::new(None),
            log: Arc::clone(&self.log),
        })
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.log.lock().unwrap().session_closed = true;
        Ok(())
    }
}

pub struct FakePage {
    platform: Platform,
    fail_urls: HashSet<String>,
    hang_urls: HashSet<String>,
    broken_screenshot_urls: HashSet<String>,
    current_url: Mutex<Option<String>>,
    log: Arc<Mutex<SessionLog>>,
}

fn is_call(script: &str, function: &str) -> bool {
    script.starts_with(&format!("({function})("))
}

#[async_trait]
impl PageDriver for FakePage {
    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        if script == scripts::VIDEO_COUNT {
            return Ok(json!(0));
        }
        if is_call(script, scripts::AUTO_SCROLL) {
            return Ok(json!(1));
        }
        if is_call(script, scripts::PROMOTE_LAZY_IMAGES) {
            return Ok(json!({ "images": 0, "src": 0, "srcset": 0 }));
        }
        if is_call(script, scripts::PROMOTE_LAZY_VIDEOS) {
            return Ok(json!({ "videos": 0, "src": 0 }));
        }
        if script.contains("getEntriesByType") {
            return Ok(json!({ "complete": true, "resources": 3 }));
        }
        // IMAGES_READY and the DOM checks.
        Ok(json!(true))
    }

    async fn add_init_script(&self, _script: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        self.log
            .lock()
            .unwrap()
            .visited
            .push((self.platform, url.to_string()));
        *self.current_url.lock().unwrap() = Some(url.to_string());
        if self.hang_urls.contains(url) {
            std::future::pending::<()>().await;
        }
        if self.fail_urls.contains(url) {
            return Err(DriverError::Timeout {
                op: "navigation",
                after: timeout,
            });
        }
        Ok(())
    }

    async fn screenshot_full_page(&self, path: &Path) -> Result<(), DriverError> {
        let url = self.current_url.lock().unwrap().clone().unwrap_or_default();
        if self.broken_screenshot_urls.contains(&url) {
            std::fs::write(path, &FAKE_PNG[..4])?;
            return Err(DriverError::Browser("screenshot stream closed".into()));
        }
        std::fs::write(path, FAKE_PNG)?;
        self.log.lock().unwrap().screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.log.lock().unwrap().pages_closed += 1;
        Ok(())
    }
}
