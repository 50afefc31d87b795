//! Integration test: whole capture batches against the in-process fake browser.
//!
//! Checks file layout, per-URL failure isolation, page timeouts and name
//! collision handling without launching Chromium.

mod common;

use chrono::{Local, TimeZone};
use common::fake_browser::{FakeSession, FAKE_PNG};
use pagecap_core::capture::{self, CaptureEvent, PlatformTally};
use pagecap_core::config::CaptureConfig;
use pagecap_core::driver::Platform;
use pagecap_core::output::OutputLayout;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn fast_config() -> CaptureConfig {
    let mut cfg = CaptureConfig::default();
    cfg.readiness.poll_interval_ms = 5;
    cfg.readiness.network_quiet_ms = 10;
    cfg.readiness.extra_wait_ms = 0;
    cfg
}

fn layout(root: &Path) -> OutputLayout {
    let started = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
    OutputLayout::create_at(root, &started).unwrap()
}

fn pngs(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn urls(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn batch_writes_one_png_per_url_and_platform() {
    let root = tempdir().unwrap();
    let layout = layout(root.path());
    let mut session = FakeSession::new();
    let urls = urls(&["https://a.com/", "https://b.org/news/today?ref=x"]);

    let summary = capture::capture_batch(
        &mut session,
        &urls,
        &layout,
        &fast_config(),
        &Platform::ALL,
        None,
    )
    .await;

    assert_eq!(summary.urls, 2);
    assert_eq!(summary.captured(), 4);
    assert_eq!(summary.failed(), 0);
    let run_dir = root.path().join("2024-05-01_12-30");
    for platform in Platform::ALL {
        let dir = run_dir.join(platform.dir_name());
        assert_eq!(pngs(&dir), vec!["a.com.png", "b.org-news-today.png"]);
        assert_eq!(fs::read(dir.join("a.com.png")).unwrap(), FAKE_PNG);
    }

    let log = session.log.lock().unwrap();
    assert!(log.session_closed);
    assert_eq!(log.pages_closed, 4);
    assert_eq!(
        log.opened,
        vec![
            Platform::Desktop,
            Platform::Mobile,
            Platform::Desktop,
            Platform::Mobile
        ]
    );
}

#[tokio::test]
async fn failing_url_does_not_stop_the_batch() {
    let root = tempdir().unwrap();
    let layout = layout(root.path());
    let mut session = FakeSession::new().failing("https://down.example/");
    let urls = urls(&["https://a.com/", "https://down.example/", "https://c.net/"]);

    let summary = capture::capture_batch(
        &mut session,
        &urls,
        &layout,
        &fast_config(),
        &Platform::ALL,
        None,
    )
    .await;

    assert_eq!(
        summary.desktop,
        PlatformTally {
            captured: 2,
            failed: 1
        }
    );
    assert_eq!(summary.mobile, summary.desktop);
    for platform in Platform::ALL {
        assert_eq!(
            pngs(&layout.platform_dir(platform)),
            vec!["a.com.png", "c.net.png"]
        );
    }
    // The failing page is still closed.
    assert_eq!(session.log.lock().unwrap().pages_closed, 6);
}

#[tokio::test]
async fn desktop_failure_still_attempts_mobile() {
    let root = tempdir().unwrap();
    let layout = layout(root.path());
    let mut session = FakeSession::new().broken_platform(Platform::Desktop);

    let summary = capture::capture_batch(
        &mut session,
        &urls(&["https://a.com/"]),
        &layout,
        &fast_config(),
        &Platform::ALL,
        None,
    )
    .await;

    assert_eq!(summary.desktop.failed, 1);
    assert_eq!(summary.mobile.captured, 1);
    assert!(pngs(&layout.platform_dir(Platform::Desktop)).is_empty());
    assert_eq!(pngs(&layout.platform_dir(Platform::Mobile)), vec!["a.com.png"]);
}

#[tokio::test]
async fn hung_page_is_cut_off_by_page_timeout() {
    let root = tempdir().unwrap();
    let layout = layout(root.path());
    let mut session = FakeSession::new().hanging("https://slow.example/");
    let mut cfg = fast_config();
    cfg.page_timeout_ms = 200;

    let summary = capture::capture_batch(
        &mut session,
        &urls(&["https://slow.example/", "https://a.com/"]),
        &layout,
        &cfg,
        &[Platform::Desktop],
        None,
    )
    .await;

    assert_eq!(
        summary.desktop,
        PlatformTally {
            captured: 1,
            failed: 1
        }
    );
    assert_eq!(summary.mobile, PlatformTally::default());
    assert_eq!(pngs(&layout.platform_dir(Platform::Desktop)), vec!["a.com.png"]);
    assert!(pngs(&layout.platform_dir(Platform::Mobile)).is_empty());
}

#[tokio::test]
async fn failed_capture_keeps_an_earlier_runs_file() {
    let root = tempdir().unwrap();
    let layout = layout(root.path());
    let desktop = layout.platform_dir(Platform::Desktop);
    fs::write(desktop.join("down.example.png"), b"earlier run").unwrap();
    fs::write(desktop.join("broken.example.png"), b"earlier run").unwrap();
    let mut session = FakeSession::new()
        .failing("https://down.example/")
        .broken_screenshot("https://broken.example/");

    let summary = capture::capture_batch(
        &mut session,
        &urls(&["https://down.example/", "https://broken.example/"]),
        &layout,
        &fast_config(),
        &[Platform::Desktop],
        None,
    )
    .await;

    assert_eq!(summary.desktop.failed, 2);
    assert_eq!(
        pngs(&desktop),
        vec!["broken.example.png", "down.example.png"],
        "no partial file may be left behind"
    );
    assert_eq!(fs::read(desktop.join("down.example.png")).unwrap(), b"earlier run");
    assert_eq!(fs::read(desktop.join("broken.example.png")).unwrap(), b"earlier run");
}

#[tokio::test]
async fn successful_capture_replaces_an_earlier_runs_file() {
    let root = tempdir().unwrap();
    let layout = layout(root.path());
    let mobile = layout.platform_dir(Platform::Mobile);
    fs::write(mobile.join("a.com.png"), b"earlier run").unwrap();
    let mut session = FakeSession::new();

    capture::capture_batch(
        &mut session,
        &urls(&["https://a.com/"]),
        &layout,
        &fast_config(),
        &[Platform::Mobile],
        None,
    )
    .await;

    assert_eq!(pngs(&mobile), vec!["a.com.png"]);
    assert_eq!(fs::read(mobile.join("a.com.png")).unwrap(), FAKE_PNG);
}

#[tokio::test]
async fn colliding_names_get_suffixed_files() {
    let root = tempdir().unwrap();
    let layout = layout(root.path());
    let mut session = FakeSession::new();
    let urls = urls(&[
        "https://a.com/x?y=1",
        "https://a.com/x?y=2",
        "https://a.com/x#top",
    ]);

    let summary = capture::capture_batch(
        &mut session,
        &urls,
        &layout,
        &fast_config(),
        &[Platform::Mobile],
        None,
    )
    .await;

    assert_eq!(summary.collisions, 2);
    assert_eq!(
        pngs(&layout.platform_dir(Platform::Mobile)),
        vec!["a.com-x-2.png", "a.com-x-3.png", "a.com-x.png"]
    );
}

#[tokio::test]
async fn events_follow_the_batch() {
    let root = tempdir().unwrap();
    let layout = layout(root.path());
    let session = FakeSession::new().failing("https://down.example/");
    let (tx, mut rx) = tokio::sync::mpsc::channel(64);

    let summary = capture::capture_all(
        &session,
        &urls(&["https://a.com/", "https://down.example/"]),
        &layout,
        &fast_config(),
        &[Platform::Desktop],
        Some(&tx),
    )
    .await;
    drop(tx);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert_eq!(events.len(), 4);
    match &events[0] {
        CaptureEvent::UrlStarted {
            index, total, name, ..
        } => {
            assert_eq!((*index, *total), (0, 2));
            assert_eq!(name, "a.com");
        }
        other => panic!("expected UrlStarted, got {other:?}"),
    }
    match &events[1] {
        CaptureEvent::PlatformCaptured { path, report, .. } => {
            assert!(path.ends_with("desktop/a.com.png"));
            assert!(report.dom_content_loaded);
            assert!(report.network_idle);
            assert!(report.images_settled);
        }
        other => panic!("expected PlatformCaptured, got {other:?}"),
    }
    match &events[3] {
        CaptureEvent::PlatformFailed {
            url,
            platform,
            error,
        } => {
            assert_eq!(url, "https://down.example/");
            assert_eq!(*platform, Platform::Desktop);
            assert!(error.contains("navigation"), "{error}");
        }
        other => panic!("expected PlatformFailed, got {other:?}"),
    }
    assert_eq!(summary.failed(), 1);
    // capture_all leaves the session open for the caller.
    assert!(!session.log.lock().unwrap().session_closed);
}
