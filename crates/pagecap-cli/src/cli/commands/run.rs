//! `pagecap run` – capture every URL of the list.

use anyhow::{bail, Result};
use pagecap_core::capture::{self, CaptureEvent};
use pagecap_core::config::CaptureConfig;
use pagecap_core::driver::Platform;
use pagecap_core::url_list;
use std::path::PathBuf;

/// Command-line values that take precedence over config.toml.
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub urls_file: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub device: Option<String>,
    pub chrome_path: Option<PathBuf>,
}

impl RunOverrides {
    pub fn apply(self, cfg: &mut CaptureConfig) {
        if let Some(path) = self.urls_file {
            cfg.urls_file = path;
        }
        if let Some(root) = self.output_root {
            cfg.output_root = root;
        }
        if let Some(device) = self.device {
            cfg.mobile.device = device;
        }
        if let Some(chrome) = self.chrome_path {
            cfg.browser.chrome_path = Some(chrome);
        }
    }
}

fn print_event(event: &CaptureEvent) {
    match event {
        CaptureEvent::UrlStarted {
            index, total, url, ..
        } => println!("[{}/{}] {}", index + 1, total, url),
        CaptureEvent::PlatformCaptured { platform, path, .. } => {
            println!("  {:<8} saved {}", platform, path.display())
        }
        CaptureEvent::PlatformFailed {
            platform, error, ..
        } => println!("  {:<8} failed: {}", platform, error),
    }
}

pub async fn run_capture(
    mut cfg: CaptureConfig,
    overrides: RunOverrides,
    platforms: &[Platform],
) -> Result<()> {
    overrides.apply(&mut cfg);
    cfg.validate()?;

    let urls = url_list::read_urls(&cfg.urls_file, &cfg.default_url)?;
    if urls.is_empty() {
        bail!(
            "No URLs to capture. Add some lines into {}",
            cfg.urls_file.display()
        );
    }
    println!("Capturing {} URL(s)", urls.len());

    let (event_tx, mut event_rx) = tokio::sync::mpsc::channel::<CaptureEvent>(16);
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    let result = capture::run(&urls, &cfg, platforms, Some(&event_tx)).await;
    drop(event_tx);
    let _ = printer.await;
    let (layout, summary) = result?;

    println!(
        "Captured {} screenshot(s), {} failed ({} desktop, {} mobile).",
        summary.captured(),
        summary.failed(),
        summary.desktop.captured,
        summary.mobile.captured
    );
    if summary.collisions > 0 {
        println!(
            "{} URL(s) shared a name with an earlier one and got a numeric suffix.",
            summary.collisions
        );
    }
    println!("Done. Check the '{}' folder.", layout.run_dir().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let mut cfg = CaptureConfig::default();
        RunOverrides {
            urls_file: Some(PathBuf::from("list.txt")),
            output_root: None,
            device: Some("Pixel 5".to_string()),
            chrome_path: Some(PathBuf::from("/usr/bin/chromium")),
        }
        .apply(&mut cfg);

        assert_eq!(cfg.urls_file, PathBuf::from("list.txt"));
        assert_eq!(cfg.output_root, PathBuf::from("screenshots"));
        assert_eq!(cfg.mobile.device, "Pixel 5");
        assert_eq!(
            cfg.browser.chrome_path,
            Some(PathBuf::from("/usr/bin/chromium"))
        );
    }

    #[test]
    fn no_overrides_keep_config() {
        let mut cfg = CaptureConfig::default();
        RunOverrides::default().apply(&mut cfg);
        assert_eq!(cfg.urls_file, PathBuf::from("urls.txt"));
        assert_eq!(cfg.mobile.device, "iPhone 12");
        assert!(cfg.browser.chrome_path.is_none());
    }

    #[tokio::test]
    async fn empty_url_list_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("urls.txt");
        std::fs::write(&list, "# nothing yet\n\n").unwrap();

        let overrides = RunOverrides {
            urls_file: Some(list),
            output_root: Some(dir.path().join("shots")),
            ..RunOverrides::default()
        };
        let err = run_capture(CaptureConfig::default(), overrides, &Platform::ALL)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("No URLs to capture"), "{err}");
        assert!(!dir.path().join("shots").exists());
    }
}
