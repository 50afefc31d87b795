//! CLI for pagecap, the desktop/mobile full-page screenshot batcher.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use pagecap_core::config;
use pagecap_core::driver::Platform;
use std::path::PathBuf;

use commands::{run_capture, run_devices, run_name, RunOverrides};

/// Top-level CLI for pagecap.
#[derive(Debug, Parser)]
#[command(name = "pagecap")]
#[command(about = "pagecap: full-page desktop and mobile screenshots of a URL list", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Which viewports to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    Both,
    Desktop,
    Mobile,
}

impl PlatformArg {
    pub fn platforms(self) -> &'static [Platform] {
        match self {
            PlatformArg::Both => &Platform::ALL,
            PlatformArg::Desktop => &[Platform::Desktop],
            PlatformArg::Mobile => &[Platform::Mobile],
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Capture every URL of the list into a new timestamped folder.
    Run {
        /// URL list file (one URL per line, `#` comments). Overrides `urls_file`.
        #[arg(long, value_name = "FILE")]
        urls: Option<PathBuf>,
        /// Output root. Overrides `output_root`.
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Viewports to capture.
        #[arg(long, value_enum, default_value = "both")]
        platform: PlatformArg,
        /// Mobile device profile (see `pagecap devices`).
        #[arg(long, value_name = "NAME")]
        device: Option<String>,
        /// Chrome/Chromium executable.
        #[arg(long, value_name = "PATH")]
        chrome: Option<PathBuf>,
    },

    /// Print the screenshot file name each URL would get.
    Name {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// List the built-in mobile device profiles.
    Devices,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run {
                urls,
                out,
                platform,
                device,
                chrome,
            } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                let overrides = RunOverrides {
                    urls_file: urls,
                    output_root: out,
                    device,
                    chrome_path: chrome,
                };
                run_capture(cfg, overrides, platform.platforms()).await?;
            }
            CliCommand::Name { urls } => run_name(&urls),
            CliCommand::Devices => run_devices(),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
