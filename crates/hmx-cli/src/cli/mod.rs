//! CLI for hmx, the HAR media extractor.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hmx_core::config::{self, HmxConfig};
use std::path::PathBuf;

use commands::{run_extract, run_scan};

/// Top-level CLI for hmx.
#[derive(Debug, Parser)]
#[command(name = "hmx")]
#[command(about = "HMX: extract images and canvas videos from HAR captures", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Extract media from a capture: save images, rebuild canvas streams, write a report.
    Extract {
        /// HAR file to read, or `-` for stdin.
        capture: String,

        /// Output folder (default from config: `har_extracted`).
        #[arg(long, short, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Do not fetch references that have no captured body.
        #[arg(long)]
        no_download: bool,

        /// Do not convert rebuilt WebM streams to MP4.
        #[arg(long)]
        no_transcode: bool,

        /// Concurrent downloads (default from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// List what a capture contains without writing anything.
    Scan {
        /// HAR file to read, or `-` for stdin.
        capture: String,
    },
}

/// Command-line flags that override the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub output: Option<PathBuf>,
    pub no_download: bool,
    pub no_transcode: bool,
    pub jobs: Option<usize>,
}

impl Overrides {
    pub fn apply(&self, cfg: &mut HmxConfig) {
        if let Some(dir) = &self.output {
            cfg.output_dir = dir.clone();
        }
        if self.no_download {
            cfg.download.enabled = false;
        }
        if self.no_transcode {
            cfg.transcode.enabled = false;
        }
        if let Some(jobs) = self.jobs {
            cfg.download.jobs = jobs.max(1);
        }
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Extract {
                capture,
                output,
                no_download,
                no_transcode,
                jobs,
            } => {
                Overrides {
                    output,
                    no_download,
                    no_transcode,
                    jobs,
                }
                .apply(&mut cfg);
                run_extract(&cfg, &capture).await?;
            }
            CliCommand::Scan { capture } => run_scan(&cfg, &capture)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
