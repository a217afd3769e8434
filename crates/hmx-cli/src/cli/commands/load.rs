//! Capture loading shared by the commands.

use anyhow::{Context, Result};
use hmx_core::capture::{self, Capture};
use std::path::Path;

/// Reads the capture at `arg`, or stdin when `arg` is `-`.
pub fn load(arg: &str) -> Result<Capture> {
    let capture = if arg == "-" {
        capture::read_capture(std::io::stdin().lock()).context("read capture from stdin")?
    } else {
        capture::load_capture(Path::new(arg))?
    };
    tracing::info!(
        source = arg,
        entries = capture.entries.len(),
        creator = capture.creator.as_deref().unwrap_or("-"),
        "capture loaded"
    );
    Ok(capture)
}
