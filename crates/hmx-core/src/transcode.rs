//! Optional WebM → MP4 conversion of combined streams with an external ffmpeg.
//!
//! Conversion output is a convenience copy; any failure here leaves the
//! container file untouched and is only reported.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::classify::has_container_signature;
use crate::config::TranscodeConfig;
use crate::output::temp_path;

const STDERR_TAIL: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("ffmpeg not available: {0}")]
    ToolUnavailable(String),
    #[error("ffmpeg exited with {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },
    #[error("ffmpeg did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// True for payloads worth handing to the transcoder.
pub fn should_transcode(payload: &[u8]) -> bool {
    has_container_signature(payload)
}

#[derive(Debug, Clone)]
pub struct Transcoder {
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl Transcoder {
    /// Uses `transcode.ffmpeg_path` when set, else looks `ffmpeg` up on PATH.
    pub fn locate(cfg: &TranscodeConfig) -> Result<Self, TranscodeError> {
        let ffmpeg = match &cfg.ffmpeg_path {
            Some(path) if path.is_file() => path.clone(),
            Some(path) => {
                return Err(TranscodeError::ToolUnavailable(format!(
                    "{} does not exist",
                    path.display()
                )))
            }
            None => which::which("ffmpeg")
                .map_err(|e| TranscodeError::ToolUnavailable(e.to_string()))?,
        };
        tracing::debug!(ffmpeg = %ffmpeg.display(), "transcoder ready");
        Ok(Self::with_binary(ffmpeg, Duration::from_secs(cfg.timeout_secs)))
    }

    pub fn with_binary(ffmpeg: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            timeout,
        }
    }

    /// Converts `input` to an `.mp4` next to it and returns the new path.
    /// ffmpeg writes to a `.part` file that is renamed only on success.
    pub async fn to_mp4(&self, input: &Path) -> Result<PathBuf, TranscodeError> {
        let output = input.with_extension("mp4");
        let partial = temp_path(&output);

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(input)
            .args([
                "-c:v",
                "libx264",
                "-c:a",
                "aac",
                "-movflags",
                "+faststart",
                "-f",
                "mp4",
            ])
            .arg(&partial)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let result = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result,
            Err(_) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(TranscodeError::TimedOut(self.timeout));
            }
        };
        let out = result?;
        if !out.status.success() {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(TranscodeError::Failed {
                status: out.status.code(),
                stderr: stderr_tail(&out.stderr),
            });
        }

        tokio::fs::rename(&partial, &output).await?;
        tracing::info!(input = %input.display(), output = %output.display(), "transcoded");
        Ok(output)
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let mut start = text.len().saturating_sub(STDERR_TAIL);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
