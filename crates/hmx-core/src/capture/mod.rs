//! Capture (HAR) loading: turns an HTTP Archive into ordered capture entries.
//!
//! This is the only place a malformed input aborts a run; it fails before the
//! engine sees a single entry.

mod load;
mod parse;

use std::path::PathBuf;

pub use load::{load_capture, parse_capture, read_capture};

/// One recorded request/response exchange. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureEntry {
    pub url: String,
    /// Declared response content type; absent or wrong more often than not.
    pub content_type: Option<String>,
    /// Response body; empty when the browser did not keep it.
    pub payload: Vec<u8>,
    /// Position in the capture (tie-break for duplicates).
    pub sequence_index: usize,
    pub status: u16,
    pub started: Option<String>,
}

impl CaptureEntry {
    pub fn new(
        sequence_index: usize,
        url: impl Into<String>,
        content_type: Option<&str>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            url: url.into(),
            content_type: content_type.map(String::from),
            payload: payload.into(),
            sequence_index,
            status: 200,
            started: None,
        }
    }
}

/// A loaded capture: HAR metadata plus entries in recorded order.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    pub version: Option<String>,
    pub creator: Option<String>,
    pub entries: Vec<CaptureEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("read capture {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("capture is not valid HAR JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}
