//! Load a HAR file (or stdin) into ordered capture entries.

use base64::engine::general_purpose;
use base64::Engine as _;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::parse::{HarContent, HarEntry, HarHeader, HarLog, HarRoot};
use super::{Capture, CaptureEntry, CaptureError};

/// Reads and parses a HAR file from disk.
pub fn load_capture(path: &Path) -> Result<Capture, CaptureError> {
    let bytes = std::fs::read(path).map_err(|source| CaptureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_capture(&bytes)
}

/// Reads a whole HAR document from `reader` (e.g. stdin) and parses it.
pub fn read_capture<R: Read>(mut reader: R) -> Result<Capture, CaptureError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| CaptureError::Io {
            path: PathBuf::from("-"),
            source,
        })?;
    parse_capture(&bytes)
}

/// Parses HAR JSON. A document that is not JSON, or has no `log.entries`,
/// is rejected as a whole; problems inside a single entry only empty that
/// entry's payload.
pub fn parse_capture(bytes: &[u8]) -> Result<Capture, CaptureError> {
    let har: HarLog = serde_json::from_slice(bytes)?;
    let HarRoot {
        version,
        creator,
        entries,
    } = har.log;

    let entries = entries
        .into_iter()
        .enumerate()
        .map(|(i, e)| into_capture_entry(i, e))
        .collect::<Vec<_>>();
    tracing::debug!(entries = entries.len(), "parsed capture");

    Ok(Capture {
        version: version.filter(|v| !v.is_empty()),
        creator: creator.map(|c| {
            if c.version.is_empty() {
                c.name
            } else {
                format!("{} {}", c.name, c.version)
            }
        }),
        entries,
    })
}

fn into_capture_entry(sequence_index: usize, entry: HarEntry) -> CaptureEntry {
    let content_type = get_header(&entry.response.headers, "Content-Type")
        .or(entry.response.content.mime_type.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);
    let payload = decode_body(&entry.request.url, &entry.response.content);

    CaptureEntry {
        url: entry.request.url,
        content_type,
        payload,
        sequence_index,
        status: entry.response.status,
        started: entry.started_date_time,
    }
}

fn decode_body(url: &str, content: &HarContent) -> Vec<u8> {
    let Some(text) = content.text.as_deref() else {
        return Vec::new();
    };
    let is_base64 = content
        .encoding
        .as_deref()
        .is_some_and(|e| e.eq_ignore_ascii_case("base64"));
    if !is_base64 {
        return text.as_bytes().to_vec();
    }
    match general_purpose::STANDARD.decode(text.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(url, "base64 body decode failed, treating as empty: {}", e);
            Vec::new()
        }
    }
}

fn get_header<'a>(headers: &'a [HarHeader], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}
