//! Media candidates: the unit every engine stage produces or refines.

use serde::Serialize;

use crate::classify::container_content_type;
use crate::reassemble::CombinedStream;

/// Candidate kinds, declared in presentation order (images first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Image,
    ContainerFragment,
    Unresolved,
}

/// High for responses seen in the capture, low for identifiers mined from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Low,
}

/// Completeness of the combined stream attached to a fragment candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamStatus {
    pub complete: bool,
    pub has_init: bool,
    pub missing: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCandidate {
    pub kind: CandidateKind,
    pub url: String,
    /// Unique key in the aggregated set: normalized URL, or group key for streams.
    pub identity: String,
    pub payload: Option<Vec<u8>>,
    /// Capture position this candidate originates from.
    pub sequence_index: usize,
    pub content_type: Option<String>,
    pub confidence: Confidence,
    /// For mined candidates: the response the reference was found in.
    pub referrer: Option<String>,
    pub stream: Option<StreamStatus>,
}

impl MediaCandidate {
    /// Image seen in the capture; its body is already the payload.
    pub fn image(
        url: &str,
        content_type: Option<String>,
        payload: Vec<u8>,
        sequence_index: usize,
    ) -> Self {
        Self {
            kind: CandidateKind::Image,
            url: url.to_string(),
            identity: normalize_url(url),
            payload: Some(payload),
            sequence_index,
            content_type,
            confidence: Confidence::High,
            referrer: None,
            stream: None,
        }
    }

    /// Stand-in for a fragment group until its stream is reassembled.
    pub fn placeholder(group_key: &str, url: &str, sequence_index: usize) -> Self {
        Self {
            kind: CandidateKind::Unresolved,
            url: url.to_string(),
            identity: group_key.to_string(),
            payload: None,
            sequence_index,
            content_type: None,
            confidence: Confidence::High,
            referrer: None,
            stream: None,
        }
    }

    /// Reference found inside another response body; URL only.
    pub fn mined(url: &str, referrer: &str, sequence_index: usize) -> Self {
        Self {
            kind: CandidateKind::Unresolved,
            url: url.to_string(),
            identity: normalize_url(url),
            payload: None,
            sequence_index,
            content_type: None,
            confidence: Confidence::Low,
            referrer: Some(referrer.to_string()),
            stream: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.payload.is_some()
    }

    /// Converts a group placeholder into a resolved container candidate.
    /// The content type comes from the stream's leading bytes; when those are
    /// not recognised the placeholder keeps the type its first fragment declared.
    pub fn attach_stream(&mut self, stream: &CombinedStream) {
        self.kind = CandidateKind::ContainerFragment;
        self.payload = Some(stream.payload.clone());
        if let Some(ct) = container_content_type(&stream.payload) {
            self.content_type = Some(ct.to_string());
        }
        self.stream = Some(stream.status());
    }
}

/// Identity for a URL: parsed and re-serialized without the `#fragment`.
/// Unparseable input is only trimmed.
pub fn normalize_url(url: &str) -> String {
    match url::Url::parse(url.trim()) {
        Ok(mut u) => {
            u.set_fragment(None);
            u.to_string()
        }
        Err(_) => url.trim().to_string(),
    }
}
