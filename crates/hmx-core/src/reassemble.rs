//! Segment reassembler: concatenates one frozen fragment group into a single
//! container byte stream.
//!
//! Output order is the initialization fragment, numbered media fragments
//! ascending, then unnumbered media in capture order. Bytes are copied as-is.
//! Missing pieces never stop reassembly; they are reported on the stream so
//! callers can warn.

use serde::Serialize;

use crate::candidate::StreamStatus;
use crate::group::FragmentGroup;

/// Upper bound on reported missing numbers for one stream.
const MAX_MISSING_REPORTED: usize = 65_536;

/// Non-fatal problems found while reassembling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamWarning {
    MissingInitialization,
    SequenceGap { missing: Vec<u64> },
}

/// Reassembled stream for one group. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedStream {
    pub key: String,
    pub payload: Vec<u8>,
    /// Init present and media numbers contiguous from the smallest one seen.
    pub complete: bool,
    pub has_init: bool,
    pub missing: Vec<u64>,
    pub fragments: usize,
    pub unnumbered: usize,
    pub warnings: Vec<StreamWarning>,
}

impl CombinedStream {
    pub fn status(&self) -> StreamStatus {
        StreamStatus {
            complete: self.complete,
            has_init: self.has_init,
            missing: self.missing.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReassembleError {
    #[error("fragment group {key} has no fragments")]
    EmptyGroup { key: String },
}

pub fn reassemble(group: &FragmentGroup) -> Result<CombinedStream, ReassembleError> {
    if group.is_empty() {
        return Err(ReassembleError::EmptyGroup {
            key: group.key().to_string(),
        });
    }

    let numbers: Vec<u64> = group.media().map(|(n, _)| n).collect();
    let missing = missing_numbers(&numbers);
    let has_init = group.init().is_some();

    let ordered = group
        .init()
        .into_iter()
        .chain(group.media().map(|(_, f)| f))
        .chain(group.unnumbered());
    let total: usize = ordered.clone().map(|f| f.payload.len()).sum();
    let mut payload = Vec::with_capacity(total);
    for fragment in ordered {
        payload.extend_from_slice(&fragment.payload);
    }

    let mut warnings = Vec::new();
    if !has_init {
        tracing::warn!(key = group.key(), "no initialization fragment; stream will not be playable on its own");
        warnings.push(StreamWarning::MissingInitialization);
    }
    if !missing.is_empty() {
        tracing::warn!(key = group.key(), missing = ?missing, "media sequence has gaps");
        warnings.push(StreamWarning::SequenceGap {
            missing: missing.clone(),
        });
    }
    if !group.unnumbered().is_empty() {
        tracing::debug!(
            key = group.key(),
            count = group.unnumbered().len(),
            "appending unnumbered fragments in capture order"
        );
    }

    Ok(CombinedStream {
        key: group.key().to_string(),
        payload,
        complete: has_init && missing.is_empty(),
        has_init,
        missing,
        fragments: group.len(),
        unnumbered: group.unnumbered().len(),
        warnings,
    })
}

/// Numbers absent between the smallest and largest of `sorted` (ascending).
fn missing_numbers(sorted: &[u64]) -> Vec<u64> {
    sorted
        .windows(2)
        .flat_map(|w| (w[0] + 1)..w[1])
        .take(MAX_MISSING_REPORTED)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{Fragment, SegmentHint};

    fn frag(index: usize, payload: &[u8]) -> Fragment {
        Fragment {
            url: format!("https://canvaz.scdn.co/f{index}"),
            sequence_index: index,
            payload: payload.to_vec(),
        }
    }

    fn group_with(init: Option<&str>, media: &[(u64, &str)]) -> FragmentGroup {
        let mut g = FragmentGroup::new("canvas");
        let mut index = 0;
        if let Some(i) = init {
            g.insert(frag(index, i.as_bytes()), SegmentHint::Init);
            index += 1;
        }
        for (n, p) in media {
            g.insert(frag(index, p.as_bytes()), SegmentHint::Number(*n));
            index += 1;
        }
        g
    }

    #[test]
    fn contiguous_run_is_exact_concatenation() {
        let g = group_with(Some("INIT"), &[(1, "m1"), (2, "m2"), (3, "m3")]);
        let s = reassemble(&g).unwrap();
        assert_eq!(s.payload, b"INITm1m2m3");
        assert!(s.complete);
        assert!(s.missing.is_empty());
        assert!(s.warnings.is_empty());
        assert_eq!(s.fragments, 4);
    }

    #[test]
    fn out_of_order_arrival_is_sorted() {
        let g = group_with(Some("I"), &[(2, "c"), (0, "a"), (1, "b")]);
        assert_eq!(reassemble(&g).unwrap().payload, b"Iabc");
    }

    #[test]
    fn gap_is_reported_but_output_still_produced() {
        let g = group_with(Some("I"), &[(0, "0"), (1, "1"), (3, "3")]);
        let s = reassemble(&g).unwrap();
        assert!(!s.complete);
        assert_eq!(s.missing, vec![2]);
        assert_eq!(s.payload, b"I013");
        assert_eq!(s.warnings, vec![StreamWarning::SequenceGap { missing: vec![2] }]);
    }

    #[test]
    fn run_may_start_above_zero() {
        let g = group_with(Some("I"), &[(5, "5"), (6, "6")]);
        let s = reassemble(&g).unwrap();
        assert!(s.complete);
        assert_eq!(s.payload, b"I56");
    }

    #[test]
    fn missing_init_is_incomplete_and_not_guessed() {
        let g = group_with(None, &[(0, "a"), (1, "b")]);
        let s = reassemble(&g).unwrap();
        assert!(!s.complete);
        assert!(!s.has_init);
        assert_eq!(s.payload, b"ab");
        assert_eq!(s.warnings, vec![StreamWarning::MissingInitialization]);
    }

    #[test]
    fn unnumbered_media_goes_last() {
        let mut g = group_with(Some("I"), &[(0, "a")]);
        g.insert(frag(7, b"z"), SegmentHint::Unknown);
        let s = reassemble(&g).unwrap();
        assert_eq!(s.payload, b"Iaz");
        assert_eq!(s.unnumbered, 1);
        assert!(s.complete);
    }

    #[test]
    fn empty_group_errors() {
        let g = FragmentGroup::new("empty");
        assert_eq!(
            reassemble(&g),
            Err(ReassembleError::EmptyGroup {
                key: "empty".to_string()
            })
        );
    }
}
