//! Extraction engine: classification, grouping, reassembly, mining and
//! aggregation for one capture.
//!
//! Pure and synchronous: no network, no disk. Configuration is passed in
//! explicitly; nothing here reads process-wide state.

use std::collections::BTreeMap;

use crate::aggregate::aggregate;
use crate::candidate::MediaCandidate;
use crate::capture::CaptureEntry;
use crate::classify::Classifier;
use crate::config::{ClassifierConfig, MiningConfig};
use crate::group::{FragmentGrouper, GroupError};
use crate::mine::ReferenceMiner;
use crate::reassemble::{reassemble, CombinedStream, ReassembleError};
use crate::scan::{scan, ScanStats, Scanned};

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub classifier: ClassifierConfig,
    /// `None` disables reference mining.
    pub mining: Option<MiningConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid media identifier pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error(transparent)]
    Group(#[from] GroupError),
}

/// A group that could not be reassembled. Its placeholder stays unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFailure {
    pub key: String,
    pub error: ReassembleError,
}

/// Everything one engine run produces.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Final set: unique identities, images then containers then unresolved.
    pub candidates: Vec<MediaCandidate>,
    /// Combined streams by group key.
    pub streams: Vec<CombinedStream>,
    pub failures: Vec<GroupFailure>,
    pub stats: ScanStats,
    /// References found by the miner before deduplication.
    pub mined: usize,
    /// Candidates dropped by the aggregator in favour of a fresher one.
    pub superseded: usize,
}

impl Extraction {
    pub fn stream(&self, key: &str) -> Option<&CombinedStream> {
        self.streams.iter().find(|s| s.key == key)
    }
}

pub struct Engine {
    classifier: Classifier,
    miner: Option<ReferenceMiner>,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let classifier = Classifier::from_patterns(
            &config.classifier.image_patterns,
            &config.classifier.container_patterns,
        );
        let miner = match &config.mining {
            Some(mining) => Some(ReferenceMiner::new(mining, classifier.clone())?),
            None => None,
        };
        Ok(Self { classifier, miner })
    }

    pub fn run<I>(&self, entries: I) -> Result<Extraction, EngineError>
    where
        I: IntoIterator<Item = CaptureEntry>,
    {
        let mut grouper = FragmentGrouper::new();
        let mut images = Vec::new();
        let mut placeholders = Vec::new();
        let mut mined = Vec::new();

        let mut scanner = scan(entries, &self.classifier, &mut grouper);
        for item in scanner.by_ref() {
            match item {
                Scanned::Image(candidate) => images.push(candidate),
                Scanned::Group(candidate) => placeholders.push(candidate),
                Scanned::Ignored(entry) => {
                    if let Some(miner) = &self.miner {
                        if looks_like_json(&entry) {
                            mined.extend(miner.mine(
                                &entry.payload,
                                &entry.url,
                                entry.sequence_index,
                            ));
                        }
                    }
                }
            }
        }
        let stats = scanner.into_stats();
        let groups = grouper.close()?;

        let mut streams = BTreeMap::new();
        let mut failures = Vec::new();
        for (key, group) in &groups {
            match reassemble(group) {
                Ok(stream) => {
                    streams.insert(key.clone(), stream);
                }
                Err(error) => {
                    tracing::warn!(key = %key, "group not reassembled: {}", error);
                    failures.push(GroupFailure {
                        key: key.clone(),
                        error,
                    });
                }
            }
        }
        for placeholder in &mut placeholders {
            if let Some(stream) = streams.get(&placeholder.identity) {
                placeholder.attach_stream(stream);
            }
        }

        let mined_count = mined.len();
        let aggregated = aggregate(images, placeholders, mined);
        tracing::info!(
            entries = stats.entries,
            candidates = aggregated.candidates.len(),
            groups = streams.len(),
            mined = mined_count,
            "extraction finished"
        );

        Ok(Extraction {
            candidates: aggregated.candidates,
            streams: streams.into_values().collect(),
            failures,
            stats,
            mined: mined_count,
            superseded: aggregated.superseded,
        })
    }
}

fn looks_like_json(entry: &CaptureEntry) -> bool {
    if let Some(ct) = &entry.content_type {
        if ct.to_ascii_lowercase().contains("json") {
            return true;
        }
    }
    matches!(
        entry.payload.iter().find(|b| !b.is_ascii_whitespace()),
        Some(b'{') | Some(b'[')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{CandidateKind, Confidence};

    const ID: &str = "ab67616d0000b273aaaaaaaaaaaaaaaaaaaaaaaa";

    fn engine() -> Engine {
        Engine::new(&EngineConfig {
            mining: Some(MiningConfig::default()),
            ..EngineConfig::default()
        })
        .unwrap()
    }

    fn entry(i: usize, url: &str, ct: Option<&str>, payload: &[u8]) -> CaptureEntry {
        CaptureEntry::new(i, url, ct, payload)
    }

    #[test]
    fn only_empty_entries_give_empty_set() {
        let out = engine()
            .run(vec![
                entry(0, "https://i.scdn.co/image/a", Some("image/jpeg"), b""),
                entry(1, "https://canvaz.scdn.co/c_seg0", None, b""),
                entry(2, "https://api.spotify.com/v1/me", Some("application/json"), b""),
            ])
            .unwrap();
        assert!(out.candidates.is_empty());
        assert!(out.streams.is_empty());
        assert_eq!(out.stats.empty_skipped, 3);
    }

    #[test]
    fn single_image_entry() {
        let body = [7u8; 17];
        let out = engine()
            .run(vec![entry(
                0,
                "https://i.scdn.co/image/abc.jpg",
                Some("image/jpeg"),
                &body,
            )])
            .unwrap();
        assert_eq!(out.candidates.len(), 1);
        let c = &out.candidates[0];
        assert_eq!(c.kind, CandidateKind::Image);
        assert_eq!(c.identity, "https://i.scdn.co/image/abc.jpg");
        assert_eq!(c.payload.as_deref(), Some(body.as_slice()));
    }

    #[test]
    fn canvas_fragments_become_one_complete_container() {
        let out = engine()
            .run(vec![
                entry(0, "https://canvaz.scdn.co/canvas_profile1_init", None, b"INIT"),
                entry(1, "https://canvaz.scdn.co/canvas_profile1_seg0", None, b"S0"),
                entry(2, "https://canvaz.scdn.co/canvas_profile1_seg1", None, b"S1"),
            ])
            .unwrap();
        assert_eq!(out.candidates.len(), 1);
        let c = &out.candidates[0];
        assert_eq!(c.kind, CandidateKind::ContainerFragment);
        assert_eq!(c.identity, "canvaz.scdn.co/canvas_profile1");
        assert_eq!(c.payload.as_deref(), Some(b"INITS0S1".as_slice()));
        assert!(c.stream.as_ref().unwrap().complete);

        let stream = out.stream("canvaz.scdn.co/canvas_profile1").unwrap();
        assert!(stream.complete);
        assert_eq!(stream.fragments, 3);
    }

    #[test]
    fn out_of_order_capture_with_gap() {
        let out = engine()
            .run(vec![
                entry(0, "https://canvaz.scdn.co/c/seg3.webm", None, b"3"),
                entry(1, "https://canvaz.scdn.co/c/init.webm", None, b"I"),
                entry(2, "https://canvaz.scdn.co/c/seg1.webm", None, b"1"),
                entry(3, "https://canvaz.scdn.co/c/seg0.webm", None, b"0"),
            ])
            .unwrap();
        let c = &out.candidates[0];
        assert_eq!(c.payload.as_deref(), Some(b"I013".as_slice()));
        let status = c.stream.as_ref().unwrap();
        assert!(!status.complete);
        assert_eq!(status.missing, vec![2]);
    }

    #[test]
    fn json_bodies_are_mined() {
        let body = format!(r#"{{"images":[{{"url":"https://i.scdn.co/image/{ID}"}}]}}"#);
        let out = engine()
            .run(vec![
                entry(0, "https://i.scdn.co/image/x", Some("image/png"), b"png"),
                entry(1, "https://api.spotify.com/v1/albums", Some("application/json"), body.as_bytes()),
                entry(2, "https://open.spotify.com/", Some("text/html"), ID.as_bytes()),
            ])
            .unwrap();
        assert_eq!(out.mined, 1);
        assert_eq!(out.candidates.len(), 2);
        let mined = &out.candidates[1];
        assert_eq!(mined.kind, CandidateKind::Unresolved);
        assert_eq!(mined.confidence, Confidence::Low);
        assert_eq!(mined.url, format!("https://i.scdn.co/image/{ID}"));
    }

    #[test]
    fn mining_can_be_disabled() {
        let body = format!(r#"["{ID}"]"#);
        let out = Engine::new(&EngineConfig::default())
            .unwrap()
            .run(vec![entry(0, "https://api.spotify.com/v1/x", None, body.as_bytes())])
            .unwrap();
        assert!(out.candidates.is_empty());
        assert_eq!(out.mined, 0);
    }

    #[test]
    fn captured_image_beats_mined_reference() {
        let url = format!("https://i.scdn.co/image/{ID}");
        let body = format!(r#"{{"cover":"{ID}"}}"#);
        let out = engine()
            .run(vec![
                entry(0, &url, Some("image/jpeg"), b"jpeg"),
                entry(1, "https://api.spotify.com/v1/x", Some("application/json"), body.as_bytes()),
            ])
            .unwrap();
        assert_eq!(out.candidates.len(), 1);
        assert!(out.candidates[0].is_resolved());
        assert_eq!(out.superseded, 1);
    }

    #[test]
    fn bad_id_pattern_fails_construction() {
        let config = EngineConfig {
            mining: Some(MiningConfig {
                id_pattern: "[".into(),
                ..MiningConfig::default()
            }),
            ..EngineConfig::default()
        };
        assert!(matches!(Engine::new(&config), Err(EngineError::Pattern(_))));
    }
}
