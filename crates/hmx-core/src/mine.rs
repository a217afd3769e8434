//! Reference miner: finds media references inside JSON API responses that
//! the URL scan cannot see (artwork IDs, CDN links in metadata).
//!
//! Everything found here is low confidence and URL-only; fetching is the
//! downloader's job. The walk uses an explicit stack with a depth limit, so
//! hostile nesting cannot exhaust the call stack.

use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

use crate::candidate::MediaCandidate;
use crate::classify::{Classifier, Verdict};
use crate::config::MiningConfig;

#[derive(Debug, Clone)]
pub struct ReferenceMiner {
    id_pattern: Regex,
    url_templates: Vec<String>,
    max_depth: usize,
    classifier: Classifier,
}

impl ReferenceMiner {
    pub fn new(config: &MiningConfig, classifier: Classifier) -> Result<Self, regex::Error> {
        Ok(Self {
            id_pattern: Regex::new(&config.id_pattern)?,
            url_templates: config.url_templates.clone(),
            max_depth: config.max_depth,
            classifier,
        })
    }

    /// Mines one response body. Bodies that are not JSON are scanned as text
    /// for identifier tokens.
    pub fn mine(&self, body: &[u8], source_url: &str, sequence_index: usize) -> Vec<MediaCandidate> {
        let mut sink = Sink::new(source_url, sequence_index);
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => self.walk(&value, &mut sink),
            Err(_) => match std::str::from_utf8(body) {
                Ok(text) => self.mine_ids(text, &mut sink),
                Err(_) => tracing::debug!(url = source_url, "body is neither JSON nor text"),
            },
        }
        if !sink.found.is_empty() {
            tracing::debug!(
                url = source_url,
                count = sink.found.len(),
                "mined media references"
            );
        }
        sink.found
    }

    fn walk(&self, root: &Value, sink: &mut Sink) {
        let mut stack: Vec<(&Value, usize)> = vec![(root, 0)];
        let mut skipped = 0usize;
        while let Some((value, depth)) = stack.pop() {
            if depth > self.max_depth {
                skipped += 1;
                continue;
            }
            match value {
                // Reversed so items come off the stack in document order.
                Value::Object(map) => stack.extend(map.values().rev().map(|v| (v, depth + 1))),
                Value::Array(items) => stack.extend(items.iter().rev().map(|v| (v, depth + 1))),
                Value::String(s) => self.mine_string(s, sink),
                Value::Null | Value::Bool(_) | Value::Number(_) => {}
            }
        }
        if skipped > 0 {
            tracing::debug!(
                url = sink.source_url,
                skipped,
                max_depth = self.max_depth,
                "ignored JSON subtrees beyond depth limit"
            );
        }
    }

    fn mine_string(&self, s: &str, sink: &mut Sink) {
        let trimmed = s.trim();
        let looks_like_url = trimmed.starts_with("https://") || trimmed.starts_with("http://");
        if looks_like_url && self.classifier.classify_url(trimmed) != Verdict::Ignore {
            sink.push(trimmed);
            return;
        }
        self.mine_ids(s, sink);
    }

    fn mine_ids(&self, text: &str, sink: &mut Sink) {
        for m in self.id_pattern.find_iter(text) {
            for template in &self.url_templates {
                sink.push(&template.replace("{id}", m.as_str()));
            }
        }
    }
}

/// Collects candidates for one body, dropping repeats.
struct Sink<'a> {
    source_url: &'a str,
    sequence_index: usize,
    seen: HashSet<String>,
    found: Vec<MediaCandidate>,
}

impl<'a> Sink<'a> {
    fn new(source_url: &'a str, sequence_index: usize) -> Self {
        Self {
            source_url,
            sequence_index,
            seen: HashSet::new(),
            found: Vec::new(),
        }
    }

    fn push(&mut self, url: &str) {
        let candidate = MediaCandidate::mined(url, self.source_url, self.sequence_index);
        if self.seen.insert(candidate.identity.clone()) {
            self.found.push(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{CandidateKind, Confidence};

    const ID: &str = "ab67616d0000b273aaaaaaaaaaaaaaaaaaaaaaaa";

    fn miner() -> ReferenceMiner {
        ReferenceMiner::new(&MiningConfig::default(), Classifier::default()).unwrap()
    }

    fn urls(found: &[MediaCandidate]) -> Vec<&str> {
        found.iter().map(|c| c.url.as_str()).collect()
    }

    #[test]
    fn finds_ids_and_media_urls_in_nested_json() {
        let body = format!(
            r#"{{"data":{{"album":{{"coverArt":{{"sources":[
                {{"url":"https://i.scdn.co/image/{ID}"}},
                {{"url":"https://example.com/not-media.png"}}
            ]}}}},"tracks":[{{"image":"{ID}"}},{{"canvas":"https://canvaz.scdn.co/upload/x.webm"}}]}}}}"#
        );
        let found = miner().mine(body.as_bytes(), "https://api-partner.spotify.com/q", 7);
        assert_eq!(
            urls(&found),
            vec![
                format!("https://i.scdn.co/image/{ID}").as_str(),
                "https://canvaz.scdn.co/upload/x.webm",
            ]
        );
        for c in &found {
            assert_eq!(c.kind, CandidateKind::Unresolved);
            assert_eq!(c.confidence, Confidence::Low);
            assert_eq!(c.sequence_index, 7);
            assert!(c.payload.is_none());
            assert_eq!(c.referrer.as_deref(), Some("https://api-partner.spotify.com/q"));
        }
    }

    #[test]
    fn non_json_body_is_scanned_as_text() {
        let body = format!("window.__STATE__ = '{ID}';");
        let found = miner().mine(body.as_bytes(), "https://open.spotify.com/", 0);
        assert_eq!(urls(&found), vec![format!("https://i.scdn.co/image/{ID}").as_str()]);
    }

    #[test]
    fn depth_limit_skips_deep_subtrees() {
        let config = MiningConfig {
            max_depth: 2,
            ..MiningConfig::default()
        };
        let m = ReferenceMiner::new(&config, Classifier::default()).unwrap();
        let shallow = format!(r#"{{"a":"{ID}"}}"#);
        assert_eq!(m.mine(shallow.as_bytes(), "s", 0).len(), 1);
        let deep = format!(r#"{{"a":{{"b":{{"c":"{ID}"}}}}}}"#);
        assert!(m.mine(deep.as_bytes(), "s", 0).is_empty());
    }

    #[test]
    fn multiple_templates_expand_each_id() {
        let config = MiningConfig {
            url_templates: vec![
                "https://i.scdn.co/image/{id}".to_string(),
                "https://mosaic.scdn.co/640/{id}".to_string(),
            ],
            ..MiningConfig::default()
        };
        let m = ReferenceMiner::new(&config, Classifier::default()).unwrap();
        let body = format!(r#"["{ID}", "{ID}"]"#);
        assert_eq!(m.mine(body.as_bytes(), "s", 0).len(), 2);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let config = MiningConfig {
            id_pattern: "(".to_string(),
            ..MiningConfig::default()
        };
        assert!(ReferenceMiner::new(&config, Classifier::default()).is_err());
    }
}
