//! Fragment grouper: buckets container fragments into reconstruction groups.
//!
//! Two-phase protocol: fragments are added while the capture is scanned,
//! then `close()` freezes every group and hands them to reassembly. Adding
//! after close is a protocol error.

mod key;

use std::collections::BTreeMap;

pub use key::{fragment_key, segment_hint, SegmentHint};

/// One captured segment of a container stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub url: String,
    pub sequence_index: usize,
    pub payload: Vec<u8>,
}

/// All fragments sharing one group key.
///
/// Holds at most one initialization fragment; numbered media fragments are
/// kept ordered by number. Fragments with neither marker nor number (other
/// than the first one seen) are kept in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentGroup {
    key: String,
    init: Option<Fragment>,
    media: BTreeMap<u64, Fragment>,
    unnumbered: Vec<Fragment>,
    superseded: usize,
}

impl FragmentGroup {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn init(&self) -> Option<&Fragment> {
        self.init.as_ref()
    }

    /// Numbered media fragments, ascending.
    pub fn media(&self) -> impl Iterator<Item = (u64, &Fragment)> + Clone {
        self.media.iter().map(|(n, f)| (*n, f))
    }

    pub fn unnumbered(&self) -> &[Fragment] {
        &self.unnumbered
    }

    /// Number of fragments currently held.
    pub fn len(&self) -> usize {
        usize::from(self.init.is_some()) + self.media.len() + self.unnumbered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fragments dropped as stale re-captures of a number (or init) already held.
    pub fn superseded(&self) -> usize {
        self.superseded
    }

    /// Adds a fragment. A repeated number or a second init keeps whichever
    /// arrived later in the capture.
    pub fn insert(&mut self, fragment: Fragment, hint: SegmentHint) {
        match hint {
            SegmentHint::Init => {
                let current = self.init.take();
                self.init = Some(self.newer(current, fragment));
            }
            SegmentHint::Number(n) => {
                let current = self.media.remove(&n);
                let kept = self.newer(current, fragment);
                self.media.insert(n, kept);
            }
            SegmentHint::Unknown if self.is_empty() => {
                self.init = Some(fragment);
            }
            SegmentHint::Unknown => self.unnumbered.push(fragment),
        }
    }

    fn newer(&mut self, current: Option<Fragment>, incoming: Fragment) -> Fragment {
        match current {
            None => incoming,
            Some(current) => {
                self.superseded += 1;
                let (kept, dropped) = if incoming.sequence_index >= current.sequence_index {
                    (incoming, current)
                } else {
                    (current, incoming)
                };
                tracing::debug!(
                    key = %self.key,
                    kept = kept.sequence_index,
                    dropped = dropped.sequence_index,
                    "duplicate fragment, keeping later capture"
                );
                kept
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    #[error("fragment grouper is closed; groups are frozen for reassembly")]
    Closed,
}

/// Result of adding a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added {
    pub key: String,
    /// True when this fragment created its group.
    pub new_group: bool,
}

/// Collects fragments into groups until closed.
#[derive(Debug, Default)]
pub struct FragmentGrouper {
    groups: BTreeMap<String, FragmentGroup>,
    closed: bool,
}

impl FragmentGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_fragment(
        &mut self,
        url: &str,
        hint: SegmentHint,
        sequence_index: usize,
        payload: Vec<u8>,
    ) -> Result<Added, GroupError> {
        if self.closed {
            return Err(GroupError::Closed);
        }
        let key = fragment_key(url);
        let new_group = !self.groups.contains_key(&key);
        let group = self
            .groups
            .entry(key.clone())
            .or_insert_with(|| FragmentGroup::new(key.clone()));
        group.insert(
            Fragment {
                url: url.to_string(),
                sequence_index,
                payload,
            },
            hint,
        );
        if new_group {
            tracing::debug!(key = %key, "new fragment group");
        }
        Ok(Added { key, new_group })
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Freezes all groups and hands them over, keyed by group key.
    pub fn close(&mut self) -> Result<BTreeMap<String, FragmentGroup>, GroupError> {
        if self.closed {
            return Err(GroupError::Closed);
        }
        self.closed = true;
        Ok(std::mem::take(&mut self.groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(g: &mut FragmentGrouper, url: &str, index: usize, payload: &[u8]) -> Added {
        let hint = segment_hint(url, payload);
        g.add_fragment(url, hint, index, payload.to_vec()).unwrap()
    }

    #[test]
    fn first_sight_creates_group_once() {
        let mut g = FragmentGrouper::new();
        let a = add(&mut g, "https://canvaz.scdn.co/c_p1_init", 0, b"I");
        let b = add(&mut g, "https://canvaz.scdn.co/c_p1_seg0", 1, b"A");
        let c = add(&mut g, "https://canvaz.scdn.co/c_p2_seg0", 2, b"B");
        assert!(a.new_group);
        assert!(!b.new_group);
        assert!(c.new_group);
        assert_eq!(a.key, b.key);

        let groups = g.close().unwrap();
        assert_eq!(groups.len(), 2);
        let p1 = &groups[&a.key];
        assert_eq!(p1.init().unwrap().payload, b"I");
        assert_eq!(p1.media().count(), 1);
    }

    #[test]
    fn unnumbered_first_fragment_is_init() {
        let mut group = FragmentGroup::new("k");
        let f = |i: usize| Fragment {
            url: format!("u{i}"),
            sequence_index: i,
            payload: vec![i as u8],
        };
        group.insert(f(0), SegmentHint::Unknown);
        group.insert(f(1), SegmentHint::Unknown);
        group.insert(f(2), SegmentHint::Number(0));
        assert_eq!(group.init().unwrap().sequence_index, 0);
        assert_eq!(group.unnumbered().len(), 1);
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn duplicate_number_keeps_later_capture() {
        let mut g = FragmentGrouper::new();
        let a = add(&mut g, "https://canvaz.scdn.co/c_seg1", 3, b"old");
        add(&mut g, "https://canvaz.scdn.co/c_seg1", 8, b"new");
        let groups = g.close().unwrap();
        let group = &groups[&a.key];
        let (n, f) = group.media().next().unwrap();
        assert_eq!(n, 1);
        assert_eq!(f.payload, b"new");
        assert_eq!(group.superseded(), 1);
    }

    #[test]
    fn earlier_duplicate_does_not_replace_later() {
        let mut group = FragmentGroup::new("k");
        let f = |i: usize, p: &[u8]| Fragment {
            url: "u".into(),
            sequence_index: i,
            payload: p.to_vec(),
        };
        group.insert(f(9, b"later"), SegmentHint::Init);
        group.insert(f(2, b"earlier"), SegmentHint::Init);
        assert_eq!(group.init().unwrap().payload, b"later");
        assert_eq!(group.superseded(), 1);
    }

    #[test]
    fn add_after_close_fails() {
        let mut g = FragmentGrouper::new();
        add(&mut g, "https://canvaz.scdn.co/c_seg0", 0, b"x");
        g.close().unwrap();
        assert!(g.is_closed());
        assert_eq!(
            g.add_fragment("https://canvaz.scdn.co/c_seg1", SegmentHint::Number(1), 1, vec![]),
            Err(GroupError::Closed)
        );
        assert_eq!(g.close(), Err(GroupError::Closed));
    }
}
