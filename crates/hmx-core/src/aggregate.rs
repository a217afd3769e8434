//! Result aggregator: merges image, fragment and mined candidates into one
//! set with unique identities.
//!
//! On an identity collision the candidate from the later capture position
//! wins, except that a candidate with a payload is never replaced by one
//! without. Output is grouped images, containers, then unresolved; within a
//! kind, by first appearance. No hashing order leaks into the result.

use std::collections::HashMap;

use crate::candidate::MediaCandidate;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregated {
    pub candidates: Vec<MediaCandidate>,
    /// Candidates dropped because another with the same identity won.
    pub superseded: usize,
}

pub fn aggregate<A, B, C>(images: A, fragments: B, mined: C) -> Aggregated
where
    A: IntoIterator<Item = MediaCandidate>,
    B: IntoIterator<Item = MediaCandidate>,
    C: IntoIterator<Item = MediaCandidate>,
{
    let mut slots: Vec<MediaCandidate> = Vec::new();
    let mut by_identity: HashMap<String, usize> = HashMap::new();
    let mut superseded = 0;

    for candidate in images.into_iter().chain(fragments).chain(mined) {
        match by_identity.get(&candidate.identity) {
            Some(&slot) => {
                superseded += 1;
                if supersedes(&candidate, &slots[slot]) {
                    tracing::debug!(
                        identity = %candidate.identity,
                        kept = candidate.sequence_index,
                        dropped = slots[slot].sequence_index,
                        "duplicate identity, keeping fresher candidate"
                    );
                    slots[slot] = candidate;
                }
            }
            None => {
                by_identity.insert(candidate.identity.clone(), slots.len());
                slots.push(candidate);
            }
        }
    }

    // Stable: first appearance order survives within each kind.
    slots.sort_by_key(|c| c.kind);
    Aggregated {
        candidates: slots,
        superseded,
    }
}

fn supersedes(incoming: &MediaCandidate, current: &MediaCandidate) -> bool {
    match (incoming.is_resolved(), current.is_resolved()) {
        (true, false) => true,
        (false, true) => false,
        _ => incoming.sequence_index >= current.sequence_index,
    }
}
