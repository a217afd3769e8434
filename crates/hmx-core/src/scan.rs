//! Entry scanner: one ordered pass over the capture.
//!
//! Images become candidates immediately; container fragments are handed to
//! the grouper, and a placeholder candidate is emitted the first time a group
//! key is seen. The scan is lazy: items come out interleaved in capture order
//! while the grouper fills up.

use crate::candidate::MediaCandidate;
use crate::capture::CaptureEntry;
use crate::classify::{Classifier, Verdict};
use crate::group::{segment_hint, FragmentGrouper};

/// How many payload bytes the classifier looks at.
const PREFIX_LEN: usize = 16;

/// One scan result.
#[derive(Debug)]
pub enum Scanned {
    Image(MediaCandidate),
    /// Placeholder for a new fragment group; resolved after reassembly.
    Group(MediaCandidate),
    /// Not media; handed back so the caller can mine it.
    Ignored(CaptureEntry),
}

/// Counters for one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub entries: usize,
    pub empty_skipped: usize,
    pub images: usize,
    pub fragments: usize,
    pub groups: usize,
    pub ignored: usize,
}

pub struct Scanner<'a, I> {
    entries: I,
    classifier: &'a Classifier,
    grouper: &'a mut FragmentGrouper,
    stats: ScanStats,
}

/// Starts a scan over `entries`; fragments go into `grouper`.
pub fn scan<'a, I>(
    entries: I,
    classifier: &'a Classifier,
    grouper: &'a mut FragmentGrouper,
) -> Scanner<'a, I::IntoIter>
where
    I: IntoIterator<Item = CaptureEntry>,
{
    Scanner {
        entries: entries.into_iter(),
        classifier,
        grouper,
        stats: ScanStats::default(),
    }
}

impl<'a, I> Scanner<'a, I> {
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn into_stats(self) -> ScanStats {
        self.stats
    }
}

impl<'a, I> Iterator for Scanner<'a, I>
where
    I: Iterator<Item = CaptureEntry>,
{
    type Item = Scanned;

    fn next(&mut self) -> Option<Scanned> {
        loop {
            let entry = self.entries.next()?;
            self.stats.entries += 1;
            if entry.payload.is_empty() {
                self.stats.empty_skipped += 1;
                continue;
            }

            let prefix = &entry.payload[..entry.payload.len().min(PREFIX_LEN)];
            match self
                .classifier
                .classify(&entry.url, entry.content_type.as_deref(), prefix)
            {
                Verdict::Image => {
                    self.stats.images += 1;
                    return Some(Scanned::Image(MediaCandidate::image(
                        &entry.url,
                        entry.content_type,
                        entry.payload,
                        entry.sequence_index,
                    )));
                }
                Verdict::ContainerFragment => {
                    let hint = segment_hint(&entry.url, &entry.payload);
                    match self.grouper.add_fragment(
                        &entry.url,
                        hint,
                        entry.sequence_index,
                        entry.payload,
                    ) {
                        Ok(added) => {
                            self.stats.fragments += 1;
                            if added.new_group {
                                self.stats.groups += 1;
                                let mut placeholder = MediaCandidate::placeholder(
                                    &added.key,
                                    &entry.url,
                                    entry.sequence_index,
                                );
                                placeholder.content_type = entry.content_type;
                                return Some(Scanned::Group(placeholder));
                            }
                        }
                        Err(e) => tracing::warn!(url = %entry.url, "fragment dropped: {}", e),
                    }
                }
                Verdict::Ignore => {
                    self.stats.ignored += 1;
                    return Some(Scanned::Ignored(entry));
                }
            }
        }
    }
}
