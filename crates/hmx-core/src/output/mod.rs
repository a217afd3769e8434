//! Output writer: lays out `images/`, `videos/` and `data/` under the output
//! folder and saves payloads there under stable, collision-free names.

mod atomic;

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::candidate::{CandidateKind, MediaCandidate};
use crate::checksum::sha256_bytes;
use crate::classify::{is_video_extension, sniff_extension};
use crate::url_model::{media_stem, sanitize_filename_for_linux, truncate_to};

pub use atomic::{temp_path, write_atomic, TEMP_SUFFIX};

/// Leaves room for a `-<n>` suffix and the extension within NAME_MAX.
const MAX_STEM: usize = 200;
const HASH_PREFIX: usize = 12;

/// One payload written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedFile {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: usize,
    pub extension: &'static str,
}

/// The three output folders.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn videos(&self) -> PathBuf {
        self.root.join("videos")
    }

    pub fn data(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn create(&self) -> Result<()> {
        for dir in [self.images(), self.videos(), self.data()] {
            fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Saves payloads, remembering names handed out in this run.
pub struct MediaWriter {
    layout: OutputLayout,
    used: HashSet<PathBuf>,
}

impl MediaWriter {
    /// Creates the folder layout.
    pub fn new(layout: OutputLayout) -> Result<Self> {
        layout.create()?;
        Ok(Self {
            layout,
            used: HashSet::new(),
        })
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Writes `payload` for `candidate`. `content_type` overrides the
    /// candidate's own (downloads learn theirs from the response).
    pub fn save(
        &mut self,
        candidate: &MediaCandidate,
        payload: &[u8],
        content_type: Option<&str>,
    ) -> Result<SavedFile> {
        let content_type = content_type.or(candidate.content_type.as_deref());
        let extension = sniff_extension(content_type, payload);
        let sha256 = sha256_bytes(payload);
        let is_video = is_video_extension(extension)
            || content_type.is_some_and(|ct| ct.to_ascii_lowercase().starts_with("video/"));
        let dir = if is_video {
            self.layout.videos()
        } else {
            self.layout.images()
        };

        let stem = file_stem(candidate).unwrap_or_else(|| format!("media_{}", &sha256[..HASH_PREFIX]));
        let path = self.reserve(&dir, &stem, extension);
        write_atomic(&path, payload)?;
        tracing::debug!(path = %path.display(), bytes = payload.len(), "saved");

        Ok(SavedFile {
            path,
            sha256,
            bytes: payload.len(),
            extension,
        })
    }

    /// First free `<stem>.<ext>`, then `<stem>-1.<ext>`, `<stem>-2.<ext>`, ...
    fn reserve(&mut self, dir: &Path, stem: &str, extension: &str) -> PathBuf {
        let mut n = 0u32;
        loop {
            let name = if n == 0 {
                format!("{stem}.{extension}")
            } else {
                format!("{stem}-{n}.{extension}")
            };
            let path = dir.join(name);
            if !path.exists() && self.used.insert(path.clone()) {
                return path;
            }
            n += 1;
        }
    }
}

/// Name stem for a candidate, before collision handling.
fn file_stem(candidate: &MediaCandidate) -> Option<String> {
    let stem = match candidate.kind {
        CandidateKind::ContainerFragment => {
            let key = sanitize_filename_for_linux(&candidate.identity);
            (!key.is_empty()).then(|| format!("canvas_{key}"))
        }
        CandidateKind::Image | CandidateKind::Unresolved => media_stem(&candidate.url),
    }?;
    Some(truncate_to(&stem, MAX_STEM).to_string())
}
