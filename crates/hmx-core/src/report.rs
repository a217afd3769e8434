//! Run report: a JSON summary of what was found, saved and reassembled,
//! written to `data/har_analysis_<unix secs>.json`.
//!
//! Payload bytes never appear in the report; only sizes and digests.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::candidate::{CandidateKind, Confidence};
use crate::capture::Capture;
use crate::engine::Extraction;
use crate::output::{write_atomic, SavedFile};
use crate::reassemble::StreamWarning;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureInfo {
    pub version: Option<String>,
    pub creator: Option<String>,
    pub total_entries: usize,
}

impl From<&Capture> for CaptureInfo {
    fn from(capture: &Capture) -> Self {
        Self {
            version: capture.version.clone(),
            creator: capture.creator.clone(),
            total_entries: capture.entries.len(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub entries_scanned: usize,
    pub empty_skipped: usize,
    pub images: usize,
    pub containers: usize,
    pub unresolved: usize,
    pub groups: usize,
    pub complete_groups: usize,
    pub mined_references: usize,
    pub superseded: usize,
    pub saved_files: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranscodeStatus {
    Converted { path: PathBuf, sha256: String },
    Failed { error: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    pub key: String,
    pub complete: bool,
    pub has_init: bool,
    pub fragments: usize,
    pub missing: Vec<u64>,
    pub unnumbered: usize,
    pub bytes: usize,
    pub warnings: Vec<StreamWarning>,
    pub error: Option<String>,
    pub transcode: Option<TranscodeStatus>,
}

/// What happened to one candidate after the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CandidateStatus {
    /// Payload from the capture written to disk.
    Saved,
    /// Fetched by URL, then written.
    Downloaded,
    /// Not saved (downloads disabled, or a scan-only run).
    Skipped,
    Failed { stage: FailureStage, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Download,
    Write,
    Reassembly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateReport {
    pub identity: String,
    pub kind: CandidateKind,
    pub url: String,
    pub confidence: Confidence,
    pub referrer: Option<String>,
    pub size: Option<usize>,
    pub sha256: Option<String>,
    pub saved_path: Option<PathBuf>,
    #[serde(flatten)]
    pub status: CandidateStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub generated_at: u64,
    pub elapsed_ms: u64,
    pub capture: CaptureInfo,
    pub summary: Summary,
    pub groups: Vec<GroupReport>,
    pub candidates: Vec<CandidateReport>,
}

impl Report {
    /// Starts a report for one run; every candidate begins as `Skipped`.
    /// Candidate indexes below refer to `extraction.candidates`.
    pub fn new(capture: CaptureInfo, extraction: &Extraction) -> Self {
        let mut groups: Vec<GroupReport> = extraction
            .streams
            .iter()
            .map(|s| GroupReport {
                key: s.key.clone(),
                complete: s.complete,
                has_init: s.has_init,
                fragments: s.fragments,
                missing: s.missing.clone(),
                unnumbered: s.unnumbered,
                bytes: s.payload.len(),
                warnings: s.warnings.clone(),
                error: None,
                transcode: None,
            })
            .collect();
        groups.extend(extraction.failures.iter().map(|f| GroupReport {
            key: f.key.clone(),
            complete: false,
            has_init: false,
            fragments: 0,
            missing: Vec::new(),
            unnumbered: 0,
            bytes: 0,
            warnings: Vec::new(),
            error: Some(f.error.to_string()),
            transcode: None,
        }));
        groups.sort_by(|a, b| a.key.cmp(&b.key));

        let candidates = extraction
            .candidates
            .iter()
            .map(|c| {
                let failed_group = c.kind == CandidateKind::Unresolved
                    && extraction.failures.iter().any(|f| f.key == c.identity);
                CandidateReport {
                    identity: c.identity.clone(),
                    kind: c.kind,
                    url: c.url.clone(),
                    confidence: c.confidence,
                    referrer: c.referrer.clone(),
                    size: c.payload.as_ref().map(Vec::len),
                    sha256: None,
                    saved_path: None,
                    status: if failed_group {
                        CandidateStatus::Failed {
                            stage: FailureStage::Reassembly,
                            error: "group could not be reassembled".to_string(),
                        }
                    } else {
                        CandidateStatus::Skipped
                    },
                }
            })
            .collect();

        let count = |kind: CandidateKind| {
            extraction
                .candidates
                .iter()
                .filter(|c| c.kind == kind)
                .count()
        };
        let summary = Summary {
            entries_scanned: extraction.stats.entries,
            empty_skipped: extraction.stats.empty_skipped,
            images: count(CandidateKind::Image),
            containers: count(CandidateKind::ContainerFragment),
            unresolved: count(CandidateKind::Unresolved),
            groups: extraction.streams.len() + extraction.failures.len(),
            complete_groups: extraction.streams.iter().filter(|s| s.complete).count(),
            mined_references: extraction.mined,
            superseded: extraction.superseded,
            ..Summary::default()
        };

        Self {
            generated_at: unix_now(),
            elapsed_ms: 0,
            capture,
            summary,
            groups,
            candidates,
        }
    }

    pub fn saved(&mut self, index: usize, file: &SavedFile, downloaded: bool) {
        if let Some(c) = self.candidates.get_mut(index) {
            c.size = Some(file.bytes);
            c.sha256 = Some(file.sha256.clone());
            c.saved_path = Some(file.path.clone());
            c.status = if downloaded {
                CandidateStatus::Downloaded
            } else {
                CandidateStatus::Saved
            };
        }
    }

    pub fn failed(&mut self, index: usize, stage: FailureStage, error: impl Display) {
        if let Some(c) = self.candidates.get_mut(index) {
            c.status = CandidateStatus::Failed {
                stage,
                error: error.to_string(),
            };
        }
    }

    pub fn transcoded(&mut self, key: &str, status: TranscodeStatus) {
        if let Some(g) = self.groups.iter_mut().find(|g| g.key == key) {
            g.transcode = Some(status);
        }
    }

    /// Fills in the counters that depend on per-candidate outcomes.
    pub fn finish(&mut self, elapsed: Duration) {
        self.elapsed_ms = elapsed.as_millis() as u64;
        self.summary.saved_files = self
            .candidates
            .iter()
            .filter(|c| c.saved_path.is_some())
            .count();
        self.summary.failures = self
            .candidates
            .iter()
            .filter(|c| matches!(c.status, CandidateStatus::Failed { .. }))
            .count();
    }

    /// Writes `har_analysis_<generated_at>.json` into `data_dir` and returns its path.
    pub fn write(&self, data_dir: &Path) -> Result<PathBuf> {
        let mut path = data_dir.join(format!("har_analysis_{}.json", self.generated_at));
        let mut n = 1;
        while path.exists() {
            path = data_dir.join(format!("har_analysis_{}-{}.json", self.generated_at, n));
            n += 1;
        }
        let json = serde_json::to_vec_pretty(self).context("serialize report")?;
        write_atomic(&path, &json)?;
        tracing::info!(path = %path.display(), "report written");
        Ok(path)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureEntry;
    use crate::engine::{Engine, EngineConfig};

    fn extraction() -> Extraction {
        Engine::new(&EngineConfig::default())
            .unwrap()
            .run(vec![
                CaptureEntry::new(0, "https://i.scdn.co/image/a", Some("image/jpeg"), "jpeg-bytes"),
                CaptureEntry::new(1, "https://canvaz.scdn.co/c/init.webm", None, "I"),
                CaptureEntry::new(2, "https://canvaz.scdn.co/c/seg0.webm", None, "0"),
                CaptureEntry::new(3, "https://canvaz.scdn.co/c/seg2.webm", None, "2"),
                CaptureEntry::new(4, "https://i.scdn.co/image/empty", None, ""),
            ])
            .unwrap()
    }

    fn info() -> CaptureInfo {
        CaptureInfo {
            version: Some("1.2".into()),
            creator: Some("Firefox 128".into()),
            total_entries: 5,
        }
    }

    #[test]
    fn summary_counts_come_from_the_extraction() {
        let mut report = Report::new(info(), &extraction());
        report.finish(Duration::from_millis(42));
        assert_eq!(report.elapsed_ms, 42);
        assert_eq!(report.summary.entries_scanned, 5);
        assert_eq!(report.summary.empty_skipped, 1);
        assert_eq!(report.summary.images, 1);
        assert_eq!(report.summary.containers, 1);
        assert_eq!(report.summary.groups, 1);
        assert_eq!(report.summary.complete_groups, 0);
        assert_eq!(report.summary.saved_files, 0);
        assert_eq!(report.groups[0].missing, vec![1]);
        assert_eq!(report.groups[0].bytes, 3);
    }

    #[test]
    fn outcomes_update_candidates_and_counters() {
        let mut report = Report::new(info(), &extraction());
        let file = SavedFile {
            path: PathBuf::from("/out/images/a.jpg"),
            sha256: "ab".repeat(32),
            bytes: 10,
            extension: "jpg",
        };
        report.saved(0, &file, false);
        report.failed(1, FailureStage::Write, "disk full");
        report.transcoded(
            "canvaz.scdn.co/c",
            TranscodeStatus::Skipped {
                reason: "ffmpeg not found".into(),
            },
        );
        report.finish(Duration::ZERO);

        assert_eq!(report.candidates[0].status, CandidateStatus::Saved);
        assert_eq!(report.summary.saved_files, 1);
        assert_eq!(report.summary.failures, 1);
        assert!(report.groups[0].transcode.is_some());
    }

    #[test]
    fn written_json_has_no_payload_and_expected_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = Report::new(info(), &extraction());
        report.finish(Duration::from_millis(1));
        let path = report.write(dir.path()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("har_analysis_") && name.ends_with(".json"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("jpeg-bytes"));
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["capture"]["creator"], "Firefox 128");
        assert_eq!(v["summary"]["images"], 1);
        assert_eq!(v["candidates"][0]["kind"], "image");
        assert_eq!(v["candidates"][0]["status"], "skipped");
        assert_eq!(v["groups"][0]["warnings"][0]["kind"], "sequence_gap");

        // A second write in the same second does not overwrite the first.
        let again = report.write(dir.path()).unwrap();
        assert_ne!(again, path);
    }
}
