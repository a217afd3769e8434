//! `hmx extract` – the full pipeline: engine, save, download, transcode, report.

use anyhow::Result;
use hmx_core::checksum::sha256_path;
use hmx_core::config::HmxConfig;
use hmx_core::download::{fetch_all, DownloadOptions};
use hmx_core::output::{MediaWriter, OutputLayout};
use hmx_core::report::{CaptureInfo, FailureStage, Report, TranscodeStatus};
use hmx_core::transcode::{should_transcode, Transcoder};
use hmx_core::{CandidateKind, Engine};
use std::path::PathBuf;
use std::time::Instant;

use super::load::load;

pub async fn run_extract(cfg: &HmxConfig, capture_arg: &str) -> Result<()> {
    let started = Instant::now();
    let capture = load(capture_arg)?;
    let info = CaptureInfo::from(&capture);

    let engine = Engine::new(&cfg.engine_config())?;
    let extraction = engine.run(capture.entries)?;
    let mut report = Report::new(info, &extraction);
    let mut writer = MediaWriter::new(OutputLayout::new(&cfg.output_dir))?;

    let mut to_transcode: Vec<(String, PathBuf)> = Vec::new();
    let mut to_fetch: Vec<(usize, String)> = Vec::new();
    for (i, c) in extraction.candidates.iter().enumerate() {
        match &c.payload {
            Some(payload) => match writer.save(c, payload, None) {
                Ok(file) => {
                    if c.kind == CandidateKind::ContainerFragment && should_transcode(payload) {
                        to_transcode.push((c.identity.clone(), file.path.clone()));
                    }
                    report.saved(i, &file, false);
                }
                Err(e) => {
                    tracing::warn!(identity = %c.identity, "save failed: {:#}", e);
                    report.failed(i, FailureStage::Write, format!("{:#}", e));
                }
            },
            // Group placeholders without a stream have nothing to fetch.
            None if c.referrer.is_some() => to_fetch.push((i, c.url.clone())),
            None => {}
        }
    }

    if cfg.download.enabled && !to_fetch.is_empty() {
        println!("Fetching {} referenced media files...", to_fetch.len());
        let opts = DownloadOptions::from(&cfg.download);
        for (i, result) in fetch_all(to_fetch, &opts, cfg.download.jobs).await? {
            let c = &extraction.candidates[i];
            match result {
                Ok(fetched) => match writer.save(c, &fetched.bytes, fetched.content_type.as_deref()) {
                    Ok(file) => report.saved(i, &file, true),
                    Err(e) => report.failed(i, FailureStage::Write, format!("{:#}", e)),
                },
                Err(e) => report.failed(i, FailureStage::Download, e),
            }
        }
    }

    if cfg.transcode.enabled && !to_transcode.is_empty() {
        match Transcoder::locate(&cfg.transcode) {
            Ok(transcoder) => {
                for (key, path) in &to_transcode {
                    let status = match transcoder.to_mp4(path).await {
                        Ok(mp4) => match sha256_path(&mp4) {
                            Ok(sha256) => TranscodeStatus::Converted { path: mp4, sha256 },
                            Err(e) => TranscodeStatus::Failed {
                                error: format!("{:#}", e),
                            },
                        },
                        Err(e) => {
                            tracing::warn!(key = %key, "transcode failed: {}", e);
                            TranscodeStatus::Failed {
                                error: e.to_string(),
                            }
                        }
                    };
                    report.transcoded(key, status);
                }
            }
            Err(e) => {
                tracing::info!("skipping MP4 conversion: {}", e);
                for (key, _) in &to_transcode {
                    report.transcoded(
                        key,
                        TranscodeStatus::Skipped {
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }
    }

    report.finish(started.elapsed());
    let report_path = report.write(&writer.layout().data())?;

    let s = &report.summary;
    println!(
        "Scanned {} entries: {} images, {} canvas streams ({} complete), {} references",
        s.entries_scanned, s.images, s.containers, s.complete_groups, s.unresolved
    );
    println!(
        "Saved {} files to {} ({} failed)",
        s.saved_files,
        writer.layout().root().display(),
        s.failures
    );
    println!("Report: {}", report_path.display());
    Ok(())
}
