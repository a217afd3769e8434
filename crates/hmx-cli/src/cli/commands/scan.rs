//! `hmx scan` – show what a capture contains; writes nothing.

use anyhow::Result;
use hmx_core::config::HmxConfig;
use hmx_core::{CandidateKind, Engine, MediaCandidate};

use super::load::load;

pub fn run_scan(cfg: &HmxConfig, capture_arg: &str) -> Result<()> {
    let capture = load(capture_arg)?;
    let engine = Engine::new(&cfg.engine_config())?;
    let extraction = engine.run(capture.entries)?;

    if extraction.candidates.is_empty() {
        println!(
            "No media found in {} entries ({} empty).",
            extraction.stats.entries, extraction.stats.empty_skipped
        );
        return Ok(());
    }

    println!("{:<10} {:<10} {:<5} {}", "KIND", "SIZE", "CONF", "IDENTITY");
    for c in &extraction.candidates {
        println!(
            "{:<10} {:<10} {:<5} {}",
            kind_label(c),
            c.payload
                .as_ref()
                .map(|p| p.len().to_string())
                .unwrap_or_else(|| "-".to_string()),
            format!("{:?}", c.confidence).to_lowercase(),
            c.identity
        );
    }

    if !extraction.streams.is_empty() || !extraction.failures.is_empty() {
        println!();
        println!("{:<9} {:<6} {:<9} {}", "COMPLETE", "INIT", "FRAGMENTS", "GROUP");
        for s in &extraction.streams {
            println!(
                "{:<9} {:<6} {:<9} {}{}",
                if s.complete { "yes" } else { "no" },
                if s.has_init { "yes" } else { "no" },
                s.fragments,
                s.key,
                if s.missing.is_empty() {
                    String::new()
                } else {
                    format!("  (missing {:?})", s.missing)
                }
            );
        }
        for f in &extraction.failures {
            println!("{:<9} {:<6} {:<9} {}  ({})", "error", "-", 0, f.key, f.error);
        }
    }

    println!();
    println!(
        "{} entries, {} candidates, {} mined references, {} duplicates dropped",
        extraction.stats.entries,
        extraction.candidates.len(),
        extraction.mined,
        extraction.superseded
    );
    Ok(())
}

fn kind_label(c: &MediaCandidate) -> &'static str {
    match c.kind {
        CandidateKind::Image => "image",
        CandidateKind::ContainerFragment => "canvas",
        CandidateKind::Unresolved => "reference",
    }
}
