//! HAR media extraction: finds images and segmented canvas streams in a
//! recorded browser session, reassembles the streams and saves everything.
//!
//! The engine (`classify` through `aggregate`, wired by `engine`) is pure and
//! synchronous. `capture`, `download`, `output`, `transcode` and `report` do
//! the I/O around it.

pub mod config;
pub mod logging;

pub mod aggregate;
pub mod candidate;
pub mod classify;
pub mod engine;
pub mod group;
pub mod mine;
pub mod reassemble;
pub mod scan;

pub mod capture;
pub mod checksum;
pub mod download;
pub mod output;
pub mod report;
pub mod retry;
pub mod transcode;
pub mod url_model;

pub use candidate::{CandidateKind, MediaCandidate};
pub use engine::{Engine, EngineConfig, Extraction};
