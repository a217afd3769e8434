//! Group keys and sequence hints derived from fragment URLs.
//!
//! A key is the URL with the per-segment part removed, so every init and
//! media segment of one stream lands in the same group.

use crate::classify::container_content_type;

/// Query parameters carrying a byte range; dropped from the key.
const RANGE_PARAMS: &[&str] = &["range", "bytes"];
/// Query parameters carrying a segment number.
const SEQUENCE_PARAMS: &[&str] = &["segment", "seg", "sq", "part", "index"];
/// Directories that hold the per-segment files of one stream.
const SEGMENT_DIRS: &[&str] = &["segments", "segment", "inits", "init", "chunks"];
/// Word prefixes allowed before a segment number (`seg12`, `chunk-3`).
const NUMBER_PREFIXES: &[&str] = &["segment", "seg", "chunk", "fragment", "frag", "part"];

/// Position of a fragment within its stream, as far as it can be told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentHint {
    /// Explicitly an initialization segment.
    Init,
    Number(u64),
    /// No marker and no number.
    Unknown,
}

/// Group key for a fragment URL.
pub fn fragment_key(url: &str) -> String {
    split_fragment_url(url).0
}

/// Sequence hint from the URL, falling back to the payload: an EBML header or
/// an MP4 `ftyp` box means initialization data.
pub fn segment_hint(url: &str, payload: &[u8]) -> SegmentHint {
    match split_fragment_url(url).1 {
        SegmentHint::Unknown if container_content_type(payload).is_some() => SegmentHint::Init,
        hint => hint,
    }
}

fn split_fragment_url(url: &str) -> (String, SegmentHint) {
    let Ok(parsed) = url::Url::parse(url) else {
        let base = url.split(['?', '#']).next().unwrap_or(url);
        return (base.to_string(), SegmentHint::Unknown);
    };

    let mut hint = SegmentHint::Unknown;
    let mut kept_query = Vec::new();
    for (name, value) in parsed.query_pairs() {
        let lower = name.to_ascii_lowercase();
        if RANGE_PARAMS.contains(&lower.as_str()) {
            continue;
        }
        if SEQUENCE_PARAMS.contains(&lower.as_str()) {
            if let Ok(n) = value.parse::<u64>() {
                hint = SegmentHint::Number(n);
                continue;
            }
        }
        kept_query.push(format!("{name}={value}"));
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let (stem, path_hint) = match source_profile(&segments) {
        Some((source, profile)) => {
            let in_init_dir = segments.len() >= 2 && is_init_dir(segments[segments.len() - 2]);
            let tail = if in_init_dir {
                SegmentHint::Init
            } else {
                segments
                    .last()
                    .map_or(SegmentHint::Unknown, |s| parse_tail(s).1)
            };
            (format!("{source}_profile_{profile}"), tail)
        }
        None => strip_segment_part(parsed.host_str().unwrap_or_default(), &segments),
    };
    if hint == SegmentHint::Unknown {
        hint = path_hint;
    }

    let mut key = stem;
    if !kept_query.is_empty() {
        key.push('?');
        key.push_str(&kept_query.join("&"));
    }
    (key, hint)
}

/// Spotify canvas layout: `.../sources/<hex>/profiles/<n>/...`.
fn source_profile(segments: &[&str]) -> Option<(String, String)> {
    let after = |name: &str| {
        segments
            .windows(2)
            .find(|w| w[0] == name)
            .map(|w| w[1])
    };
    let source = after("sources").filter(|s| s.chars().all(|c| c.is_ascii_hexdigit()))?;
    let profile = after("profiles").filter(|s| s.chars().all(|c| c.is_ascii_digit()))?;
    Some((source.to_ascii_lowercase(), profile.to_string()))
}

/// Removes the segment-specific tail of the path (and a `segments/`-style
/// directory holding it) and returns `host/path` plus what the tail said.
fn strip_segment_part(host: &str, segments: &[&str]) -> (String, SegmentHint) {
    let mut parts: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
    let mut hint = SegmentHint::Unknown;

    if let Some(last) = segments.last() {
        let (rest, tail_hint) = parse_tail(last);
        let parent = segments.len().checked_sub(2).map(|i| segments[i]);
        let parent_is_init = parent.is_some_and(is_init_dir);
        let in_segment_dir = parent
            .is_some_and(|p| SEGMENT_DIRS.contains(&p.to_ascii_lowercase().as_str()));

        if in_segment_dir && (parent_is_init || tail_hint != SegmentHint::Unknown) {
            // Both `inits/x.webm` and `segments/3.webm` collapse to the parent stream.
            parts.truncate(parts.len() - 2);
            hint = if parent_is_init {
                SegmentHint::Init
            } else {
                tail_hint
            };
        } else if tail_hint != SegmentHint::Unknown {
            parts.pop();
            if let Some(rest) = rest {
                parts.push(rest);
            }
            hint = tail_hint;
        }
    }

    let mut key = host.to_ascii_lowercase();
    for p in parts {
        key.push('/');
        key.push_str(&p);
    }
    (key, hint)
}

fn is_init_dir(dir: &str) -> bool {
    dir.eq_ignore_ascii_case("inits") || dir.eq_ignore_ascii_case("init")
}

/// Splits `canvas_profile1_seg0.webm` into (`Some("canvas_profile1")`, `Number(0)`).
/// The first element is what stays in the key; `None` when the whole segment
/// is the segment token (`3.webm`).
fn parse_tail(segment: &str) -> (Option<String>, SegmentHint) {
    let name = match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => stem,
        _ => segment,
    };
    let (prefix, token) = match name.rfind(['_', '-']) {
        Some(i) => (Some(&name[..i]), &name[i + 1..]),
        None => (None, name),
    };

    let hint = token_hint(token);
    if hint == SegmentHint::Unknown {
        return (Some(segment.to_string()), hint);
    }
    (prefix.filter(|p| !p.is_empty()).map(String::from), hint)
}

fn token_hint(token: &str) -> SegmentHint {
    let lower = token.to_ascii_lowercase();
    if matches!(lower.as_str(), "init" | "inits" | "header") {
        return SegmentHint::Init;
    }
    let digits = NUMBER_PREFIXES
        .iter()
        .find_map(|p| lower.strip_prefix(p))
        .unwrap_or(&lower);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = digits.parse() {
            return SegmentHint::Number(n);
        }
    }
    SegmentHint::Unknown
}
