//! Local filename derivation for saved media.
//!
//! Names come from the URL path (extension dropped; the writer picks its own
//! from the payload), sanitized for Linux filesystems.

mod path;
mod sanitize;

pub use path::{filename_from_url_path, strip_extension};
pub use sanitize::sanitize_filename_for_linux;
pub(crate) use sanitize::truncate_to;

/// Filename stem for a media URL, or `None` when the path gives nothing usable.
///
/// - `media_stem("https://i.scdn.co/image/ab67616d.jpg")` → `Some("ab67616d")`
/// - `media_stem("https://example.com/")` → `None`
pub fn media_stem(url: &str) -> Option<String> {
    let name = filename_from_url_path(url)?;
    let stem = sanitize_filename_for_linux(strip_extension(&name));
    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_from_url_path() {
        assert_eq!(
            media_stem("https://i.scdn.co/image/ab67616d0000b273.jpg").as_deref(),
            Some("ab67616d0000b273")
        );
        assert_eq!(
            media_stem("https://canvaz.scdn.co/upload/..odd..name.webm").as_deref(),
            Some("odd..name")
        );
    }

    #[test]
    fn nothing_usable() {
        assert_eq!(media_stem("https://example.com/"), None);
        assert_eq!(media_stem("https://example.com/..."), None);
    }
}
