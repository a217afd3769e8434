//! Magic-byte sniffing.

/// EBML header ID; every WebM/Matroska initialization segment starts with it.
pub const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

pub fn has_container_signature(prefix: &[u8]) -> bool {
    prefix.starts_with(&EBML_MAGIC)
}

/// Container MIME type read from the payload's leading bytes: EBML is WebM,
/// an ISO BMFF `ftyp` box is MP4.
pub fn container_content_type(data: &[u8]) -> Option<&'static str> {
    if has_container_signature(data) {
        Some("video/webm")
    } else if data.get(4..8) == Some(b"ftyp".as_slice()) {
        Some("video/mp4")
    } else {
        None
    }
}

/// File extension (without dot) for a payload: declared content type first,
/// then magic bytes, else `bin`.
pub fn sniff_extension(content_type: Option<&str>, data: &[u8]) -> &'static str {
    if let Some(ct) = content_type.map(str::to_ascii_lowercase) {
        for (needle, ext) in [
            ("jpeg", "jpg"),
            ("jpg", "jpg"),
            ("png", "png"),
            ("gif", "gif"),
            ("webp", "webp"),
            ("webm", "webm"),
            ("mp4", "mp4"),
        ] {
            if ct.contains(needle) {
                return ext;
            }
        }
    }

    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else if data.starts_with(b"\x89PNG") {
        "png"
    } else if data.starts_with(b"GIF8") {
        "gif"
    } else if data.starts_with(b"RIFF") && data.get(8..12) == Some(b"WEBP".as_slice()) {
        "webp"
    } else {
        match container_content_type(data) {
            Some("video/webm") => "webm",
            Some(_) => "mp4",
            None => "bin",
        }
    }
}

/// True for extensions written to the `videos/` folder.
pub fn is_video_extension(ext: &str) -> bool {
    matches!(ext, "webm" | "mp4")
}
