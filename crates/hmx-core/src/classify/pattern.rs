//! Host/path patterns for known media CDNs.

/// Image CDNs seen in Spotify web player captures.
pub const DEFAULT_IMAGE_PATTERNS: &[&str] = &[
    "i.scdn.co",
    "mosaic.scdn.co",
    "seed-mix-image.spotifycdn.com",
    "lineup-images.scdn.co",
    "thisis-images.scdn.co",
    "charts-images.scdn.co",
    "daily-mix.scdn.co",
    "mixed-media-images.spotifycdn.com",
];

/// Canvas (looping video) CDNs; these serve WebM init and media segments.
pub const DEFAULT_CONTAINER_PATTERNS: &[&str] = &[
    "video-akpcw.spotifycdn.com",
    "video-fa723fc0e0b4479496acdae1c1f.spotifycdn.com",
    "canvas.scdn.co",
    "canvaz.scdn.co",
];

/// `host` or `host/path-prefix`. The host matches exactly or as a parent
/// domain (`scdn.co` matches `i.scdn.co`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    host: String,
    path_prefix: Option<String>,
}

impl UrlPattern {
    /// Parses `host[/prefix]`, tolerating a leading `http://` or `https://`.
    /// Returns `None` for an empty host.
    pub fn parse(pattern: &str) -> Option<Self> {
        let p = pattern.trim();
        let p = p
            .strip_prefix("https://")
            .or_else(|| p.strip_prefix("http://"))
            .unwrap_or(p);
        let (host, path) = match p.split_once('/') {
            Some((h, rest)) => (h, Some(rest.trim_end_matches('/'))),
            None => (p, None),
        };
        if host.is_empty() {
            return None;
        }
        Some(UrlPattern {
            host: host.to_ascii_lowercase(),
            path_prefix: path.filter(|s| !s.is_empty()).map(|s| format!("/{s}")),
        })
    }

    pub fn matches(&self, host: &str, path: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let host_ok = host == self.host
            || host
                .strip_suffix(self.host.as_str())
                .is_some_and(|rest| rest.ends_with('.'));
        host_ok
            && self
                .path_prefix
                .as_deref()
                .map_or(true, |prefix| path.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_only_matches_host_and_subdomains() {
        let p = UrlPattern::parse("scdn.co").unwrap();
        assert!(p.matches("scdn.co", "/"));
        assert!(p.matches("i.scdn.co", "/image/x"));
        assert!(!p.matches("notscdn.co", "/"));
        assert!(!p.matches("scdn.com", "/"));
    }

    #[test]
    fn path_prefix_restricts() {
        let p = UrlPattern::parse("https://cdn.example.com/media/").unwrap();
        assert!(p.matches("cdn.example.com", "/media/a.jpg"));
        assert!(!p.matches("cdn.example.com", "/static/a.js"));
    }

    #[test]
    fn empty_pattern_rejected() {
        assert!(UrlPattern::parse("").is_none());
        assert!(UrlPattern::parse("/path").is_none());
    }
}
