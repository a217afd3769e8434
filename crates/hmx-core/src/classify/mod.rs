//! Signature classifier: is a captured response an image, a segmented
//! container fragment, or irrelevant?
//!
//! Checks run in a fixed order and the first match wins: known image CDN,
//! known container CDN, declared `image/*` content type, EBML magic bytes.

mod pattern;
mod signature;

use serde::Serialize;

pub use pattern::{UrlPattern, DEFAULT_CONTAINER_PATTERNS, DEFAULT_IMAGE_PATTERNS};
pub use signature::{
    container_content_type, has_container_signature, is_video_extension, sniff_extension,
    EBML_MAGIC,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Image,
    ContainerFragment,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    /// Not enough signal to decide. Never fatal; callers treat it as `Ignore`.
    #[error("classification ambiguous for {url}: {reason}")]
    Ambiguous { url: String, reason: &'static str },
}

#[derive(Debug, Clone)]
pub struct Classifier {
    image: Vec<UrlPattern>,
    container: Vec<UrlPattern>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_patterns(DEFAULT_IMAGE_PATTERNS, DEFAULT_CONTAINER_PATTERNS)
    }
}

impl Classifier {
    pub fn new(image: Vec<UrlPattern>, container: Vec<UrlPattern>) -> Self {
        Self { image, container }
    }

    /// Builds a classifier from pattern strings, skipping (and logging) unusable ones.
    pub fn from_patterns<S: AsRef<str>>(image: &[S], container: &[S]) -> Self {
        fn parse_all<S: AsRef<str>>(patterns: &[S]) -> Vec<UrlPattern> {
            patterns
                .iter()
                .filter_map(|p| {
                    let parsed = UrlPattern::parse(p.as_ref());
                    if parsed.is_none() {
                        tracing::warn!(pattern = p.as_ref(), "ignoring empty URL pattern");
                    }
                    parsed
                })
                .collect()
        }
        Self::new(parse_all(image), parse_all(container))
    }

    /// Pure verdict for one response; ambiguity degrades to `Ignore`.
    pub fn classify(&self, url: &str, content_type: Option<&str>, prefix: &[u8]) -> Verdict {
        match self.try_classify(url, content_type, prefix) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::debug!("{}", e);
                Verdict::Ignore
            }
        }
    }

    /// Like [`Classifier::classify`] but reports why nothing matched when the
    /// URL itself could not be read.
    pub fn try_classify(
        &self,
        url: &str,
        content_type: Option<&str>,
        prefix: &[u8],
    ) -> Result<Verdict, ClassifyError> {
        let parsed = url::Url::parse(url).ok();
        if let Some(u) = &parsed {
            let host = u.host_str().unwrap_or_default();
            let path = u.path();
            if self.image.iter().any(|p| p.matches(host, path)) {
                return Ok(Verdict::Image);
            }
            if self.container.iter().any(|p| p.matches(host, path)) {
                return Ok(Verdict::ContainerFragment);
            }
        }

        if content_type.is_some_and(is_image_content_type) {
            return Ok(Verdict::Image);
        }
        if has_container_signature(prefix) {
            return Ok(Verdict::ContainerFragment);
        }
        if parsed.is_none() {
            return Err(ClassifyError::Ambiguous {
                url: url.to_string(),
                reason: "URL does not parse and neither content type nor signature decides",
            });
        }
        Ok(Verdict::Ignore)
    }

    /// Verdict from the URL alone (used on strings found inside JSON bodies).
    pub fn classify_url(&self, url: &str) -> Verdict {
        self.classify(url, None, &[])
    }
}

fn is_image_content_type(ct: &str) -> bool {
    ct.trim()
        .get(..6)
        .is_some_and(|p| p.eq_ignore_ascii_case("image/"))
}
