//! Single GET with curl, wrapped in the retry loop.

use std::str;

use super::{DownloadError, DownloadOptions, Fetched};
use crate::retry::run_with_retry;

/// Fetches `url` into memory. Blocking; call from `spawn_blocking` when used
/// from async code.
pub fn fetch(url: &str, opts: &DownloadOptions) -> Result<Fetched, DownloadError> {
    check_scheme(url)?;
    run_with_retry(&opts.retry, || fetch_once(url, opts))
}

fn check_scheme(url: &str) -> Result<(), DownloadError> {
    match url::Url::parse(url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(()),
        _ => Err(DownloadError::InvalidUrl(url.to_string())),
    }
}

fn fetch_once(url: &str, opts: &DownloadOptions) -> Result<Fetched, DownloadError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.timeout(opts.timeout)?;
    easy.useragent(&opts.user_agent)?;
    if let Some(referer) = &opts.referer {
        easy.referer(referer)?;
    }

    let mut body = Vec::new();
    let mut content_type = None;
    {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            if let Ok(line) = str::from_utf8(line) {
                if let Some((name, value)) = line.split_once(':') {
                    if name.trim().eq_ignore_ascii_case("content-type") {
                        // After redirects the last response's header wins.
                        content_type = Some(value.trim().to_string());
                    }
                }
            }
            true
        })?;
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(DownloadError::Http(code));
    }
    if body.len() < opts.min_bytes {
        return Err(DownloadError::TooSmall {
            received: body.len(),
            min: opts.min_bytes,
        });
    }
    tracing::debug!(url, bytes = body.len(), "fetched");
    Ok(Fetched {
        bytes: body,
        content_type: content_type.filter(|c| !c.is_empty()),
    })
}
