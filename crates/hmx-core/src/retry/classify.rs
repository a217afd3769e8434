//! Classify HTTP status and curl errors into retry policy error kinds.

use crate::download::DownloadError;
use crate::retry::policy::ErrorKind;

pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// A body that arrived complete but too small is an error page or a
/// placeholder; asking again will not change it.
pub fn classify(e: &DownloadError) -> ErrorKind {
    match e {
        DownloadError::Curl(ce) => classify_curl_error(ce),
        DownloadError::Http(code) => classify_http_status(*code),
        DownloadError::TooSmall { .. } | DownloadError::InvalidUrl(_) => ErrorKind::Other,
    }
}
