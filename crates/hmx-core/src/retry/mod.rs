//! Retry and backoff policy for fetching unresolved candidates.
//!
//! Error classification (timeouts, throttling, connection failures) and
//! exponential backoff decisions live here so the downloader only has to
//! describe what went wrong.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
