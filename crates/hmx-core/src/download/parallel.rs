//! Run many fetches concurrently.
//!
//! Keeps up to `jobs` fetches in flight; when one finishes, the next queued
//! URL is started until the queue is empty.

use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Arc;

use super::{fetch, DownloadError, DownloadOptions, Fetched};

/// Fetches every `(id, url)` and returns the results sorted by `id`.
/// Individual failures are returned in place; only a panicked task is an error.
pub async fn fetch_all(
    requests: Vec<(usize, String)>,
    opts: &DownloadOptions,
    jobs: usize,
) -> Result<Vec<(usize, Result<Fetched, DownloadError>)>> {
    let jobs = jobs.max(1);
    let opts = Arc::new(opts.clone());
    let mut queue: VecDeque<(usize, String)> = requests.into();
    let mut results = Vec::with_capacity(queue.len());
    let mut join_set = tokio::task::JoinSet::new();

    loop {
        while join_set.len() < jobs {
            let Some((id, url)) = queue.pop_front() else {
                break;
            };
            let opts = Arc::clone(&opts);
            join_set.spawn_blocking(move || {
                let res = fetch(&url, &opts);
                if let Err(e) = &res {
                    tracing::warn!(url = %url, "download failed: {}", e);
                }
                (id, res)
            });
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        results.push(res.map_err(|e| anyhow::anyhow!("download task join: {}", e))?);
    }

    results.sort_by_key(|(id, _)| *id);
    Ok(results)
}
