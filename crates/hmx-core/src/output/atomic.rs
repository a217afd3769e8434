//! Write-then-rename so a crash never leaves a half-written media file under
//! its final name.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const TEMP_SUFFIX: &str = ".part";

/// Appends `.part` to the final path (`cover.jpg` → `cover.jpg.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Writes `data` to `<final>.part`, syncs, then renames onto `final_path`.
pub fn write_atomic(final_path: &Path, data: &[u8]) -> Result<()> {
    let tmp = temp_path(final_path);
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp)
        .with_context(|| format!("failed to create temp file: {}", tmp.display()))?;
    file.write_all(data)
        .with_context(|| format!("write {}", tmp.display()))?;
    file.sync_all().context("sync failed")?;
    drop(file);

    std::fs::rename(&tmp, final_path).with_context(|| {
        format!("failed to rename {} to {}", tmp.display(), final_path.display())
    })?;
    Ok(())
}
