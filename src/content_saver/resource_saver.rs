use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::time::timeout;

use crate::utils::{CanonicalUrl, to_mirror_path};

/// Timeout for the blocking write of one mirror file
const BLOCKING_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Write `content` to `path` atomically.
///
/// Parent directories are created; the bytes land in a temp file beside the
/// target which is then renamed over it, so readers never see a partial file.
pub async fn write_atomic(path: &Path, content: Vec<u8>) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Path has no parent directory: {}", path.display()))?
        .to_path_buf();
    tokio::fs::create_dir_all(&parent)
        .await
        .with_context(|| format!("Failed to create directory {}", parent.display()))?;

    let target = path.to_path_buf();
    let blocking_task = tokio::task::spawn_blocking(move || -> Result<()> {
        let mut temp_file = NamedTempFile::new_in(&parent)?;
        temp_file.write_all(&content)?;
        temp_file.persist(&target)?;
        Ok(())
    });

    match timeout(BLOCKING_WRITE_TIMEOUT, blocking_task).await {
        Ok(Ok(result)) => result.with_context(|| format!("Failed to write {}", path.display())),
        Ok(Err(e)) => Err(anyhow::anyhow!("Blocking write task panicked: {e}")),
        Err(_) => {
            log::warn!(
                target: "sitemirror::save",
                "Blocking write timeout for file: {} (timeout: {:?})",
                path.display(),
                BLOCKING_WRITE_TIMEOUT
            );
            Err(anyhow::anyhow!(
                "Write timed out after {BLOCKING_WRITE_TIMEOUT:?} - possible filesystem hang"
            ))
        }
    }
}

/// Save raw resource bytes at the mirror path of `url` below `output_root`
pub async fn save_resource(body: &[u8], url: &CanonicalUrl, output_root: &Path) -> Result<PathBuf> {
    let path = to_mirror_path(url).under(output_root);
    write_atomic(&path, body.to_vec()).await?;

    log::debug!(
        target: "sitemirror::save",
        "Saved resource {url} ({} bytes) to {}",
        body.len(),
        path.display()
    );
    Ok(path)
}
