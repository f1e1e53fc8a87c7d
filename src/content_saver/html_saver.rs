use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::utils::{CanonicalUrl, to_mirror_path};

use super::resource_saver::write_atomic;

/// Save a rewritten page at the mirror path of `url` below `output_root`
///
/// URLs that differ only by query share one mirror file; the last save wins.
pub async fn save_html_content(
    html_content: String,
    url: &CanonicalUrl,
    output_root: &Path,
) -> Result<PathBuf> {
    let path = to_mirror_path(url).under(output_root);
    let size = html_content.len();

    write_atomic(&path, html_content.into_bytes()).await?;

    log::debug!(
        target: "sitemirror::save",
        "Saved page {url} ({size} bytes) to {}",
        path.display()
    );
    Ok(path)
}
