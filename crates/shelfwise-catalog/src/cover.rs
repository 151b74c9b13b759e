use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{CatalogError, Result};
use crate::http::HttpFetcher;

/// Downloads a cover image to `path`, creating parent folders.
pub async fn download_cover(fetcher: &HttpFetcher, url: &str, path: &Path) -> Result<()> {
    let bytes = fetcher.get_bytes(url).await?;
    if bytes.is_empty() {
        return Err(CatalogError::Parse(format!("empty cover image at {url}")));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "cover saved");
    Ok(())
}
