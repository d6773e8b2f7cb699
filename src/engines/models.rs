//! Model and training-data cache shared by the engines
//!
//! Files are fetched once into `<cache dir>/pdf-ocr-extract/` and reused on
//! later runs.

use crate::error::ExtractError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Root of the on-disk cache (`~/.cache/pdf-ocr-extract` on Linux)
pub fn cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("pdf-ocr-extract")
}

/// Ensure `filename` exists under the cache (optionally in `subdir`),
/// downloading it from `url` if needed, and return its path
pub fn ensure_cached(
    url: &str,
    subdir: Option<&str>,
    filename: &str,
) -> Result<PathBuf, ExtractError> {
    let mut cache_dir = cache_root();
    if let Some(subdir) = subdir {
        cache_dir = cache_dir.join(subdir);
    }

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        ExtractError::InitializationError(format!("Failed to create cache directory: {}", e))
    })?;

    let path = cache_dir.join(filename);

    if !path.exists() {
        tracing::info!("Downloading {} (this may take a moment)...", filename);
        download_file(url, &path)?;
        tracing::info!("Downloaded {} to {:?}", filename, path);
    } else {
        tracing::info!("Using cached {} from {:?}", filename, path);
    }

    Ok(path)
}

/// Download a file from URL to path using ureq
fn download_file(url: &str, path: &Path) -> Result<(), ExtractError> {
    let response = ureq::get(url).call().map_err(|e| {
        ExtractError::InitializationError(format!("Failed to download {}: {}", url, e))
    })?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        ExtractError::InitializationError(format!("Failed to read response body: {}", e))
    })?;

    // A partial download must never be mistaken for a cached file
    let partial = partial_path(path);
    let mut file = File::create(&partial).map_err(|e| {
        ExtractError::InitializationError(format!("Failed to create {:?}: {}", partial, e))
    })?;
    file.write_all(&buffer).map_err(|e| {
        ExtractError::InitializationError(format!("Failed to write {:?}: {}", partial, e))
    })?;
    std::fs::rename(&partial, path).map_err(|e| {
        ExtractError::InitializationError(format!("Failed to move {:?} into place: {}", path, e))
    })?;

    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
