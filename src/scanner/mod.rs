// Scanner module
// Finds the source files that get indexed

#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::ScanConfig;
use crate::{RagError, Result};

/// Collect indexable files under `config.root`, sorted by path
#[inline]
pub fn scan_files(config: &ScanConfig) -> Result<Vec<PathBuf>> {
    if !config.root.is_dir() {
        return Err(RagError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Source root is not a directory: {}", config.root.display()),
        )));
    }

    let extensions: Vec<String> = config
        .extensions
        .iter()
        .map(|ext| normalize_extension(ext))
        .collect();

    let mut files = Vec::new();
    let walker = WalkDir::new(&config.root)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_ignored_dir(entry, &config.ignore_dirs));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() || !has_allowed_extension(entry.path(), &extensions) {
            continue;
        }

        match entry.metadata() {
            Ok(meta) if meta.len() <= config.max_file_size => files.push(entry.into_path()),
            Ok(meta) => debug!(
                "Skipping {} ({} bytes exceeds limit)",
                entry.path().display(),
                meta.len()
            ),
            Err(e) => warn!("Skipping {}: {}", entry.path().display(), e),
        }
    }

    files.sort();
    info!(
        "Found {} files to index under {}",
        files.len(),
        config.root.display()
    );
    Ok(files)
}

/// Read a file as text, replacing invalid UTF-8 sequences
#[inline]
pub fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn is_ignored_dir(entry: &DirEntry, ignore_dirs: &[String]) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| ignore_dirs.iter().any(|ignored| ignored == name))
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = format!(".{}", ext.to_lowercase());
            extensions.contains(&ext)
        })
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}
