//! Folder naming and file moves for resolved books.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::assemble::ResolvedBook;
use crate::config::LibraryConfig;
use crate::error::{CoreError, Result};

const FORBIDDEN_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replaces path-hostile characters with `_`. Never returns an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if FORBIDDEN_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_end_matches('.').trim();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Folder name from the configured pattern; the year-less pattern is used without a year.
///
/// Without an author the folder is just the title, with the year appended when known.
pub fn folder_name(library: &LibraryConfig, book: &ResolvedBook) -> String {
    let name = match (&book.author, &book.year) {
        (Some(author), Some(year)) => fill_pattern(&library.folder_pattern, author, &book.title, year),
        (Some(author), None) => fill_pattern(&library.folder_pattern_no_year, author, &book.title, ""),
        (None, Some(year)) => format!("{} ({year})", book.title),
        (None, None) => book.title.clone(),
    };
    sanitize_filename(&name)
}

fn fill_pattern(pattern: &str, author: &str, title: &str, year: &str) -> String {
    pattern
        .replace("{author}", author)
        .replace("{title}", title)
        .replace("{year}", year)
}

/// Where everything for one book goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizePlan {
    pub source: PathBuf,
    pub folder: PathBuf,
    pub target_file: PathBuf,
    pub cover_path: PathBuf,
    pub sidecar_path: PathBuf,
}

impl OrganizePlan {
    pub fn new(library: &LibraryConfig, output_dir: &Path, source: &Path, book: &ResolvedBook) -> Self {
        let folder = output_dir.join(folder_name(library, book));
        let stem = sanitize_filename(&book.title);
        let file_name = if book.extension.is_empty() {
            stem.clone()
        } else {
            format!("{stem}.{}", book.extension)
        };
        Self {
            source: source.to_path_buf(),
            target_file: folder.join(file_name),
            cover_path: folder.join(format!("{stem}.jpg")),
            sidecar_path: folder.join(format!("{stem}.nfo")),
            folder,
        }
    }

    /// Human-readable target relative to the output directory, e.g. `folder/title.epub`.
    pub fn display_target(&self) -> String {
        let folder = self
            .folder
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let file = self
            .target_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        format!("{folder}/{file}")
    }

    /// Creates the folder and moves the file into it. An existing target is never overwritten.
    pub fn execute_move(&self) -> Result<()> {
        if self.target_file.exists() {
            return Err(CoreError::DestinationExists(
                self.target_file.display().to_string(),
            ));
        }
        fs::create_dir_all(&self.folder)?;
        debug!(folder = %self.folder.display(), "created book folder");

        if fs::rename(&self.source, &self.target_file).is_err() {
            // rename fails across filesystems
            fs::copy(&self.source, &self.target_file)?;
            fs::remove_file(&self.source)?;
        }
        info!(
            from = %self.source.display(),
            to = %self.target_file.display(),
            "moved book file"
        );
        Ok(())
    }
}
