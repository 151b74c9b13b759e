use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Lists the top-level book files of `dir`, sorted by name.
///
/// Subdirectories are ignored, so already organized folders are never picked up again.
pub fn scan_directory(dir: &Path, formats: &[String]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CoreError::DirectoryNotFound(dir.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_book_file(&path, formats) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Check if a path has one of the configured book extensions (case-insensitive).
pub fn is_book_file(path: &Path, formats: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext_str = ext.to_string_lossy().to_lowercase();
            formats.iter().any(|f| f.eq_ignore_ascii_case(&ext_str))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn formats() -> Vec<String> {
        vec!["pdf".to_string(), "epub".to_string(), "azw3".to_string()]
    }

    #[test]
    fn test_scan_directory_top_level_only() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("三体.epub")).unwrap();
        File::create(dir.path().join("notes.md")).unwrap();
        File::create(dir.path().join("Dune.PDF")).unwrap();
        let organized = dir.path().join("刘慈欣 - 球状闪电");
        fs::create_dir_all(&organized).unwrap();
        File::create(organized.join("球状闪电.epub")).unwrap();

        let files = scan_directory(dir.path(), &formats()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| p.parent() == Some(dir.path())));
    }

    #[test]
    fn test_scan_missing_directory() {
        let err = scan_directory(Path::new("/nonexistent/shelfwise/books"), &formats()).unwrap_err();
        assert!(matches!(err, CoreError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_is_book_file() {
        assert!(is_book_file(Path::new("a.AZW3"), &formats()));
        assert!(!is_book_file(Path::new("a.txt"), &formats()));
        assert!(!is_book_file(Path::new("README"), &formats()));
    }
}
