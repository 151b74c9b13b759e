use serde::Serialize;

use crate::filename::clean_author;
use crate::models::{BookRecord, RawFilenameTokens};

/// Final answer for one file: the names used for renaming plus the catalog record, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedBook {
    pub title: String,
    pub author: Option<String>,
    pub year: Option<String>,
    pub extension: String,
    /// `None` means a bare rename with no sidecar content.
    pub record: Option<BookRecord>,
}

impl ResolvedBook {
    pub fn is_matched(&self) -> bool {
        self.record.is_some()
    }
}

/// Combines the pre-search guess with the catalog match.
///
/// Catalog title/year/author win when a match exists; the guess fills the gaps.
/// Returns `None` when no title is known from either side, which means the file is skipped.
pub fn assemble(guess: &RawFilenameTokens, record: Option<BookRecord>) -> Option<ResolvedBook> {
    let (title, author, year) = match &record {
        Some(r) => (
            Some(r.title.clone()).filter(|t| !t.trim().is_empty()),
            r.primary_author.clone(),
            r.year.clone(),
        ),
        None => (None, None, None),
    };

    let title = title.or_else(|| guess.title.clone())?;
    let author = author
        .or_else(|| guess.author.clone())
        .map(|a| clean_author(&a))
        .filter(|a| !a.is_empty());
    let year = year.or_else(|| guess.year.clone());

    Some(ResolvedBook {
        title,
        author,
        year,
        extension: guess.extension.clone(),
        record,
    })
}
