//! `.nfo` sidecar written next to an organized book.
//!
//! The element set is fixed: media managers read these files, so names and
//! order must not change.

use std::path::Path;

use quick_xml::se::Serializer;
use serde::Serialize;
use tracing::info;

use crate::error::{CoreError, Result};
use crate::models::BookRecord;
use crate::text::{normalize_script, strip_annotations};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const TAG_SEPARATOR: &str = " / ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename = "book")]
pub struct BookSidecar {
    pub title: String,
    pub publish_date: String,
    pub year: String,
    pub isbn: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub genre: String,
    pub publisher: String,
    pub artist: String,
    pub introduction: String,
}

impl BookSidecar {
    pub fn from_record(record: &BookRecord, language: &str) -> Self {
        let text = |value: Option<&str>| normalize_script(value.unwrap_or_default());
        let artist = record
            .all_authors
            .first()
            .map(String::as_str)
            .or(record.primary_author.as_deref())
            .map(strip_annotations)
            .unwrap_or_default();

        Self {
            title: normalize_script(&record.title),
            publish_date: text(record.publish_year.as_deref()),
            year: text(record.year.as_deref()),
            isbn: text(record.isbn.as_deref()),
            language: language.to_string(),
            tag: (!record.tags.is_empty())
                .then(|| normalize_script(&record.tags.join(TAG_SEPARATOR))),
            genre: text(record.tags.first().map(String::as_str)),
            publisher: text(record.publisher.as_deref()),
            artist: normalize_script(&artist),
            introduction: text(record.synopsis()),
        }
    }
}

/// Renders the sidecar document, declaration included.
pub fn render_sidecar(record: &BookRecord, language: &str) -> Result<String> {
    let sidecar = BookSidecar::from_record(record, language);

    let mut body = String::new();
    let mut ser = Serializer::with_root(&mut body, Some("book"))
        .map_err(|e| CoreError::Sidecar(e.to_string()))?;
    ser.indent(' ', 4);
    sidecar
        .serialize(ser)
        .map_err(|e| CoreError::Sidecar(e.to_string()))?;

    Ok(format!("{XML_DECLARATION}\n{body}\n"))
}

/// Writes the sidecar for a matched book. Unmatched books get no sidecar at all.
pub fn write_sidecar(record: Option<&BookRecord>, path: &Path, language: &str) -> Result<bool> {
    let Some(record) = record else {
        return Ok(false);
    };
    let xml = render_sidecar(record, language)?;
    std::fs::write(path, xml)?;
    info!(path = %path.display(), "wrote sidecar");
    Ok(true)
}
