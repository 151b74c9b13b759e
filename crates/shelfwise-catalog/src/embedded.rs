//! Author/title stored inside the ebook file itself.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use lopdf::Document;
use once_cell::sync::Lazy;
use regex::Regex;
use shelfwise_core::models::EmbeddedMetadata;
use tracing::debug;
use zip::ZipArchive;

use crate::error::{CatalogError, Result};

static CONTAINER_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"full-path\s*=\s*["']([^"']+)["']"#).expect("valid regex"));
static XML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

pub trait EmbeddedMetadataReader: Send + Sync {
    /// Document info dictionary of a PDF.
    fn read_pdf(&self, path: &Path) -> Result<EmbeddedMetadata>;
    /// `dc:creator`/`dc:title` from the OPF package of an EPUB.
    fn read_epub(&self, path: &Path) -> Result<EmbeddedMetadata>;
    /// EXTH author/title of a MOBI, AZW or AZW3 file.
    fn read_mobi(&self, path: &Path) -> Result<EmbeddedMetadata>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FileMetadataReader;

/// Reads embedded metadata by extension. Never fails: any error, or a format
/// without embedded metadata, yields an empty result.
pub fn read_embedded(reader: &dyn EmbeddedMetadataReader, path: &Path, extension: &str) -> EmbeddedMetadata {
    let result = match extension.to_ascii_lowercase().as_str() {
        "pdf" => reader.read_pdf(path),
        "epub" => reader.read_epub(path),
        "mobi" | "azw" | "azw3" => reader.read_mobi(path),
        _ => return EmbeddedMetadata::default(),
    };
    match result {
        Ok(meta) => {
            debug!(path = %path.display(), author = ?meta.author, title = ?meta.title, "embedded metadata");
            meta
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "embedded metadata unreadable");
            EmbeddedMetadata::default()
        }
    }
}

impl EmbeddedMetadataReader for FileMetadataReader {
    fn read_pdf(&self, path: &Path) -> Result<EmbeddedMetadata> {
        let metadata = Document::load_metadata(path)
            .map_err(|e| CatalogError::Metadata(format!("failed to read PDF {}: {e}", path.display())))?;
        Ok(EmbeddedMetadata::from_raw(
            metadata.author.as_deref(),
            metadata.title.as_deref(),
        ))
    }

    fn read_epub(&self, path: &Path) -> Result<EmbeddedMetadata> {
        let file = File::open(path)?;
        let mut archive =
            ZipArchive::new(file).map_err(|e| CatalogError::Metadata(format!("invalid EPUB ZIP: {e}")))?;

        let container_xml = read_zip_entry_to_string(&mut archive, "META-INF/container.xml")?;
        let opf_path = CONTAINER_PATH_RE
            .captures(&container_xml)
            .map(|caps| caps[1].to_string())
            .or_else(|| {
                archive
                    .file_names()
                    .find(|name| name.to_ascii_lowercase().ends_with(".opf"))
                    .map(ToOwned::to_owned)
            })
            .ok_or_else(|| CatalogError::Metadata("EPUB does not contain an OPF package".to_string()))?;

        let opf_xml = read_zip_entry_to_string(&mut archive, &opf_path)?;
        Ok(EmbeddedMetadata::from_raw(
            first_tag(&opf_xml, "dc:creator").as_deref(),
            first_tag(&opf_xml, "dc:title").as_deref(),
        ))
    }

    fn read_mobi(&self, path: &Path) -> Result<EmbeddedMetadata> {
        parse_mobi(&fs::read(path)?)
    }
}

fn read_zip_entry_to_string(archive: &mut ZipArchive<File>, path: &str) -> Result<String> {
    let mut entry = archive
        .by_name(path)
        .map_err(|e| CatalogError::Metadata(format!("missing EPUB entry {path}: {e}")))?;
    let mut buffer = String::new();
    entry
        .read_to_string(&mut buffer)
        .map_err(|e| CatalogError::Metadata(format!("failed to read EPUB entry {path}: {e}")))?;
    Ok(buffer)
}

fn first_tag(xml: &str, tag: &str) -> Option<String> {
    let re = Regex::new(&format!(r"(?is)<{tag}\b[^>]*>(.*?)</{tag}>")).ok()?;
    re.captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| XML_TAG_RE.replace_all(m.as_str(), "").trim().to_string())
        .find(|text| !text.is_empty())
}

// ─── MOBI ─────────────────────────────────────────────────────────────────────

const PDB_RECORD0_OFFSET: usize = 78;
const MOBI_MAGIC: &[u8] = b"MOBI";
const EXTH_MAGIC: &[u8] = b"EXTH";
const EXTH_FLAG: u32 = 0x40;
const EXTH_AUTHOR: u32 = 100;
const EXTH_UPDATED_TITLE: u32 = 503;
const ENCODING_UTF8: u32 = 65001;

/// Author from EXTH record 100; title from EXTH 503, else the MOBI full name.
fn parse_mobi(data: &[u8]) -> Result<EmbeddedMetadata> {
    let rec0 = read_u32(data, PDB_RECORD0_OFFSET)? as usize;
    let mobi = rec0 + 16;
    if data.get(mobi..mobi + 4) != Some(MOBI_MAGIC) {
        return Err(CatalogError::Metadata("missing MOBI header".to_string()));
    }
    let header_len = read_u32(data, rec0 + 20)? as usize;
    let utf8 = read_u32(data, rec0 + 28)? == ENCODING_UTF8;

    let name_offset = read_u32(data, rec0 + 84)? as usize;
    let name_len = read_u32(data, rec0 + 88)? as usize;
    let full_name = data
        .get(rec0 + name_offset..rec0 + name_offset + name_len)
        .map(|bytes| decode(bytes, utf8));

    let mut author = None;
    let mut title = None;
    let flags = read_u32(data, rec0 + 128)?;
    if flags & EXTH_FLAG != 0 {
        let exth = mobi + header_len;
        if data.get(exth..exth + 4) == Some(EXTH_MAGIC) {
            let count = read_u32(data, exth + 8)?;
            let mut pos = exth + 12;
            for _ in 0..count {
                let kind = read_u32(data, pos)?;
                let len = read_u32(data, pos + 4)? as usize;
                if len < 8 {
                    break;
                }
                let value = data.get(pos + 8..pos + len).map(|bytes| decode(bytes, utf8));
                match kind {
                    EXTH_AUTHOR if author.is_none() => author = value,
                    EXTH_UPDATED_TITLE if title.is_none() => title = value,
                    _ => {}
                }
                pos += len;
            }
        }
    }

    Ok(EmbeddedMetadata::from_raw(
        author.as_deref(),
        title.or(full_name).as_deref(),
    ))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u32::from_be_bytes)
        .ok_or_else(|| CatalogError::Metadata(format!("truncated MOBI data at offset {offset}")))
}

/// UTF-8, or Latin-1 for the legacy code page.
fn decode(bytes: &[u8], utf8: bool) -> String {
    let text = if utf8 {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        bytes.iter().map(|&b| char::from(b)).collect()
    };
    text.trim_end_matches('\0').to_string()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;
    use zip::write::FileOptions;

    use super::*;

    fn write_epub(dir: &TempDir, opf: &str) -> std::path::PathBuf {
        let path = dir.path().join("book.epub");
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        writer.start_file("mimetype", FileOptions::default()).unwrap();
        writer.write_all(b"application/epub+zip").unwrap();
        writer
            .start_file("META-INF/container.xml", FileOptions::default())
            .unwrap();
        writer
            .write_all(
                br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#,
            )
            .unwrap();
        writer.start_file("OEBPS/content.opf", FileOptions::default()).unwrap();
        writer.write_all(opf.as_bytes()).unwrap();
        writer.finish().unwrap();
        path
    }

    /// Minimal PDB + MOBI header with the given EXTH records.
    fn mobi_bytes(full_name: &str, exth: &[(u32, &str)]) -> Vec<u8> {
        let rec0 = 80usize;
        let header_len = 232usize;

        let mut exth_block = Vec::new();
        for (kind, value) in exth {
            exth_block.extend_from_slice(&kind.to_be_bytes());
            exth_block.extend_from_slice(&((value.len() + 8) as u32).to_be_bytes());
            exth_block.extend_from_slice(value.as_bytes());
        }
        let mut exth_full = Vec::new();
        exth_full.extend_from_slice(EXTH_MAGIC);
        exth_full.extend_from_slice(&((exth_block.len() + 12) as u32).to_be_bytes());
        exth_full.extend_from_slice(&(exth.len() as u32).to_be_bytes());
        exth_full.extend_from_slice(&exth_block);

        let name_offset = 16 + header_len + exth_full.len();
        let mut data = vec![0u8; rec0 + name_offset];
        data[78..82].copy_from_slice(&(rec0 as u32).to_be_bytes());
        data[rec0 + 16..rec0 + 20].copy_from_slice(MOBI_MAGIC);
        data[rec0 + 20..rec0 + 24].copy_from_slice(&(header_len as u32).to_be_bytes());
        data[rec0 + 28..rec0 + 32].copy_from_slice(&ENCODING_UTF8.to_be_bytes());
        data[rec0 + 84..rec0 + 88].copy_from_slice(&(name_offset as u32).to_be_bytes());
        data[rec0 + 88..rec0 + 92].copy_from_slice(&(full_name.len() as u32).to_be_bytes());
        let flags = if exth.is_empty() { 0 } else { EXTH_FLAG };
        data[rec0 + 128..rec0 + 132].copy_from_slice(&flags.to_be_bytes());
        let exth_start = rec0 + 16 + header_len;
        data[exth_start..exth_start + exth_full.len()].copy_from_slice(&exth_full);
        data.extend_from_slice(full_name.as_bytes());
        data
    }

    #[test]
    fn reads_epub_package_metadata() {
        let dir = TempDir::new().unwrap();
        let path = write_epub(
            &dir,
            r#"<package><metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
  <dc:title>三體</dc:title>
  <dc:creator opf:role="aut">劉慈欣</dc:creator>
</metadata></package>"#,
        );

        let meta = read_embedded(&FileMetadataReader, &path, "epub");
        assert_eq!(meta.title.as_deref(), Some("三体"));
        assert_eq!(meta.author.as_deref(), Some("刘慈欣"));
    }

    #[test]
    fn epub_with_blank_fields_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = write_epub(&dir, "<package><dc:title>  </dc:title></package>");
        assert!(read_embedded(&FileMetadataReader, &path, "EPUB").is_empty());
    }

    #[test]
    fn reads_mobi_exth_records() {
        let data = mobi_bytes("santi", &[(EXTH_AUTHOR, "刘慈欣"), (EXTH_UPDATED_TITLE, "三体")]);
        let meta = parse_mobi(&data).unwrap();
        assert_eq!(meta.author.as_deref(), Some("刘慈欣"));
        assert_eq!(meta.title.as_deref(), Some("三体"));
    }

    #[test]
    fn mobi_without_exth_uses_full_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.azw3");
        fs::write(&path, mobi_bytes("球状闪电", &[])).unwrap();

        let meta = read_embedded(&FileMetadataReader, &path, "azw3");
        assert_eq!(meta.title.as_deref(), Some("球状闪电"));
        assert_eq!(meta.author, None);
    }

    #[test]
    fn truncated_mobi_is_an_error() {
        assert!(matches!(parse_mobi(&[0u8; 40]), Err(CatalogError::Metadata(_))));
    }

    #[test]
    fn unreadable_files_fail_closed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"not a pdf").unwrap();

        assert!(read_embedded(&FileMetadataReader, &path, "pdf").is_empty());
        assert!(read_embedded(&FileMetadataReader, &dir.path().join("missing.epub"), "epub").is_empty());
        assert!(read_embedded(&FileMetadataReader, &path, "txt").is_empty());
    }
}
