//! Detail page parsing: ISBN, publisher, authors, translators, tags, synopsis, rating.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use shelfwise_core::models::{DetailFields, dedup_preserving_order};
use shelfwise_core::text::normalize_script;
use tracing::debug;

use crate::catalog::{element_text, parse_selector};
use crate::error::{CatalogError, Result};

static AUTHOR_ANNOTATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\[（(【〔][^\]）)】〕]*[\]）)】〕]").expect("valid regex")
});
static AUTHOR_PAREN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)").expect("valid regex"));
static AUTHOR_LATIN_TAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\x{4e00}-\x{9fff}])\s*[A-Za-z\s.]+$").expect("valid regex"));
static CRITERIA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"criteria\s*=\s*'([^']*)'").expect("valid regex"));

const AUTHOR_LABEL: &str = "作者";
const TAG_CATEGORY_PREFIX: &str = "7:";
const SUBJECT_FACET: &str = "subject";

/// Parses a detail page. Fails only when the `#info` block is missing.
pub fn parse_detail_html(html: &str) -> Result<DetailFields> {
    let document = Html::parse_document(html);
    let info_selector = parse_selector("#info")?;
    let info = document
        .select(&info_selector)
        .next()
        .ok_or_else(|| CatalogError::MissingElement("#info".to_string()))?;

    let info_text = info_lines(&info);
    let field = |label: &str| extract_field(&info_text, label);

    let translators = field("译者")
        .map(|raw| {
            raw.split(',')
                .map(|t| normalize_script(t.trim()))
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let detail = DetailFields {
        isbn: field("ISBN"),
        pages: field("页数"),
        price: field("定价"),
        binding: field("装帧"),
        series: field("丛书"),
        publish_year: field("出版年"),
        publisher: field("出版社"),
        authors: extract_authors(&info)?,
        translators,
        tags: extract_tags(&document)?,
        full_intro: extract_full_intro(&document)?,
        rating: first_text(&document, ".rating_self strong.rating_num")?,
        rating_people: first_text(&document, ".rating_sum .rating_people")?
            .map(|p| p.replace("人评价", "").trim().to_string())
            .filter(|p| !p.is_empty()),
    };

    debug!(
        isbn = ?detail.isbn,
        publisher = ?detail.publisher,
        publish_year = ?detail.publish_year,
        authors = ?detail.authors,
        tags = ?detail.tags,
        "parsed detail page"
    );
    Ok(detail)
}

/// Text of the info block with `<br>` turned into line breaks.
fn info_lines(info: &ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in info.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}

/// Value after `label:` up to the end of its line.
fn extract_field(info_text: &str, label: &str) -> Option<String> {
    let pattern = format!(r"{}:\s*([^\n]+)", regex::escape(label));
    let re = Regex::new(&pattern).ok()?;
    let value = re.captures(info_text)?.get(1)?.as_str().trim();
    (!value.is_empty()).then(|| normalize_script(value))
}

fn extract_authors(info: &ElementRef<'_>) -> Result<Vec<String>> {
    let span_selector = parse_selector("span")?;
    let link_selector = parse_selector("a")?;

    let label = info.select(&span_selector).find(|span| {
        span.text().collect::<String>().contains(AUTHOR_LABEL)
            && !span
                .descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .any(|el| el.value().name() == "span")
    });
    let Some(label) = label else {
        return Ok(Vec::new());
    };

    let parent_span = label
        .parent()
        .and_then(ElementRef::wrap)
        .filter(|p| p.value().name() == "span");

    let names: Vec<String> = match parent_span {
        Some(parent) => parent.select(&link_selector).map(|a| element_text(&a)).collect(),
        None => label
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .take_while(|el| el.value().name() != "br")
            .filter(|el| el.value().name() == "a")
            .map(|a| element_text(&a))
            .collect(),
    };

    Ok(names
        .iter()
        .map(|name| clean_detail_author(name))
        .filter(|name| !name.is_empty())
        .collect())
}

/// Strips nationality annotations, parenthesized originals and trailing Latin names.
pub fn clean_detail_author(name: &str) -> String {
    let name = AUTHOR_ANNOTATION_RE.replace_all(name, "");
    let name = AUTHOR_PAREN_RE.replace_all(&name, "");
    let name = AUTHOR_LATIN_TAIL_RE.replace(&name, "$1");
    normalize_script(name.trim())
}

fn extract_tags(document: &Html) -> Result<Vec<String>> {
    let script_selector = parse_selector(r#"script[type="text/javascript"]"#)?;

    let mut tags = Vec::new();
    let criteria_script = document
        .select(&script_selector)
        .map(|s| s.text().collect::<String>())
        .find(|text| text.contains("criteria"));
    if let Some(script) = criteria_script
        && let Some(caps) = CRITERIA_RE.captures(&script)
    {
        tags = caps[1]
            .split('|')
            .filter(|part| part.starts_with(TAG_CATEGORY_PREFIX) && !part.contains(SUBJECT_FACET))
            .filter_map(|part| part.split(':').nth(1))
            .map(|tag| normalize_script(tag.trim()))
            .filter(|tag| !tag.is_empty())
            .collect();
    }

    if tags.is_empty() {
        let anchor_selector = parse_selector("a.tag")?;
        tags = document
            .select(&anchor_selector)
            .map(|a| normalize_script(&element_text(&a)))
            .filter(|tag| !tag.is_empty())
            .collect();
    }

    Ok(dedup_preserving_order(tags))
}

fn extract_full_intro(document: &Html) -> Result<Option<String>> {
    for css in ["#link-report .intro", ".related_info .intro"] {
        let selector = parse_selector(css)?;
        for block in document.select(&selector) {
            let text = block
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            if !text.is_empty() {
                return Ok(Some(normalize_script(&text)));
            }
        }
    }
    Ok(None)
}

fn first_text(document: &Html, css: &str) -> Result<Option<String>> {
    let selector = parse_selector(css)?;
    Ok(document
        .select(&selector)
        .next()
        .map(|e| element_text(&e))
        .filter(|t| !t.is_empty()))
}
