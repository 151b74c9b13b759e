//! Search listing parsing and candidate ranking.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html};
use shelfwise_core::models::CandidateRecord;
use shelfwise_core::text::{normalize_script, similarity, strip_annotations};
use tracing::debug;

use crate::catalog::{element_text, parse_selector};
use crate::error::Result;

static SUBJECT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"subject/(\d+)").expect("valid regex"));

/// Characters wrapped around the rating count, as in `(1234人评价)`.
const RATING_PEOPLE_NOISE: &[char] = &['(', ')', '（', '）', '人', '评', '价'];

/// Parses a search listing into candidates. Entries without a subject id, title or
/// publication line are skipped; similarity is left at zero for [`rank_candidates`].
pub fn parse_search_html(html: &str, detail_base_url: &str) -> Result<Vec<CandidateRecord>> {
    let result_selector = parse_selector(".result-list .result")?;
    let document = Html::parse_document(html);

    let results: Vec<ElementRef<'_>> = document.select(&result_selector).collect();
    debug!(count = results.len(), "search listing entries");

    let mut candidates = Vec::new();
    for (index, result) in results.into_iter().enumerate() {
        match parse_result(&result, detail_base_url) {
            Ok(Some(candidate)) => candidates.push(candidate),
            Ok(None) => {}
            Err(e) => debug!(entry = index + 1, error = %e, "skipping unparsable entry"),
        }
    }
    Ok(candidates)
}

fn parse_result(result: &ElementRef<'_>, detail_base_url: &str) -> Result<Option<CandidateRecord>> {
    let title_selector = parse_selector(".title h3 a")?;
    let rating_info_selector = parse_selector(".rating-info")?;
    let cast_selector = parse_selector(".subject-cast")?;
    let cover_selector = parse_selector(".pic img")?;
    let rating_selector = parse_selector(".rating_nums")?;
    let rating_people_selector = parse_selector(".rating_nums + span")?;
    let intro_selector = parse_selector(".content p")?;

    let Some(title_elem) = result.select(&title_selector).next() else {
        debug!("entry has no title element");
        return Ok(None);
    };
    let title: String = element_text(&title_elem)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let title = normalize_script(&title);

    let href = title_elem.value().attr("href").unwrap_or_default();
    let Some(catalog_id) = extract_subject_id(href, detail_base_url) else {
        debug!(%title, href, "entry has no subject id");
        return Ok(None);
    };

    let Some(rating_info) = result.select(&rating_info_selector).next() else {
        debug!(%title, "entry has no rating info");
        return Ok(None);
    };
    let Some(cast) = rating_info.select(&cast_selector).next() else {
        debug!(%title, "entry has no publication line");
        return Ok(None);
    };

    let cast_text = normalize_script(&element_text(&cast));
    let parts: Vec<&str> = cast_text.split('/').map(str::trim).collect();
    let author = parts.first().copied().unwrap_or_default().to_string();
    let publisher = (parts.len() > 2)
        .then(|| parts[parts.len() - 2].to_string())
        .filter(|p| !p.is_empty());
    let year = parts
        .iter()
        .find(|p| p.len() == 4 && p.chars().all(|c| c.is_ascii_digit()))
        .map(|p| (*p).to_string());

    let cover_url = result
        .select(&cover_selector)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);
    let rating = rating_info
        .select(&rating_selector)
        .next()
        .map(|e| element_text(&e))
        .filter(|r| !r.is_empty());
    let rating_people = rating_info
        .select(&rating_people_selector)
        .next()
        .map(|e| element_text(&e).trim_matches(RATING_PEOPLE_NOISE).trim().to_string())
        .filter(|r| !r.is_empty());
    let intro = result
        .select(&intro_selector)
        .next()
        .map(|p| normalize_script(&element_text(&p)))
        .filter(|i| !i.is_empty());

    debug!(%title, %author, ?publisher, ?year, ?rating, ?rating_people, "parsed entry");

    Ok(Some(CandidateRecord {
        detail_url: format!("{}/subject/{catalog_id}/", detail_base_url.trim_end_matches('/')),
        title,
        author,
        year,
        publisher,
        cover_url,
        rating,
        rating_people,
        intro,
        catalog_id,
        title_similarity: 0.0,
        author_similarity: None,
    }))
}

/// Subject id from a listing link: either a `link2` redirect carrying the real
/// URL in its `url` parameter, or a direct `…/subject/<id>/` link.
///
/// Relative links are resolved against `base`.
pub fn extract_subject_id(href: &str, base: &str) -> Option<String> {
    let target = if href.contains("link2") {
        let url = Url::parse(href)
            .or_else(|_| Url::parse(base).and_then(|base| base.join(href)))
            .ok()?;
        let (_, encoded) = url.query_pairs().find(|(k, _)| k == "url")?;
        urlencoding::decode(&encoded).ok()?.into_owned()
    } else {
        href.to_string()
    };
    SUBJECT_ID_RE.captures(&target).map(|c| c[1].to_string())
}

/// Scores every candidate against the query actually sent, drops those under
/// `min_similarity` and sorts best first. Equal scores keep listing order.
pub fn rank_candidates(query: &str, candidates: Vec<CandidateRecord>, min_similarity: f64) -> Vec<CandidateRecord> {
    let mut scored: Vec<CandidateRecord> = candidates
        .into_iter()
        .map(|mut c| {
            c.title_similarity = similarity(query, &c.title);
            debug!(title = %c.title, similarity = c.title_similarity, "scored candidate");
            c
        })
        .filter(|c| c.title_similarity >= min_similarity)
        .collect();
    scored.sort_by(|a, b| b.title_similarity.total_cmp(&a.title_similarity));
    scored
}

/// Candidates within `margin` of the best score. Expects `ranked` sorted best first.
pub fn tie_set(ranked: &[CandidateRecord], margin: f64) -> Vec<CandidateRecord> {
    let Some(top) = ranked.first().map(|c| c.title_similarity) else {
        return Vec::new();
    };
    ranked
        .iter()
        .filter(|c| (c.title_similarity - top).abs() < margin)
        .cloned()
        .collect()
}

/// Index of the tie-set member whose author best matches `expected_author`,
/// if any scores above `threshold`. Records `author_similarity` on every member.
pub fn match_author(tie: &mut [CandidateRecord], expected_author: &str, threshold: f64) -> Option<usize> {
    let expected = normalize_script(&strip_annotations(expected_author));
    if expected.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in tie.iter_mut().enumerate() {
        let score = similarity(&expected, &strip_annotations(&candidate.author));
        candidate.author_similarity = Some(score);
        if score > threshold && best.is_none_or(|(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}
