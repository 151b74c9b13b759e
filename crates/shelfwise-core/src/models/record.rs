use serde::{Deserialize, Serialize};

use crate::models::{CandidateRecord, DetailFields};
use crate::text::{strip_annotations, trim_edge_noise};

/// Canonical metadata for one matched book: the winning candidate merged with its detail page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,

    /// Display author, annotations stripped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_author: Option<String>,

    /// Every credited author in page order, as listed by the catalog.
    #[serde(default)]
    pub all_authors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_year: Option<String>,

    #[serde(default)]
    pub translators: Vec<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Short synopsis from the search listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_intro: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_people: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,

    pub detail_url: String,
    pub catalog_id: String,
    pub title_similarity: f64,
}

impl BookRecord {
    /// Merges a winning candidate with its (optional) detail page.
    ///
    /// Detail values win when present; the listing fills the rest.
    pub fn from_match(candidate: CandidateRecord, detail: Option<DetailFields>) -> Self {
        let detail = detail.unwrap_or_default();

        let year = candidate
            .year
            .clone()
            .or_else(|| detail.publish_year_digits());

        let raw_author = detail
            .authors
            .first()
            .cloned()
            .or_else(|| Some(candidate.author.clone()).filter(|a| !a.trim().is_empty()));
        let primary_author = raw_author
            .map(|a| trim_edge_noise(&strip_annotations(&a)))
            .filter(|a| !a.is_empty());

        let all_authors = if detail.authors.is_empty() {
            primary_author.iter().cloned().collect()
        } else {
            detail.authors
        };

        Self {
            title: candidate.title,
            primary_author,
            all_authors,
            year,
            publisher: detail.publisher.or(candidate.publisher),
            isbn: detail.isbn,
            pages: detail.pages,
            price: detail.price,
            binding: detail.binding,
            series: detail.series,
            publish_year: detail.publish_year,
            translators: detail.translators,
            tags: detail.tags,
            intro: candidate.intro,
            full_intro: detail.full_intro,
            rating: detail.rating.or(candidate.rating),
            rating_people: detail.rating_people.or(candidate.rating_people),
            cover_url: candidate.cover_url,
            detail_url: candidate.detail_url,
            catalog_id: candidate.catalog_id,
            title_similarity: candidate.title_similarity,
        }
    }

    /// Longest available synopsis.
    pub fn synopsis(&self) -> Option<&str> {
        self.full_intro
            .as_deref()
            .or(self.intro.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> CandidateRecord {
        CandidateRecord {
            title: "挪威的森林".to_string(),
            author: "Haruki Murakami".to_string(),
            year: None,
            publisher: Some("上海译文出版社".to_string()),
            rating: Some("8.1".to_string()),
            rating_people: Some("300".to_string()),
            intro: Some("短简介".to_string()),
            detail_url: "https://book.douban.com/subject/1046265/".to_string(),
            catalog_id: "1046265".to_string(),
            title_similarity: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_detail_author_wins_over_listing_author() {
        let detail = DetailFields {
            authors: vec!["村上春树".to_string()],
            ..Default::default()
        };
        let record = BookRecord::from_match(candidate(), Some(detail));
        assert_eq!(record.primary_author.as_deref(), Some("村上春树"));
        assert_eq!(record.all_authors, vec!["村上春树"]);
    }

    #[test]
    fn test_listing_author_used_without_detail() {
        let record = BookRecord::from_match(candidate(), None);
        assert_eq!(record.primary_author.as_deref(), Some("Haruki Murakami"));
        assert_eq!(record.all_authors, vec!["Haruki Murakami"]);
        assert_eq!(record.publisher.as_deref(), Some("上海译文出版社"));
        assert_eq!(record.synopsis(), Some("短简介"));
    }

    #[test]
    fn test_author_annotations_are_stripped() {
        let mut c = candidate();
        c.author = "[日] 村上春树 ".to_string();
        let record = BookRecord::from_match(c, None);
        assert_eq!(record.primary_author.as_deref(), Some("村上春树"));
    }

    #[test]
    fn test_detail_scalars_override_listing() {
        let detail = DetailFields {
            publisher: Some("新经典".to_string()),
            publish_year: Some("2018-3".to_string()),
            rating: Some("8.3".to_string()),
            full_intro: Some("完整简介".to_string()),
            isbn: Some("9787532776771".to_string()),
            ..Default::default()
        };
        let record = BookRecord::from_match(candidate(), Some(detail));
        assert_eq!(record.publisher.as_deref(), Some("新经典"));
        assert_eq!(record.year.as_deref(), Some("2018"));
        assert_eq!(record.rating.as_deref(), Some("8.3"));
        assert_eq!(record.rating_people.as_deref(), Some("300"));
        assert_eq!(record.isbn.as_deref(), Some("9787532776771"));
        assert_eq!(record.synopsis(), Some("完整简介"));
    }
}
