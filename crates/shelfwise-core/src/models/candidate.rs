use serde::{Deserialize, Serialize};

/// One entry of a catalog search listing, scored against the query that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub title: String,
    pub author: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,

    /// Rating as displayed by the catalog, e.g. `"8.9"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,

    /// Rating count as displayed, possibly with thousands separators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_people: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,

    pub detail_url: String,
    pub catalog_id: String,

    /// Similarity between the query actually sent and `title`.
    #[serde(default)]
    pub title_similarity: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_similarity: Option<f64>,
}

impl CandidateRecord {
    /// Numeric rating; unparsable or missing counts as zero.
    pub fn rating_value(&self) -> f64 {
        parse_rating(self.rating.as_deref())
    }

    /// Numeric rating count; unparsable or missing counts as zero.
    pub fn rating_people_count(&self) -> u64 {
        parse_rating_people(self.rating_people.as_deref())
    }
}

pub fn parse_rating(raw: Option<&str>) -> f64 {
    raw.and_then(|r| r.trim().parse::<f64>().ok())
        .filter(|r| r.is_finite())
        .unwrap_or(0.0)
}

pub fn parse_rating_people(raw: Option<&str>) -> u64 {
    raw.and_then(|r| r.replace(',', "").trim().parse::<u64>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_views_of_display_strings() {
        let candidate = CandidateRecord {
            rating: Some("8.9".to_string()),
            rating_people: Some("12,345".to_string()),
            ..Default::default()
        };
        assert_eq!(candidate.rating_value(), 8.9);
        assert_eq!(candidate.rating_people_count(), 12_345);
    }

    #[test]
    fn test_unparsable_numbers_count_as_zero() {
        let candidate = CandidateRecord {
            rating: Some("暂无评分".to_string()),
            rating_people: Some("少于10".to_string()),
            ..Default::default()
        };
        assert_eq!(candidate.rating_value(), 0.0);
        assert_eq!(candidate.rating_people_count(), 0);
        assert_eq!(CandidateRecord::default().rating_value(), 0.0);
    }
}
