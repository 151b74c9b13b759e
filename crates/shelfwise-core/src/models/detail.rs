use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Fields only available on a candidate's detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailFields {
    pub isbn: Option<String>,
    pub pages: Option<String>,
    pub price: Option<String>,
    pub binding: Option<String>,
    pub series: Option<String>,
    pub publish_year: Option<String>,
    pub publisher: Option<String>,
    pub authors: Vec<String>,
    pub translators: Vec<String>,
    /// Order of first appearance, no duplicates.
    pub tags: Vec<String>,
    pub full_intro: Option<String>,
    pub rating: Option<String>,
    pub rating_people: Option<String>,
}

impl DetailFields {
    /// First four-digit run of `publish_year`, e.g. `"2008"` from `"2008-1"`.
    pub fn publish_year_digits(&self) -> Option<String> {
        let raw = self.publish_year.as_deref()?;
        let bytes = raw.as_bytes();
        bytes
            .windows(4)
            .enumerate()
            .find(|(i, w)| {
                w.iter().all(u8::is_ascii_digit)
                    && (*i == 0 || !bytes[i - 1].is_ascii_digit())
                    && bytes.get(i + 4).is_none_or(|b| !b.is_ascii_digit())
            })
            .map(|(i, _)| raw[i..i + 4].to_string())
    }
}

/// Removes repeated entries, keeping the first occurrence of each.
pub fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
