use serde::{Deserialize, Serialize};

// ─── RawFilenameTokens ──────────────────────────────────────

/// What the filename alone says about a book. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFilenameTokens {
    pub author: Option<String>,
    pub title: Option<String>,
    /// Four ASCII digits.
    pub year: Option<String>,
    /// Extension as written, without the dot; empty when the name has none.
    pub extension: String,
}

impl RawFilenameTokens {
    pub fn is_complete(&self) -> bool {
        self.author.is_some() && self.title.is_some()
    }

    /// Fills missing author/title from embedded metadata; present values win.
    pub fn fill_from(&mut self, embedded: &EmbeddedMetadata) {
        if self.author.is_none() {
            self.author = embedded.author.clone();
        }
        if self.title.is_none() {
            self.title = embedded.title.clone();
        }
    }
}

// ─── EmbeddedMetadata ───────────────────────────────────────

/// Author/title stored inside the file itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedMetadata {
    pub author: Option<String>,
    pub title: Option<String>,
}

impl EmbeddedMetadata {
    /// Builds from raw property values: trims, drops empties, normalizes script.
    pub fn from_raw(author: Option<&str>, title: Option<&str>) -> Self {
        let clean = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(crate::text::normalize_script)
        };
        Self {
            author: clean(author),
            title: clean(title),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.author.is_none() && self.title.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_from_keeps_existing_fields() {
        let mut tokens = RawFilenameTokens {
            author: None,
            title: Some("三体".to_string()),
            year: None,
            extension: "epub".to_string(),
        };
        let embedded = EmbeddedMetadata {
            author: Some("刘慈欣".to_string()),
            title: Some("Three Body".to_string()),
        };
        tokens.fill_from(&embedded);

        assert_eq!(tokens.author.as_deref(), Some("刘慈欣"));
        assert_eq!(tokens.title.as_deref(), Some("三体"));
        assert!(tokens.is_complete());
    }

    #[test]
    fn test_embedded_from_raw_drops_blank_values() {
        let meta = EmbeddedMetadata::from_raw(Some("  "), Some(" 三體 "));
        assert_eq!(meta.author, None);
        assert_eq!(meta.title.as_deref(), Some("三体"));
        assert!(EmbeddedMetadata::from_raw(None, Some("")).is_empty());
    }
}
