//! Script normalization and fuzzy title matching.
//!
//! Every string that ends up in a [`BookRecord`](crate::models::BookRecord)
//! passes through [`normalize_script`]; every catalog comparison goes through
//! [`similarity`].

use once_cell::sync::Lazy;
use regex::Regex;
use similar::TextDiff;
use zhconv::{Variant, zhconv};

/// Whitespace plus the punctuation and bracket set ignored when comparing titles.
static COMPARE_NOISE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\s.,，。:：;；!！?？《》\[\]【】()（）]").expect("valid regex")
});

/// Bracketed annotations such as nationality markers: `[美]`, `〔日〕`, `(英)`.
static ANNOTATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[[^\]]*\]|〔[^〕]*〕|\([^)]*\)|（[^）]*）|【[^】]*】").expect("valid regex")
});

/// Score granted when one normalized string contains the other.
pub const SUBSTRING_BOOST: f64 = 0.8;

/// Converts CJK text to its simplified-script form. Empty input is returned as is.
pub fn normalize_script(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    zhconv(text, Variant::ZhHans)
}

/// Canonical comparison form: simplified script, lowercase, noise characters removed.
fn comparable(text: &str) -> String {
    let simplified = normalize_script(text).to_lowercase();
    COMPARE_NOISE_RE.replace_all(&simplified, "").into_owned()
}

/// Similarity in `[0, 1]` between two titles or names.
///
/// Uses the character-level alignment ratio, boosted to at least
/// [`SUBSTRING_BOOST`] when one side contains the other. Symmetric.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = comparable(a);
    let b = comparable(b);

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let (first, second) = if a <= b { (&a, &b) } else { (&b, &a) };
    let ratio = f64::from(TextDiff::from_chars(first.as_str(), second.as_str()).ratio());

    if a.contains(b.as_str()) || b.contains(a.as_str()) {
        ratio.max(SUBSTRING_BOOST)
    } else {
        ratio
    }
}

/// Removes every bracketed annotation and trims the remainder.
pub fn strip_annotations(text: &str) -> String {
    ANNOTATION_RE.replace_all(text, "").trim().to_string()
}

/// True for characters a cleaned title or name may start or end with.
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Drops leading and trailing characters that are not CJK ideographs, ASCII letters or digits.
pub fn trim_edge_noise(text: &str) -> String {
    text.trim_matches(|c: char| !is_name_char(c)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_identity() {
        for s in ["三体", "The Left Hand of Darkness", "百年孤独（纪念版）", "a"] {
            assert_eq!(similarity(s, s), 1.0, "{s}");
        }
    }

    #[test]
    fn test_similarity_ignores_case_and_punctuation() {
        assert_eq!(similarity("Dune!", "dune"), 1.0);
        assert_eq!(similarity("《三体》", "三 体"), 1.0);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let pairs = [
            ("三体", "三体问题"),
            ("解忧杂货店", "白夜行"),
            ("abcdef", "fedcba"),
            ("挪威的森林", "挪威森林"),
            ("", "三体"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a), "{a} / {b}");
        }
    }

    #[test]
    fn test_substring_boost() {
        assert!(similarity("三体", "三体问题") >= 0.8);
        assert!(similarity("三体问题", "三体") >= 0.8);
    }

    #[test]
    fn test_similarity_of_unrelated_titles_is_low() {
        assert!(similarity("三体", "活着") < 0.5);
    }

    #[test]
    fn test_empty_input_scores_zero() {
        assert_eq!(similarity("", "三体"), 0.0);
        assert_eq!(similarity("《》", ""), 0.0);
    }

    #[test]
    fn test_normalize_script_simplifies() {
        assert_eq!(normalize_script("三體"), "三体");
        assert_eq!(normalize_script(""), "");
    }

    #[test]
    fn test_normalize_script_idempotent() {
        let once = normalize_script("挪威的森林 龍族");
        assert_eq!(normalize_script(&once), once);
    }

    #[test]
    fn test_traditional_and_simplified_compare_equal() {
        assert_eq!(similarity("三體", "三体"), 1.0);
    }

    #[test]
    fn test_strip_annotations() {
        assert_eq!(strip_annotations("[美]卡尔·萨根"), "卡尔·萨根");
        assert_eq!(strip_annotations("〔日〕东野圭吾 (著)"), "东野圭吾");
    }

    #[test]
    fn test_trim_edge_noise() {
        assert_eq!(trim_edge_noise("  ·三体!! "), "三体");
        assert_eq!(trim_edge_noise("--Dune 2--"), "Dune 2");
        assert_eq!(trim_edge_noise("···"), "");
    }
}
