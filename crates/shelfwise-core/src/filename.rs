//! Title/author/year guessing from loosely named ebook files.
//!
//! Rules run in a fixed order and each one only fills what is still missing;
//! nothing here fails, a name that matches no rule just yields empty fields.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::RawFilenameTokens;
use crate::text::{normalize_script, strip_annotations, trim_edge_noise};

/// Marketplace suffixes appended to downloaded files, e.g. `(Z-Library)`.
pub const DISTRIBUTOR_TAGS: &[&str] = &["Z-Library"];

/// Groups longer than this are treated as subtitles rather than names.
const MAX_AUTHOR_GROUP_CHARS: usize = 20;
/// Titles longer than this are cut at the first sentence punctuation.
const MAX_TITLE_CHARS: usize = 30;

/// Separators tried, in order, when splitting a bare stem into author and title.
pub const TITLE_AUTHOR_SEPARATORS: &[&str] = &[" - ", " – ", "_", "：", ":", "  "];

static DISTRIBUTOR_RE: Lazy<Regex> = Lazy::new(|| {
    let tags = DISTRIBUTOR_TAGS
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\s*\((?:{tags})\)")).expect("valid regex")
});
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d{4})\)").expect("valid regex"));
static PAREN_GROUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^()]+)\)").expect("valid regex"));
static NESTED_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"〔[^〕]+〕|\([^)]+\)|\[[^\]]+\]|（[^）]+）").expect("valid regex"));
static BOOK_QUOTES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"《([^》]+)》").expect("valid regex"));
static ALL_GROUPS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]|（[^）]*）|【[^】]*】").expect("valid regex"));
static TITLE_MARKERS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"【[^】]*】|《|》").expect("valid regex"));
static SHORT_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^，。：；！？,.:;!?]+").expect("valid regex"));

/// Parses a filename (with extension) into its best-guess tokens.
pub fn parse_filename(filename: &str) -> RawFilenameTokens {
    let (stem, extension) = split_extension(filename);
    let name = DISTRIBUTOR_RE.replace_all(stem, "").trim().to_string();

    let year = YEAR_RE.captures(&name).map(|c| c[1].to_string());

    let mut author = author_from_groups(&name);
    if author.is_none()
        && let Some((left, _)) = name.split_once(" - ")
    {
        let left = left.trim();
        if left.chars().count() < MAX_AUTHOR_GROUP_CHARS && !left.is_empty() {
            author = Some(left.to_string());
        }
    }

    let title = if let Some(caps) = BOOK_QUOTES_RE.captures(&name) {
        caps[1].trim().to_string()
    } else {
        let cleaned = ALL_GROUPS_RE.replace_all(&name, " ").trim().to_string();
        match (&author, cleaned.split_once(" - ")) {
            (Some(a), Some((left, right))) if left.trim() == a => right.trim().to_string(),
            _ => cleaned,
        }
    };

    RawFilenameTokens {
        author: author.map(|a| clean_author(&a)).filter(|a| !a.is_empty()),
        title: Some(clean_title(&title)).filter(|t| !t.is_empty()),
        year,
        extension: extension.to_string(),
    }
}

/// First qualifying parenthesized group; nationality-annotated groups lose their markers.
fn author_from_groups(name: &str) -> Option<String> {
    for caps in PAREN_GROUP_RE.captures_iter(name) {
        let group = caps[1].trim();
        let numeric = !group.is_empty() && group.chars().all(char::is_numeric);
        if numeric || group.chars().count() > MAX_AUTHOR_GROUP_CHARS {
            continue;
        }
        if NESTED_MARKER_RE.is_match(group) {
            let stripped = NESTED_MARKER_RE.replace_all(group, "").trim().to_string();
            return Some(stripped).filter(|a| !a.is_empty());
        }
        return Some(group.to_string()).filter(|a| !a.is_empty());
    }
    None
}

fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => (&filename[..idx], &filename[idx + 1..]),
        _ => (filename, ""),
    }
}

/// Title cleanup: drops `【…】` and book-title quotes, shortens overlong titles,
/// trims edge noise and normalizes script. Idempotent.
pub fn clean_title(title: &str) -> String {
    let mut title = trim_edge_noise(&TITLE_MARKERS_RE.replace_all(title, ""));
    if title.chars().count() > MAX_TITLE_CHARS
        && let Some(m) = SHORT_TITLE_RE.find(&title)
    {
        title = trim_edge_noise(m.as_str());
    }
    normalize_script(&title)
}

/// Author cleanup: strips nationality annotations, trims edge noise and normalizes script.
pub fn clean_author(author: &str) -> String {
    normalize_script(&trim_edge_noise(&strip_annotations(author)))
}

/// Splits a bare stem on the first separator found, giving `(author, title)`.
///
/// Used when neither the parser nor embedded metadata produced a title and author.
/// Without a separator the whole stem is the title.
pub fn split_title_author(filename: &str) -> (Option<String>, Option<String>) {
    let (stem, _) = split_extension(filename);
    let stem = stem.trim();

    for sep in TITLE_AUTHOR_SEPARATORS {
        if let Some((left, right)) = stem.split_once(sep) {
            let author = Some(clean_author(left)).filter(|a| !a.is_empty());
            let title = Some(clean_title(right)).filter(|t| !t.is_empty());
            return (author, title);
        }
    }

    (None, Some(clean_title(stem)).filter(|t| !t.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parenthesized_author_and_year() {
        let tokens = parse_filename("三体 (刘慈欣) (2008) (Z-Library).epub");
        assert_eq!(tokens.author.as_deref(), Some("刘慈欣"));
        assert_eq!(tokens.title.as_deref(), Some("三体"));
        assert_eq!(tokens.year.as_deref(), Some("2008"));
        assert_eq!(tokens.extension, "epub");
    }

    #[test]
    fn test_book_quotes_take_precedence_over_dash() {
        let tokens = parse_filename("《百年孤独》 - 加西亚·马尔克斯.pdf");
        assert_eq!(tokens.title.as_deref(), Some("百年孤独"));
        assert_eq!(tokens.extension, "pdf");
    }

    #[test]
    fn test_dash_author_prefix() {
        let tokens = parse_filename("东野圭吾 - 白夜行.mobi");
        assert_eq!(tokens.author.as_deref(), Some("东野圭吾"));
        assert_eq!(tokens.title.as_deref(), Some("白夜行"));
        assert_eq!(tokens.year, None);
    }

    #[test]
    fn test_nationality_marker_inside_group() {
        let tokens = parse_filename("局外人 (〔法〕加缪).epub");
        assert_eq!(tokens.author.as_deref(), Some("加缪"));
        assert_eq!(tokens.title.as_deref(), Some("局外人"));
    }

    #[test]
    fn test_numeric_and_long_groups_are_skipped() {
        let tokens = parse_filename(
            "人类简史 (2014) (一部关于人类从动物到上帝的完整历史叙述文本) (赫拉利).pdf",
        );
        assert_eq!(tokens.author.as_deref(), Some("赫拉利"));
        assert_eq!(tokens.year.as_deref(), Some("2014"));
        assert_eq!(tokens.title.as_deref(), Some("人类简史"));
    }

    #[test]
    fn test_traditional_script_is_simplified() {
        let tokens = parse_filename("三體 (劉慈欣).epub");
        assert_eq!(tokens.title.as_deref(), Some("三体"));
        assert_eq!(tokens.author.as_deref(), Some("刘慈欣"));
    }

    #[test]
    fn test_long_title_is_cut_at_punctuation() {
        let tokens =
            parse_filename("思考快与慢：关于人类如何做出判断以及为何常常犯错的一次完整深入的心理学之旅.pdf");
        assert_eq!(tokens.title.as_deref(), Some("思考快与慢"));
    }

    #[test]
    fn test_no_rules_match() {
        let tokens = parse_filename("dune.txt");
        assert_eq!(tokens.author, None);
        assert_eq!(tokens.title.as_deref(), Some("dune"));
        assert_eq!(tokens.extension, "txt");

        let tokens = parse_filename("()");
        assert_eq!(tokens.title, None);
        assert_eq!(tokens.extension, "");
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let long_title = format!("!{}，尾巴", "三".repeat(31));
        let raws = ["【精校】《三体》!!", "  ·  挪威的森林 ", "[美]卡尔·萨根", "〔日〕東野圭吾", long_title.as_str()];
        for raw in raws {
            let title = clean_title(raw);
            assert_eq!(clean_title(&title), title, "{raw}");
            let author = clean_author(raw);
            assert_eq!(clean_author(&author), author, "{raw}");
        }
    }

    #[test]
    fn test_separator_split() {
        assert_eq!(
            split_title_author("余华_活着.epub"),
            (Some("余华".to_string()), Some("活着".to_string()))
        );
        assert_eq!(
            split_title_author("刘慈欣：球状闪电.pdf"),
            (Some("刘慈欣".to_string()), Some("球状闪电".to_string()))
        );
        assert_eq!(split_title_author("活着.txt"), (None, Some("活着".to_string())));
    }
}
