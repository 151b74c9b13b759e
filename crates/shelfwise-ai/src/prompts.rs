//! Prompt builders and reply parsers for the two delegated decisions.

use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;
use shelfwise_core::assemble::ResolvedBook;
use shelfwise_core::models::CandidateRecord;

/// Word that must precede the chosen position in a selection reply.
pub const SELECTION_MARKER: &str = "Option";

const INTRO_PREVIEW_CHARS: usize = 100;
const UNKNOWN: &str = "unknown";

static SELECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i){SELECTION_MARKER}\s*(\d+)")).expect("valid regex"));

pub const SELECTION_SYSTEM: &str =
    "You match ebook files to catalog entries. Answer with the chosen option first.";

/// Describes every candidate and asks for the best one by 1-based position.
pub fn selection_prompt(candidates: &[CandidateRecord]) -> String {
    let mut prompt = String::from(
        "Pick the best match for an ebook among the catalog search results below. Criteria:\n\
         1. Title similarity (higher is better)\n\
         2. Rating (higher is better)\n\
         3. Number of ratings (more is better)\n\
         4. Completeness of the publication details\n\n",
    );

    for (i, c) in candidates.iter().enumerate() {
        let _ = writeln!(prompt, "{SELECTION_MARKER} {}:", i + 1);
        let _ = writeln!(prompt, "- Title: {}", c.title);
        let _ = writeln!(prompt, "- Author: {}", c.author);
        let _ = writeln!(prompt, "- Publisher: {}", c.publisher.as_deref().unwrap_or(UNKNOWN));
        let _ = writeln!(prompt, "- Year: {}", c.year.as_deref().unwrap_or(UNKNOWN));
        let _ = writeln!(
            prompt,
            "- Rating: {} ({} ratings)",
            c.rating.as_deref().unwrap_or(UNKNOWN),
            c.rating_people.as_deref().unwrap_or("0")
        );
        let _ = writeln!(prompt, "- Title similarity: {:.2}", c.title_similarity);
        if let Some(intro) = c.intro.as_deref().filter(|i| !i.is_empty()) {
            let preview: String = intro.chars().take(INTRO_PREVIEW_CHARS).collect();
            let _ = writeln!(prompt, "- Synopsis: {preview}...");
        }
        prompt.push('\n');
    }

    let _ = write!(
        prompt,
        "Reply with \"{SELECTION_MARKER} N\" for the best match, then briefly explain why."
    );
    prompt
}

/// Zero-based index named by the reply, if it names one in range.
pub fn parse_selection(reply: &str, count: usize) -> Option<usize> {
    let caps = SELECTION_RE.captures(reply)?;
    let position: usize = caps[1].parse().ok()?;
    (1..=count).contains(&position).then(|| position - 1)
}

pub const RENAME_SYSTEM: &str = "You review file renames for an ebook library.";

/// Asks whether moving `old_name` to `new_name` is right for the resolved book.
pub fn rename_prompt(old_name: &str, new_name: &str, book: &ResolvedBook) -> String {
    let record = book.record.as_ref();
    let field = |value: Option<&str>| value.unwrap_or(UNKNOWN).to_string();

    format!(
        "Should the following ebook file be renamed?\n\n\
         Current name: {old_name}\n\
         New name: {new_name}\n\n\
         Book details:\n\
         - Title: {title}\n\
         - Author: {author}\n\
         - Publisher: {publisher}\n\
         - Year: {year}\n\
         - Rating: {rating}\n\
         - Number of ratings: {people}\n\n\
         Consider whether the new name reflects the book accurately, whether information is lost, \
         whether this looks like a wrong match and whether the name follows the naming scheme. \
         Judge only from the details given here.\n\n\
         Answer APPROVE or REJECT on the first line, then explain on the next line.",
        title = book.title,
        author = field(book.author.as_deref()),
        publisher = field(record.and_then(|r| r.publisher.as_deref())),
        year = field(book.year.as_deref()),
        rating = field(record.and_then(|r| r.rating.as_deref())),
        people = field(record.and_then(|r| r.rating_people.as_deref())),
    )
}

/// True only when the first line of the reply is exactly `APPROVE` (case-insensitive).
pub fn parse_rename_decision(reply: &str) -> bool {
    reply
        .lines()
        .next()
        .map(|line| line.trim().eq_ignore_ascii_case("APPROVE"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<CandidateRecord> {
        vec![
            CandidateRecord {
                title: "三体".to_string(),
                author: "刘慈欣".to_string(),
                publisher: Some("重庆出版社".to_string()),
                year: Some("2008".to_string()),
                rating: Some("8.9".to_string()),
                rating_people: Some("123456".to_string()),
                intro: Some("文".repeat(150)),
                title_similarity: 1.0,
                ..Default::default()
            },
            CandidateRecord {
                title: "三体".to_string(),
                author: "刘慈欣".to_string(),
                title_similarity: 0.995,
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_selection_prompt_lists_every_option() {
        let prompt = selection_prompt(&candidates());
        assert!(prompt.contains("Option 1:"));
        assert!(prompt.contains("Option 2:"));
        assert!(prompt.contains("- Rating: 8.9 (123456 ratings)"));
        assert!(prompt.contains("- Publisher: unknown"));
        assert!(prompt.contains("- Title similarity: 1.00"));
        assert!(prompt.contains(&format!("- Synopsis: {}...", "文".repeat(100))));
        assert!(!prompt.contains(&"文".repeat(101)));
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("Option 2, because it has more ratings", 3), Some(1));
        assert_eq!(parse_selection("I pick option  1.", 3), Some(0));
        assert_eq!(parse_selection("Option 4", 3), None);
        assert_eq!(parse_selection("Option 0", 3), None);
        assert_eq!(parse_selection("the second one", 3), None);
    }

    #[test]
    fn test_parse_rename_decision() {
        assert!(parse_rename_decision("APPROVE\nlooks right"));
        assert!(parse_rename_decision("  approve  "));
        assert!(!parse_rename_decision("REJECT\nwrong author"));
        assert!(!parse_rename_decision("I would APPROVE this"));
        assert!(!parse_rename_decision(""));
    }

    #[test]
    fn test_rename_prompt_mentions_both_names() {
        let book = ResolvedBook {
            title: "三体".to_string(),
            author: Some("刘慈欣".to_string()),
            year: None,
            extension: "epub".to_string(),
            record: None,
        };
        let prompt = rename_prompt("santi.epub", "刘慈欣 - 三体/三体.epub", &book);
        assert!(prompt.contains("Current name: santi.epub"));
        assert!(prompt.contains("New name: 刘慈欣 - 三体/三体.epub"));
        assert!(prompt.contains("- Year: unknown"));
    }
}
