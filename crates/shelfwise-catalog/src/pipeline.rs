//! Per-file resolution: filename guess, embedded metadata, separator split,
//! operator prompt, catalog search and final assembly.

use std::path::Path;
use std::sync::Arc;

use shelfwise_core::assemble::{ResolvedBook, assemble};
use shelfwise_core::filename::{parse_filename, split_title_author};
use shelfwise_core::models::RawFilenameTokens;
use shelfwise_core::text::normalize_script;
use tracing::{debug, info, warn};

use crate::catalog::CatalogClient;
use crate::embedded::{EmbeddedMetadataReader, read_embedded};
use crate::prompt::Prompter;

/// Outcome for one file.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedBook),
    /// No title could be obtained; the file is skipped.
    Unresolvable { reason: String },
}

pub struct ResolutionPipeline {
    catalog: CatalogClient,
    reader: Arc<dyn EmbeddedMetadataReader>,
    prompter: Option<Arc<dyn Prompter>>,
}

impl ResolutionPipeline {
    pub fn new(catalog: CatalogClient, reader: Arc<dyn EmbeddedMetadataReader>) -> Self {
        Self {
            catalog,
            reader,
            prompter: None,
        }
    }

    /// Asks the operator for a title when nothing else yields one.
    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    pub async fn resolve(&self, path: &Path) -> Resolution {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut guess = parse_filename(&filename);
        debug!(%filename, ?guess, "parsed filename");

        if !guess.is_complete() {
            let embedded = read_embedded(self.reader.as_ref(), path, &guess.extension);
            guess.fill_from(&embedded);
        }
        if !guess.is_complete() {
            fill_from_separator_split(&mut guess, &filename);
        }

        if guess.title.is_none()
            && let Some(prompter) = &self.prompter
        {
            let answer = prompter
                .ask(&format!("No title found for {filename}. Enter title (empty to skip): "))
                .map(|a| normalize_script(a.trim()))
                .filter(|a| !a.is_empty());
            guess.title = answer;
        }

        let Some(title) = guess.title.clone() else {
            warn!(%filename, "no title could be determined");
            return Resolution::Unresolvable {
                reason: format!("no title could be determined for {filename}"),
            };
        };

        info!(%filename, %title, author = ?guess.author, year = ?guess.year, "resolving");
        let settings = self.catalog.settings();
        let record = self
            .catalog
            .search(
                &title,
                guess.author.as_deref(),
                settings.fetch_detail,
                settings.min_similarity,
            )
            .await;
        if record.is_none() {
            info!(%filename, %title, "no catalog match, falling back to a bare rename");
        }

        match assemble(&guess, record) {
            Some(book) => Resolution::Resolved(book),
            None => Resolution::Unresolvable {
                reason: format!("no title could be determined for {filename}"),
            },
        }
    }
}

/// Applies the separator split when there is no title yet, or when the current
/// title is just the unsplit stem holding both halves.
fn fill_from_separator_split(guess: &mut RawFilenameTokens, filename: &str) {
    let (author, title) = split_title_author(filename);
    debug!(?author, ?title, "separator split");

    let unsplit_stem = matches!(
        (&guess.title, &author, &title),
        (Some(current), Some(a), Some(t)) if current.contains(a.as_str()) && current.contains(t.as_str())
    );
    if guess.title.is_none() || unsplit_stem {
        if guess.author.is_none() {
            guess.author = author;
        }
        if title.is_some() {
            guess.title = title;
        }
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, ServerGuard};
    use shelfwise_core::config::CatalogConfig;
    use shelfwise_core::models::EmbeddedMetadata;

    use super::*;
    use crate::error::Result;
    use crate::http::test_settings;
    use crate::prompt::ScriptedPrompter;
    use crate::resolve::{HeuristicPolicy, Resolver};

    struct FixedMetadata(EmbeddedMetadata);

    impl EmbeddedMetadataReader for FixedMetadata {
        fn read_pdf(&self, _path: &Path) -> Result<EmbeddedMetadata> {
            Ok(self.0.clone())
        }

        fn read_epub(&self, _path: &Path) -> Result<EmbeddedMetadata> {
            Ok(self.0.clone())
        }

        fn read_mobi(&self, _path: &Path) -> Result<EmbeddedMetadata> {
            Ok(self.0.clone())
        }
    }

    async fn server_with_listing() -> ServerGuard {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(include_str!("catalog/fixtures/search_santi.html"))
            .create_async()
            .await;
        server
    }

    fn pipeline(server: &ServerGuard, embedded: EmbeddedMetadata) -> ResolutionPipeline {
        let settings = CatalogConfig {
            search_url: format!("{}/search", server.url()),
            detail_base_url: server.url(),
            fetch_detail: false,
            ..CatalogConfig::default()
        };
        let resolver = Resolver::Heuristic(HeuristicPolicy {
            min_rating: 7.0,
            min_rating_people: 100,
        });
        let catalog = CatalogClient::new(&test_settings(), &settings, resolver).unwrap();
        ResolutionPipeline::new(catalog, Arc::new(FixedMetadata(embedded)))
    }

    fn resolved(resolution: Resolution) -> ResolvedBook {
        match resolution {
            Resolution::Resolved(book) => book,
            other => panic!("expected a resolved book, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn filename_guess_drives_search() {
        let server = server_with_listing().await;
        let pipeline = pipeline(&server, EmbeddedMetadata::default());

        let book = resolved(pipeline.resolve(Path::new("/books/三体 (刘慈欣) (2008) (Z-Library).epub")).await);

        assert_eq!(book.title, "三体");
        assert_eq!(book.author.as_deref(), Some("刘慈欣"));
        assert_eq!(book.year.as_deref(), Some("2008"));
        assert_eq!(book.extension, "epub");
        assert_eq!(book.record.unwrap().catalog_id, "2567698");
    }

    #[tokio::test]
    async fn embedded_metadata_fills_gaps() {
        let server = server_with_listing().await;
        let pipeline = pipeline(
            &server,
            EmbeddedMetadata {
                author: Some("刘慈欣".to_string()),
                title: Some("三体".to_string()),
            },
        );

        let book = resolved(pipeline.resolve(Path::new("/books/【扫描版】.pdf")).await);

        assert_eq!(book.title, "三体");
        assert!(book.is_matched());
    }

    #[tokio::test]
    async fn unmatched_title_becomes_bare_rename() {
        let server = server_with_listing().await;
        let pipeline = pipeline(&server, EmbeddedMetadata::default());

        let book = resolved(pipeline.resolve(Path::new("/books/马尔克斯_百年孤独.mobi")).await);

        assert_eq!(book.title, "百年孤独");
        assert_eq!(book.author.as_deref(), Some("马尔克斯"));
        assert!(!book.is_matched());
    }

    #[tokio::test]
    async fn no_title_anywhere_is_unresolvable() {
        let server = server_with_listing().await;
        let pipeline = pipeline(&server, EmbeddedMetadata::default());

        let resolution = pipeline.resolve(Path::new("/books/【扫描版】.pdf")).await;
        assert!(matches!(resolution, Resolution::Unresolvable { .. }));
    }

    #[tokio::test]
    async fn operator_supplies_missing_title() {
        let server = server_with_listing().await;
        let prompter = Arc::new(ScriptedPrompter::new(["三體"]));
        let pipeline = pipeline(&server, EmbeddedMetadata::default()).with_prompter(prompter.clone());

        let book = resolved(pipeline.resolve(Path::new("/books/【扫描版】.pdf")).await);

        assert_eq!(book.title, "三体");
        assert!(prompter.output().contains("【扫描版】.pdf"));
    }

    #[tokio::test]
    async fn empty_operator_answer_skips_file() {
        let server = server_with_listing().await;
        let pipeline = pipeline(&server, EmbeddedMetadata::default())
            .with_prompter(Arc::new(ScriptedPrompter::new([""])));

        let resolution = pipeline.resolve(Path::new("/books/【扫描版】.pdf")).await;
        assert!(matches!(resolution, Resolution::Unresolvable { .. }));
    }
}
