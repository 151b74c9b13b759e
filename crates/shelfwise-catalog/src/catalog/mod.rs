//! Online book catalog: keyword search, candidate selection, detail enrichment.

pub mod detail;
pub mod search;

use scraper::{ElementRef, Selector};
use shelfwise_core::config::{CatalogConfig, NetworkConfig};
use shelfwise_core::models::{BookRecord, DetailFields};
use tracing::{debug, info, warn};

use crate::error::{CatalogError, Result};
use crate::http::HttpFetcher;
use crate::resolve::Resolver;

pub use detail::parse_detail_html;
pub use search::{match_author, parse_search_html, rank_candidates, tie_set};

// ─── CatalogClient ────────────────────────────────────────────────────────────

pub struct CatalogClient {
    fetcher: HttpFetcher,
    settings: CatalogConfig,
    resolver: Resolver,
}

impl CatalogClient {
    pub fn new(network: &NetworkConfig, settings: &CatalogConfig, resolver: Resolver) -> Result<Self> {
        let referer = format!("{}/", settings.detail_base_url.trim_end_matches('/'));
        Ok(Self {
            fetcher: HttpFetcher::new(network)?.with_referer(referer),
            settings: settings.clone(),
            resolver,
        })
    }

    pub fn fetcher(&self) -> &HttpFetcher {
        &self.fetcher
    }

    pub fn settings(&self) -> &CatalogConfig {
        &self.settings
    }

    /// Searches the catalog for `query` and returns the best matching record.
    ///
    /// Candidates under `min_similarity` are dropped. When several tie at the top,
    /// an author match against `expected_author` wins; otherwise the configured
    /// resolver decides. Any network or parse failure yields `None`.
    pub async fn search(
        &self,
        query: &str,
        expected_author: Option<&str>,
        fetch_detail: bool,
        min_similarity: f64,
    ) -> Option<BookRecord> {
        info!(query, ?expected_author, "searching catalog");

        let params = [("cat", self.settings.search_category.as_str()), ("q", query)];
        let html = match self.fetcher.get_text(&self.settings.search_url, &params).await {
            Ok(html) => html,
            Err(e) => {
                warn!(query, error = %e, "catalog search failed");
                return None;
            }
        };

        let candidates = match parse_search_html(&html, &self.settings.detail_base_url) {
            Ok(c) => c,
            Err(e) => {
                warn!(query, error = %e, "could not parse search listing");
                return None;
            }
        };
        debug!(query, count = candidates.len(), "candidates parsed");

        let ranked = rank_candidates(query, candidates, min_similarity);
        if ranked.is_empty() {
            info!(query, min_similarity, "no candidate above similarity threshold");
            return None;
        }

        let mut tie = tie_set(&ranked, self.settings.tie_margin);
        let index = if tie.len() == 1 {
            0
        } else {
            info!(query, tied = tie.len(), "several candidates share the top score");
            let by_author = expected_author
                .and_then(|author| match_author(&mut tie, author, self.settings.author_match_threshold));
            match by_author {
                Some(i) => {
                    info!(author = %tie[i].author, "picked candidate by author");
                    i
                }
                None => self.resolver.choose(&tie).await,
            }
        };

        let chosen = tie.swap_remove(index.min(tie.len() - 1));
        info!(title = %chosen.title, id = %chosen.catalog_id, similarity = chosen.title_similarity, "selected candidate");

        let detail = if fetch_detail {
            self.fetch_details(&chosen.detail_url).await
        } else {
            None
        };
        Some(BookRecord::from_match(chosen, detail))
    }

    /// Fetches and parses a detail page, or `None` on any failure.
    pub async fn fetch_details(&self, url: &str) -> Option<DetailFields> {
        let html = match self.fetcher.get_text(url, &[]).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url, error = %e, "detail page unavailable");
                return None;
            }
        };
        match parse_detail_html(&html) {
            Ok(detail) => Some(detail),
            Err(e) => {
                warn!(url, error = %e, "could not parse detail page");
                None
            }
        }
    }
}

// ─── HTML helpers ─────────────────────────────────────────────────────────────

pub(crate) fn parse_selector(input: &str) -> Result<Selector> {
    Selector::parse(input).map_err(|e| CatalogError::Parse(format!("invalid selector {input}: {e}")))
}

/// Text content with runs of whitespace collapsed to one space.
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
