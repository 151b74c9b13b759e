//! Shelfwise Catalog: catalog search, detail enrichment, tie-breaking and per-file resolution.

pub mod error;
pub mod http;
pub mod catalog;
pub mod resolve;
pub mod prompt;
pub mod embedded;
pub mod cover;
pub mod pipeline;

pub use error::{CatalogError, Result};
pub use http::HttpFetcher;
pub use catalog::CatalogClient;
pub use resolve::{HeuristicPolicy, Resolver};
pub use prompt::{Prompter, StdinPrompter};
pub use embedded::{EmbeddedMetadataReader, FileMetadataReader, read_embedded};
pub use cover::download_cover;
pub use pipeline::{Resolution, ResolutionPipeline};
