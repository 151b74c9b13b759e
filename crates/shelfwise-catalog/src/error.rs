use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid proxy {0}: {1}")]
    Proxy(String, String),

    #[error("giving up on {0} after {1} attempts")]
    RetriesExhausted(String, u32),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("missing element {0}")]
    MissingElement(String),

    #[error("metadata read error: {0}")]
    Metadata(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
