use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("no API key configured (set ai.api_key or ${0})")]
    MissingApiKey(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: HTTP {0}: {1}")]
    Api(u16, String),

    #[error("malformed reply: {0}")]
    MalformedReply(String),
}

pub type Result<T> = std::result::Result<T, AiError>;
