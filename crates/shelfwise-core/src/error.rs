use thiserror::Error;

/// All errors that can occur in shelfwise-core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Directory does not exist: {0}")]
    DirectoryNotFound(String),

    #[error("Destination already exists: {0}")]
    DestinationExists(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Sidecar error: {0}")]
    Sidecar(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Exit codes used by the CLI.
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidArgs = 3,
    FileSystemError = 4,
}

pub type Result<T> = std::result::Result<T, CoreError>;
