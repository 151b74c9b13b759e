pub mod assemble;
pub mod config;
pub mod error;
pub mod file_import;
pub mod filename;
pub mod models;
pub mod organize;
pub mod storage;
pub mod text;

pub use assemble::{ResolvedBook, assemble};
pub use config::{AppConfig, DisambiguationStrategy, RenameConfirmation};
pub use error::{CoreError, ExitCode, Result};
pub use filename::parse_filename;
pub use models::*;
pub use organize::{OrganizePlan, sanitize_filename};
pub use text::{normalize_script, similarity};
