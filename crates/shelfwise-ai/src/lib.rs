//! Shelfwise AI: the reasoning-service client and the two decisions delegated to it,
//! picking one of several equally good catalog candidates and approving a rename.

pub mod client;
pub mod error;
pub mod prompts;

pub use client::{ChatClient, CompletionClient};
pub use error::{AiError, Result};
