use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Root application configuration, loaded from `~/.config/shelfwise/config.toml`.
///
/// Built once at startup and handed to every component by reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub library: LibraryConfig,
    pub network: NetworkConfig,
    pub catalog: CatalogConfig,
    pub ai: AiConfig,
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub books_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// Folder name template; `{author}`, `{title}` and `{year}` are substituted.
    pub folder_pattern: String,
    /// Used when the book has no year.
    pub folder_pattern_no_year: String,
    pub supported_formats: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Bounds (seconds) of the randomized wait after a rate-limited response.
    pub retry_delay_secs: [f64; 2],
    /// Bounds (seconds) of the randomized wait before a request.
    pub request_delay_secs: [f64; 2],
    /// Chance that a first attempt is delayed at all. Retries are always delayed.
    pub request_delay_probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    pub user_agents: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub search_url: String,
    pub detail_base_url: String,
    pub search_category: String,
    pub min_similarity: f64,
    /// Candidates within this distance of the best title score form the tie set.
    pub tie_margin: f64,
    /// Author similarity a tie-set member must exceed to win on author alone.
    pub author_match_threshold: f64,
    pub fetch_detail: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_url: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub strategy: DisambiguationStrategy,
    pub min_rating: f64,
    pub min_rating_people: u64,
    pub confirm_renames: RenameConfirmation,
    pub sidecar_language: String,
}

/// How a tie between equally good catalog candidates is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisambiguationStrategy {
    /// Ask the operator on the terminal.
    #[default]
    Interactive,
    /// Rating/rating-count thresholds, no I/O.
    Heuristic,
    /// Ask the reasoning service, falling back to the heuristic.
    Arbiter,
}

/// Who approves a rename plan before files move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenameConfirmation {
    #[default]
    Ask,
    Auto,
    Arbiter,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for LibraryConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        Self {
            books_dir: home.join("Books").to_string_lossy().to_string(),
            output_dir: None,
            folder_pattern: "{author} - {title} ({year})".to_string(),
            folder_pattern_no_year: "{author} - {title}".to_string(),
            supported_formats: ["pdf", "epub", "mobi", "txt", "azw3", "azw"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 3,
            retry_delay_secs: [2.0, 5.0],
            request_delay_secs: [1.0, 3.0],
            request_delay_probability: 0.8,
            proxy: None,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.2 Safari/605.1.15".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:90.0) Gecko/20100101 Firefox/90.0".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.114 Safari/537.36".to_string(),
            ],
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            search_url: "https://www.douban.com/search".to_string(),
            detail_base_url: "https://book.douban.com".to_string(),
            search_category: "1001".to_string(),
            min_similarity: 0.6,
            tie_margin: 0.01,
            author_match_threshold: 0.7,
            fetch_detail: true,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.deepseek.com/v1/chat/completions".to_string(),
            model: "deepseek-chat".to_string(),
            api_key: None,
            api_key_env: "SHELFWISE_AI_API_KEY".to_string(),
            timeout_secs: 30,
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            strategy: DisambiguationStrategy::default(),
            min_rating: 7.0,
            min_rating_people: 100,
            confirm_renames: RenameConfirmation::default(),
            sidecar_language: "中文".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/shelfwise/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SHELFWISE_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("shelfwise")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        for (name, value) in [
            ("catalog.min_similarity", self.catalog.min_similarity),
            ("catalog.tie_margin", self.catalog.tie_margin),
            ("catalog.author_match_threshold", self.catalog.author_match_threshold),
            (
                "network.request_delay_probability",
                self.network.request_delay_probability,
            ),
        ] {
            if !unit.contains(&value) {
                return Err(CoreError::ConfigError(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        for (name, [low, high]) in [
            ("network.retry_delay_secs", self.network.retry_delay_secs),
            ("network.request_delay_secs", self.network.request_delay_secs),
        ] {
            if low < 0.0 || high < low {
                return Err(CoreError::ConfigError(format!(
                    "{name} must be an ordered pair of non-negative seconds, got [{low}, {high}]"
                )));
            }
        }
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    pub fn books_dir(&self) -> PathBuf {
        PathBuf::from(&self.library.books_dir)
    }

    /// Where organized folders are created; the books directory unless overridden.
    pub fn output_dir(&self) -> PathBuf {
        self.library
            .output_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.books_dir())
    }

    /// Credential for the reasoning service: inline key first, then the named env var.
    pub fn ai_api_key(&self) -> Option<String> {
        self.ai
            .api_key
            .clone()
            .or_else(|| std::env::var(&self.ai.api_key_env).ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}
