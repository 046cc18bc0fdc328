//! Runtime configuration: tunables loaded from an optional YAML file plus the
//! credentials read from the command line or environment.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, instrument};

/// Fatal configuration problems. The workflow cannot start when one occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required credential `{0}`; set it in the environment or pass it on the command line")]
    MissingCredential(&'static str),
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Tunables for the gateway, the news search and the content extractor.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WizardConfig {
    /// Chat-completion endpoint.
    pub chat_endpoint: String,
    /// Model used for ideas, angles, outlines, summaries and short articles.
    pub fast_model: String,
    /// Model used for articles longer than 800 words.
    pub strong_model: String,
    pub temperature: f32,
    /// News search endpoint (`/v2/everything` shape).
    pub news_endpoint: String,
    pub news_language: String,
    pub news_sort_by: String,
    /// Maximum article age for the inspiration search.
    pub max_age_hours: u32,
    /// Number of inspiration articles wanted.
    pub num_results: usize,
    /// How many candidates to request per wanted article before the keyword filter.
    pub overfetch_factor: usize,
    /// How many inspiration articles are scraped into the final-article prompt.
    pub inspiration_articles: usize,
    /// Characters of scraped text sent for summarization.
    pub content_max_chars: usize,
    pub summary_max_tokens: u32,
    pub user_agent: String,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            chat_endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            fast_model: "gpt-4o-mini".to_string(),
            strong_model: "gpt-4o".to_string(),
            temperature: 0.7,
            news_endpoint: "https://newsapi.org/v2/everything".to_string(),
            news_language: "fr".to_string(),
            news_sort_by: "relevancy".to_string(),
            max_age_hours: 72,
            num_results: 5,
            overfetch_factor: 2,
            inspiration_articles: 3,
            content_max_chars: 4000,
            summary_max_tokens: 300,
            user_agent: concat!("article_wizard/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl WizardConfig {
    /// Load the config file at `path`, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let path = PathBuf::from(path);
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }
}

/// Treat unset and blank credentials the same way.
pub fn credential(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
