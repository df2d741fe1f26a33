//! Search provider abstraction.
//!
//! Adapters return a typed `Err` on backend failure so tests and alerting can
//! tell "provider failed" from "provider found nothing"; the specialist agent
//! collapses both to an empty round at its boundary.

pub mod exa;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use exa::ExaSearchClient;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed payload: {0}")]
    Decode(String),
}

/// Search strategy requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Auto,
    Keyword,
    Neural,
    /// Slower, higher-quality semantic search with inline content.
    Deep,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Keyword => "keyword",
            Self::Neural => "neural",
            Self::Deep => "deep",
        }
    }
}

/// Live-crawl policy for fetched page content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Livecrawl {
    Preferred,
    Always,
    Never,
}

impl Livecrawl {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preferred => "preferred",
            Self::Always => "always",
            Self::Never => "never",
        }
    }
}

/// One search call.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub mode: SearchMode,
    pub livecrawl: Livecrawl,
    /// Instruction for the backend's inline summary (rich mode); `None`
    /// requests plain title/snippet/URL results.
    pub summary_instruction: Option<String>,
    /// Cap on inline page text, in characters.
    pub max_characters: usize,
    pub start_published: Option<NaiveDate>,
    pub end_published: Option<NaiveDate>,
    pub exclude_domains: Vec<String>,
    pub user_location: Option<String>,
}

/// One discovered candidate document.
///
/// `url` is the identity and deduplication key across the whole system: two
/// results with the same URL are the same document no matter which agent or
/// provider found them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// ISO date when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<String>>,
    /// Judge score, attached at finalization only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Uniform interface over search-and-fetch backends.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, ProviderError>;
}
