//! Exa search adapter.
//!
//! Uses the combined search-with-contents endpoint so results arrive with
//! inline text and an AI summary in one call, avoiding a second
//! fetch-and-summarize pass per article.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderEndpoint;

use super::{ProviderError, SearchProvider, SearchRequest, SearchResult};

const SNIPPET_MAX_CHARS: usize = 500;

pub struct ExaSearchClient {
    http: reqwest::Client,
    endpoint: ProviderEndpoint,
}

impl ExaSearchClient {
    pub fn new(endpoint: ProviderEndpoint, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    fn build_body<'a>(request: &'a SearchRequest) -> RequestBody<'a> {
        RequestBody {
            query: &request.query,
            num_results: request.limit,
            search_type: request.mode.as_str(),
            livecrawl: request.livecrawl.as_str(),
            contents: ContentsSpec {
                text: TextSpec {
                    max_characters: request.max_characters,
                },
                summary: request
                    .summary_instruction
                    .as_deref()
                    .map(|query| SummarySpec { query }),
            },
            start_published_date: request.start_published.map(|d| d.format("%Y-%m-%d").to_string()),
            end_published_date: request.end_published.map(|d| d.format("%Y-%m-%d").to_string()),
            exclude_domains: if request.exclude_domains.is_empty() {
                None
            } else {
                Some(&request.exclude_domains)
            },
            user_location: request.user_location.as_deref(),
        }
    }

    fn parse_body(raw: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let body: ResponseBody =
            serde_json::from_str(raw).map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(body.results.into_iter().map(ResultItem::into_search_result).collect())
    }
}

#[async_trait]
impl SearchProvider for ExaSearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, ProviderError> {
        debug!(
            limit = request.limit,
            mode = request.mode.as_str(),
            "executing provider search"
        );

        let url = format!("{}/search", self.endpoint.url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .header("x-api-key", self.endpoint.api_key.as_str())
            .json(&Self::build_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }

        let raw = response.text().await?;
        let results = Self::parse_body(&raw)?;
        debug!(count = results.len(), "provider returned results");
        Ok(results)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody<'a> {
    query: &'a str,
    num_results: usize,
    #[serde(rename = "type")]
    search_type: &'static str,
    livecrawl: &'static str,
    contents: ContentsSpec<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclude_domains: Option<&'a Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_location: Option<&'a str>,
}

#[derive(Serialize)]
struct ContentsSpec<'a> {
    text: TextSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<SummarySpec<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextSpec {
    max_characters: usize,
}

#[derive(Serialize)]
struct SummarySpec<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct ResponseBody {
    #[serde(default)]
    results: Vec<ResultItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultItem {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    highlights: Option<Vec<String>>,
}

impl ResultItem {
    fn into_search_result(self) -> SearchResult {
        let snippet = self
            .text
            .as_deref()
            .map(|text| truncate_chars(text, SNIPPET_MAX_CHARS));
        SearchResult {
            title: self.title.unwrap_or_else(|| "Untitled".to_string()),
            url: self.url,
            snippet,
            source: self.author,
            published_date: self.published_date,
            provider: "exa".to_string(),
            mode: Some("search_with_contents".to_string()),
            full_text: self.text,
            summary: self.summary,
            highlights: self.highlights,
            score: None,
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
