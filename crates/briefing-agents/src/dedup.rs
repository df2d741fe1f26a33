//! Cross-run deduplication against the content store.
//!
//! A candidate is dropped when its URL was surfaced by *any* ingestion path
//! within the lookback window, not just this agent's own history. A store
//! lookup failure fails open: missing a duplicate is preferable to losing
//! every candidate for the run.

use curation::SharedContentStore;
use tracing::warn;

use crate::provider::SearchResult;

const LOG_TITLE_MAX_CHARS: usize = 60;

pub struct DedupFilter {
    store: SharedContentStore,
    lookback_days: u32,
}

impl DedupFilter {
    pub fn new(store: SharedContentStore, lookback_days: u32) -> Self {
        Self {
            store,
            lookback_days,
        }
    }

    /// Drop candidates whose URL is already in the store.
    pub async fn filter(&self, candidates: Vec<SearchResult>) -> Vec<SearchResult> {
        if candidates.is_empty() {
            return candidates;
        }

        let seen = match self.store.recent_urls(self.lookback_days).await {
            Ok(seen) => seen,
            Err(e) => {
                warn!(
                    error = %e,
                    lookback_days = self.lookback_days,
                    "content store lookup failed — continuing without deduplication"
                );
                return candidates;
            }
        };

        let mut kept = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match seen.get(&candidate.url) {
                Some(entry) => {
                    let title: String = candidate.title.chars().take(LOG_TITLE_MAX_CHARS).collect();
                    warn!(
                        title = %title,
                        url = %candidate.url,
                        original_source = %entry.source_type,
                        original_name = %entry.source_name,
                        original_date = %entry.created_at,
                        "dropping duplicate seen within lookback window"
                    );
                }
                None => kept.push(candidate),
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use curation::{ContentStore, MemoryContentStore, RecentEntry, StoreError, StoredArticle};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn candidate(url: &str) -> SearchResult {
        SearchResult {
            title: format!("title for {url}"),
            url: url.to_string(),
            snippet: None,
            source: None,
            published_date: None,
            provider: "exa".to_string(),
            mode: None,
            full_text: None,
            summary: None,
            highlights: None,
            score: None,
        }
    }

    /// Store whose reads always fail, for the fail-open path.
    struct FailingStore;

    #[async_trait]
    impl ContentStore for FailingStore {
        async fn recent_urls(&self, _days: u32) -> Result<HashMap<String, RecentEntry>, StoreError> {
            Err(StoreError::LockPoisoned)
        }

        async fn save_articles(
            &self,
            _articles: &[StoredArticle],
            _category: &str,
            _run_label: &str,
        ) -> Result<usize, StoreError> {
            Err(StoreError::LockPoisoned)
        }
    }

    #[tokio::test]
    async fn test_drops_known_urls_from_any_source() {
        let store = Arc::new(MemoryContentStore::new());
        store.seed("https://dup.example.com", "newsletter", "weekly", "Dup", 2);

        let filter = DedupFilter::new(store, 5);
        let kept = filter
            .filter(vec![candidate("https://dup.example.com"), candidate("https://new.example.com")])
            .await;

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].url, "https://new.example.com");
    }

    #[tokio::test]
    async fn test_keeps_urls_outside_window() {
        let store = Arc::new(MemoryContentStore::new());
        store.seed("https://old.example.com", "agent_search", "general_ai|manual", "Old", 9);

        let filter = DedupFilter::new(store, 5);
        let kept = filter.filter(vec![candidate("https://old.example.com")]).await;
        assert_eq!(kept.len(), 1);
    }

    #[tokio::test]
    async fn test_fails_open_on_store_error() {
        let filter = DedupFilter::new(Arc::new(FailingStore), 5);
        let kept = filter
            .filter(vec![candidate("https://a.example.com"), candidate("https://b.example.com")])
            .await;
        assert_eq!(kept.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_input_short_circuits() {
        let filter = DedupFilter::new(Arc::new(FailingStore), 5);
        assert!(filter.filter(Vec::new()).await.is_empty());
    }
}
