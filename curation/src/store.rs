//! URL-keyed content store shared by every ingestion path.
//!
//! The store is the only resource shared between concurrently running
//! specialist agents. All writes go through [`ContentStore::save_articles`],
//! which has insert-if-absent semantics: two agents discovering the same URL
//! in the same run cannot double-insert, and the first writer wins.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Error type for content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("lock poisoned")]
    LockPoisoned,
}

/// Result type for content store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to a content store.
pub type SharedContentStore = Arc<dyn ContentStore>;

/// Metadata returned for a URL already present in the store.
///
/// Carried so dedup callers can log *where* a duplicate was first seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentEntry {
    pub source_type: String,
    pub source_name: String,
    /// First-seen date, `YYYY-MM-DD`.
    pub created_at: String,
    pub title: String,
}

/// A finalized article as persisted by a specialist agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredArticle {
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
    pub domain: String,
    pub score: f32,
}

/// Registry of previously surfaced content, keyed by URL.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// All URLs first seen within the past `days`, across every source type
    /// (agent runs, newsletters, news searches).
    async fn recent_urls(&self, days: u32) -> StoreResult<HashMap<String, RecentEntry>>;

    /// Persist finalized articles under `agent_search/{category}|{run_label}`.
    ///
    /// Insert-if-absent: URLs already present are skipped. Returns the number
    /// actually inserted.
    async fn save_articles(
        &self,
        articles: &[StoredArticle],
        category: &str,
        run_label: &str,
    ) -> StoreResult<usize>;
}

/// One row of the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContentRecord {
    url: String,
    source_type: String,
    source_name: String,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    score: Option<f32>,
    created_at: DateTime<Utc>,
}

fn window_filter(
    records: &HashMap<String, ContentRecord>,
    days: u32,
) -> HashMap<String, RecentEntry> {
    let cutoff = Utc::now() - Duration::days(i64::from(days));
    records
        .values()
        .filter(|record| record.created_at >= cutoff)
        .map(|record| {
            (
                record.url.clone(),
                RecentEntry {
                    source_type: record.source_type.clone(),
                    source_name: record.source_name.clone(),
                    created_at: record.created_at.format("%Y-%m-%d").to_string(),
                    title: record.title.clone(),
                },
            )
        })
        .collect()
}

fn insert_articles(
    records: &mut HashMap<String, ContentRecord>,
    articles: &[StoredArticle],
    category: &str,
    run_label: &str,
) -> usize {
    let mut inserted = 0;
    for article in articles {
        if records.contains_key(&article.url) {
            tracing::debug!(url = %article.url, "article already in store, skipping");
            continue;
        }
        records.insert(
            article.url.clone(),
            ContentRecord {
                url: article.url.clone(),
                source_type: "agent_search".to_string(),
                source_name: format!("{category}|{run_label}"),
                title: article.title.clone(),
                summary: article.summary.clone(),
                score: Some(article.score),
                created_at: Utc::now(),
            },
        );
        inserted += 1;
    }
    inserted
}

/// In-memory store used by tests and as a null backend.
#[derive(Default)]
pub struct MemoryContentStore {
    records: Mutex<HashMap<String, ContentRecord>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a URL as seen by some other ingestion path at a given age.
    pub fn seed(&self, url: &str, source_type: &str, source_name: &str, title: &str, age_days: u32) {
        let mut records = self.records.lock().expect("store lock");
        records.insert(
            url.to_string(),
            ContentRecord {
                url: url.to_string(),
                source_type: source_type.to_string(),
                source_name: source_name.to_string(),
                title: title.to_string(),
                summary: None,
                score: None,
                created_at: Utc::now() - Duration::days(i64::from(age_days)),
            },
        );
    }

    /// Whether the store contains `url`.
    pub fn contains(&self, url: &str) -> bool {
        self.records.lock().expect("store lock").contains_key(url)
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn recent_urls(&self, days: u32) -> StoreResult<HashMap<String, RecentEntry>> {
        let records = self.records.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(window_filter(&records, days))
    }

    async fn save_articles(
        &self,
        articles: &[StoredArticle],
        category: &str,
        run_label: &str,
    ) -> StoreResult<usize> {
        let mut records = self.records.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(insert_articles(&mut records, articles, category, run_label))
    }
}

/// Store persisted as a single JSON file under the data directory.
///
/// Loads the whole file at open and rewrites it after each save; the record
/// set is a few hundred rows at most, so a full rewrite is cheaper than
/// carrying a database dependency for it.
pub struct JsonContentStore {
    path: PathBuf,
    records: Mutex<HashMap<String, ContentRecord>>,
}

impl JsonContentStore {
    /// Open or create the store file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let records = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let rows: Vec<ContentRecord> =
                serde_json::from_str(&raw).map_err(|e| StoreError::Serialization(e.to_string()))?;
            rows.into_iter().map(|r| (r.url.clone(), r)).collect()
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    fn flush(&self, records: &HashMap<String, ContentRecord>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut rows: Vec<&ContentRecord> = records.values().collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let raw = serde_json::to_string_pretty(&rows)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for JsonContentStore {
    async fn recent_urls(&self, days: u32) -> StoreResult<HashMap<String, RecentEntry>> {
        let records = self.records.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(window_filter(&records, days))
    }

    async fn save_articles(
        &self,
        articles: &[StoredArticle],
        category: &str,
        run_label: &str,
    ) -> StoreResult<usize> {
        let mut records = self.records.lock().map_err(|_| StoreError::LockPoisoned)?;
        let inserted = insert_articles(&mut records, articles, category, run_label);
        if inserted > 0 {
            self.flush(&records)?;
        }
        Ok(inserted)
    }
}
