//! Per-identity, per-day JSON snapshots of finalized results.
//!
//! Keys are `(identity, date)` and map to `{identity}_{YYYY-MM-DD}.json`
//! files under the cache directory. Values are generic over serde so the
//! cache stays domain-free; the snapshot format is plain JSON, readable by
//! anything.

use std::path::PathBuf;

use chrono::{Local, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Error type for cache writes. Reads never fail: a missing or corrupt
/// snapshot is treated as a cache miss.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct Snapshot<T> {
    date: String,
    saved_at: String,
    payload: T,
}

/// Same-day snapshot cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct DayCache {
    dir: PathBuf,
}

impl DayCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Today's cache key in the local timezone, `YYYY-MM-DD`.
    pub fn today() -> String {
        Local::now().format("%Y-%m-%d").to_string()
    }

    fn path_for(&self, identity: &str, date: &str) -> PathBuf {
        self.dir.join(format!("{identity}_{date}.json"))
    }

    /// Load the snapshot for `(identity, date)`, if one exists and matches
    /// the requested date. Corrupt snapshots are logged and treated as
    /// absent.
    pub fn load<T: DeserializeOwned>(&self, identity: &str, date: &str) -> Option<T> {
        let path = self.path_for(identity, date);
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<Snapshot<T>>(&raw) {
            Ok(snapshot) if snapshot.date == date => Some(snapshot.payload),
            Ok(_) => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read cache snapshot");
                None
            }
        }
    }

    /// Write the snapshot for `(identity, date)`, replacing any previous one.
    pub fn save<T: Serialize>(&self, identity: &str, date: &str, payload: &T) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir)?;
        let snapshot = Snapshot {
            date: date.to_string(),
            saved_at: Utc::now().to_rfc3339(),
            payload,
        };
        let raw = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(self.path_for(identity, date), raw)?;
        Ok(())
    }
}
