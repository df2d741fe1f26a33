//! Shared curation infrastructure for the briefing agents.
//!
//! Three concerns live here because every ingestion path (search agents,
//! newsletters, news feeds) shares them:
//!
//! 1. The [`ContentStore`]: a URL-keyed registry of everything the briefing
//!    has already surfaced, used for cross-run deduplication and written with
//!    insert-if-absent semantics at finalization.
//! 2. The [`DayCache`]: per-identity, per-day JSON snapshots of finalized
//!    results, so a same-day rerun skips the expensive search loop.
//! 3. [`json_extract`]: the one parsing utility for JSON embedded in
//!    free-form LLM output (code fences, surrounding prose).

pub mod day_cache;
pub mod json_extract;
pub mod store;

pub use day_cache::{CacheError, DayCache};
pub use store::{
    ContentStore, JsonContentStore, MemoryContentStore, RecentEntry, SharedContentStore,
    StoreError, StoreResult, StoredArticle,
};
