//! Orchestration across specialist agents.
//!
//! All specialists run concurrently and independently; their only shared
//! resource is the content store. Failures are collected, never propagated:
//! a crashed agent contributes an empty category (counted as 0, not absent)
//! and the run still returns every other agent's results.

use std::collections::HashMap;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::agent::SpecialistAgent;
use crate::provider::SearchResult;

/// Merged output of one orchestrated run.
#[derive(Debug, Serialize)]
pub struct BriefingReport {
    pub by_category: HashMap<String, Vec<SearchResult>>,
    pub total: usize,
    pub by_category_count: HashMap<String, usize>,
}

impl BriefingReport {
    /// All categories' articles as one flat list.
    pub fn flatten(&self) -> Vec<SearchResult> {
        let mut all: Vec<SearchResult> = Vec::with_capacity(self.total);
        let mut categories: Vec<&String> = self.by_category.keys().collect();
        categories.sort();
        for category in categories {
            all.extend(self.by_category[category].iter().cloned());
        }
        all
    }
}

/// Run every specialist concurrently and merge their finalized lists.
pub async fn run_all(
    agents: Vec<SpecialistAgent>,
    max_iterations: u32,
    use_cache: bool,
) -> BriefingReport {
    let categories: Vec<String> = agents.iter().map(|a| a.category().to_string()).collect();
    info!(
        agents = agents.len(),
        max_iterations,
        use_cache,
        "launching specialist agents"
    );

    let mut set = JoinSet::new();
    for agent in agents {
        set.spawn(async move {
            let category = agent.category().to_string();
            let result = agent.run(max_iterations, use_cache).await;
            (category, result)
        });
    }

    let mut by_category: HashMap<String, Vec<SearchResult>> = HashMap::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((category, Ok(articles))) => {
                info!(category = %category, count = articles.len(), "agent finished");
                by_category.insert(category, articles);
            }
            Ok((category, Err(e))) => {
                error!(category = %category, error = %e, "agent failed — substituting empty result");
                by_category.insert(category, Vec::new());
            }
            Err(join_error) => {
                // Category is recovered below from the launch list.
                error!(error = %join_error, "agent task panicked — substituting empty result");
            }
        }
    }

    // Every launched category appears in the report, even after a panic.
    for category in &categories {
        by_category.entry(category.clone()).or_default();
    }

    let by_category_count: HashMap<String, usize> = by_category
        .iter()
        .map(|(category, articles)| (category.clone(), articles.len()))
        .collect();
    let total = by_category_count.values().sum();

    info!(total, "orchestrator complete");
    for (category, count) in &by_category_count {
        info!(category = %category, count, "category result");
    }

    BriefingReport {
        by_category,
        total,
        by_category_count,
    }
}
