//! Specialist search agent: one topic category, one bounded search loop.
//!
//! A specialist is a fixed [`AgentSpec`] driving one shared executor; there
//! is no per-category subclassing. The executor walks the phase graph in
//! [`crate::state_machine`]: plan the initial query, search, evaluate, then
//! either refine and search again or finalize. The loop is bounded by
//! `max_iterations`, so it terminates even when the target count is never
//! reached.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Local};
use curation::{DayCache, SharedContentStore, StoredArticle};
use tracing::{info, warn};

use crate::config::BriefingConfig;
use crate::dedup::DedupFilter;
use crate::judge::{ArticleEvaluation, ArticleJudge, Decision};
use crate::llm::ChatCompletion;
use crate::provider::{Livecrawl, SearchMode, SearchProvider, SearchRequest, SearchResult};
use crate::refiner::QueryRefiner;
use crate::state_machine::{AgentPhase, PhaseMachine};

const SUMMARY_INSTRUCTION: &str = "Please give a concise summary";

/// Fixed configuration for one specialist agent.
#[derive(Debug, Clone)]
pub struct AgentSpec {
    /// Category identity, used for logging, caching, and labeling.
    pub category: String,
    /// Number of high-quality articles this agent tries to accumulate.
    pub target_count: usize,
    /// Starting query for the first search round.
    pub initial_query: String,
    /// Cap on the provider's inline summary, in characters.
    pub summary_max_chars: usize,
}

/// Working memory for one agent invocation. Created fresh per run and
/// destroyed afterwards; only the finalized subset survives in the cache.
#[derive(Debug, Default)]
pub struct SearchAgentState {
    pub iteration: u32,
    pub max_iterations: u32,
    pub current_query: String,
    /// All queries executed, append-only.
    pub completed_queries: Vec<String>,
    /// Accumulated candidates, deduplicated by URL.
    pub all_raw_results: Vec<SearchResult>,
    /// Accumulated evaluations, one per judged URL, append-only.
    pub evaluated: Vec<ArticleEvaluation>,
    /// Keep-decisions; grows until finalization sorts and truncates.
    pub kept_articles: Vec<SearchResult>,
    /// Known-bad URLs, monotonically growing.
    pub discarded_urls: HashSet<String>,
}

/// Continuation decision, evaluated once per completed evaluating phase.
/// Pure function of state, no side effects.
pub fn should_continue(state: &SearchAgentState, target_count: usize) -> bool {
    state.kept_articles.len() < target_count && state.iteration < state.max_iterations
}

/// One specialist agent bound to a category spec.
pub struct SpecialistAgent {
    spec: AgentSpec,
    config: Arc<BriefingConfig>,
    provider: Arc<dyn SearchProvider>,
    judge: ArticleJudge,
    refiner: QueryRefiner,
    dedup: DedupFilter,
    store: SharedContentStore,
    cache: DayCache,
}

impl SpecialistAgent {
    pub fn new(
        spec: AgentSpec,
        config: Arc<BriefingConfig>,
        provider: Arc<dyn SearchProvider>,
        llm: Arc<dyn ChatCompletion>,
        store: SharedContentStore,
        cache: DayCache,
    ) -> Self {
        let judge = ArticleJudge::new(llm.clone(), config.thresholds, config.recency.clone());
        let refiner = QueryRefiner::new(llm);
        let dedup = DedupFilter::new(store.clone(), config.dedup_lookback_days);
        Self {
            spec,
            config,
            provider,
            judge,
            refiner,
            dedup,
            store,
            cache,
        }
    }

    pub fn category(&self) -> &str {
        &self.spec.category
    }

    /// Run the search loop and return the finalized, ranked article list.
    ///
    /// With `use_cache`, a same-day cached result short-circuits the whole
    /// loop before any network work.
    pub async fn run(&self, max_iterations: u32, use_cache: bool) -> Result<Vec<SearchResult>> {
        let today = DayCache::today();
        if use_cache {
            if let Some(cached) = self.cache.load::<Vec<SearchResult>>(&self.spec.category, &today) {
                info!(
                    category = %self.spec.category,
                    count = cached.len(),
                    "using cached results for today"
                );
                return Ok(cached);
            }
        }

        info!(
            category = %self.spec.category,
            target = self.spec.target_count,
            max_iterations,
            "starting specialist agent"
        );

        let mut machine = PhaseMachine::new();
        let mut state = SearchAgentState {
            iteration: 1,
            max_iterations: max_iterations.max(1),
            current_query: self.spec.initial_query.clone(),
            ..SearchAgentState::default()
        };
        machine.set_iteration(state.iteration);
        machine
            .advance(AgentPhase::Searching, Some("initial query planned"))
            .context("phase machine rejected planned transition")?;

        loop {
            self.search_round(&mut state).await;
            machine
                .advance(AgentPhase::Evaluating, None)
                .context("phase machine rejected planned transition")?;
            self.evaluate_round(&mut state).await;

            info!(
                category = %self.spec.category,
                iteration = state.iteration,
                kept = state.kept_articles.len(),
                target = self.spec.target_count,
                "continuation decision"
            );

            if should_continue(&state, self.spec.target_count) {
                machine
                    .advance(AgentPhase::Refining, Some("target not met"))
                    .context("phase machine rejected planned transition")?;
                self.refine_round(&mut state).await;
                machine.set_iteration(state.iteration);
                machine
                    .advance(AgentPhase::Searching, None)
                    .context("phase machine rejected planned transition")?;
            } else {
                let reason = if state.kept_articles.len() >= self.spec.target_count {
                    "target reached"
                } else {
                    "iteration budget exhausted"
                };
                machine
                    .advance(AgentPhase::Finalizing, Some(reason))
                    .context("phase machine rejected planned transition")?;
                break;
            }
        }

        let finalized = self.finalize(&state).await;
        machine
            .advance(AgentPhase::Done, None)
            .context("phase machine rejected planned transition")?;

        if use_cache {
            if let Err(e) = self.cache.save(&self.spec.category, &today, &finalized) {
                warn!(category = %self.spec.category, error = %e, "failed to cache finalized results");
            }
        }

        info!(
            category = %self.spec.category,
            count = finalized.len(),
            searches = state.completed_queries.len(),
            phases = %machine.summary(),
            "specialist agent complete"
        );
        Ok(finalized)
    }

    /// One searching phase: call the provider, then deduplicate against this
    /// run's own history and the content store. A provider failure yields
    /// zero new candidates and the loop carries on.
    async fn search_round(&self, state: &mut SearchAgentState) {
        let limit = self.config.search_limit(state.iteration);
        let query = state.current_query.clone();
        info!(
            category = %self.spec.category,
            iteration = state.iteration,
            limit,
            "executing search"
        );

        let end = Local::now().date_naive();
        let start = end - Duration::days(i64::from(self.config.search_days_lookback));
        let request = SearchRequest {
            query: query.clone(),
            limit,
            mode: SearchMode::Deep,
            livecrawl: Livecrawl::Always,
            summary_instruction: Some(SUMMARY_INSTRUCTION.to_string()),
            max_characters: self.spec.summary_max_chars,
            start_published: Some(start),
            end_published: Some(end),
            exclude_domains: self.config.excluded_domains.clone(),
            user_location: self.config.user_location.clone(),
        };

        let results = match self.provider.search(&request).await {
            Ok(results) => results,
            Err(e) => {
                warn!(
                    category = %self.spec.category,
                    error = %e,
                    "search failed — continuing with accumulated results"
                );
                Vec::new()
            }
        };

        // Within-run dedup: skip URLs already fetched or already discarded,
        // and collapse duplicates inside this batch.
        let mut known: HashSet<String> =
            state.all_raw_results.iter().map(|r| r.url.clone()).collect();
        known.extend(state.discarded_urls.iter().cloned());

        let mut fresh = Vec::new();
        for result in results {
            if known.insert(result.url.clone()) {
                fresh.push(result);
            }
        }
        info!(category = %self.spec.category, count = fresh.len(), "new unique articles found");

        let fresh = self.dedup.filter(fresh).await;
        info!(
            category = %self.spec.category,
            count = fresh.len(),
            "articles remaining after cross-run deduplication"
        );

        state.all_raw_results.extend(fresh);
        state.completed_queries.push(query);
    }

    /// One evaluating phase: judge only URLs not yet evaluated this run, then
    /// partition by decision.
    async fn evaluate_round(&self, state: &mut SearchAgentState) {
        let evaluated_urls: HashSet<&str> =
            state.evaluated.iter().map(|ev| ev.url.as_str()).collect();
        let new_candidates: Vec<SearchResult> = state
            .all_raw_results
            .iter()
            .filter(|r| !evaluated_urls.contains(r.url.as_str()))
            .cloned()
            .collect();
        drop(evaluated_urls);

        if new_candidates.is_empty() {
            info!(category = %self.spec.category, "no new articles to evaluate");
            return;
        }

        info!(
            category = %self.spec.category,
            count = new_candidates.len(),
            iteration = state.iteration,
            "evaluating new articles"
        );
        let evaluations = self
            .judge
            .evaluate(&new_candidates, state.iteration, &state.current_query)
            .await;

        let mut kept = 0usize;
        let mut discarded = 0usize;
        for (evaluation, article) in evaluations.iter().zip(&new_candidates) {
            match evaluation.decision {
                Decision::Keep => {
                    state.kept_articles.push(article.clone());
                    kept += 1;
                }
                Decision::Discard => {
                    state.discarded_urls.insert(article.url.clone());
                    discarded += 1;
                }
            }
        }
        state.evaluated.extend(evaluations);

        info!(
            category = %self.spec.category,
            kept,
            discarded,
            total_kept = state.kept_articles.len(),
            "evaluation complete"
        );
    }

    /// One refining phase: ask for a sharper query based on the discards so
    /// far, then bump the iteration counter.
    async fn refine_round(&self, state: &mut SearchAgentState) {
        let discards: Vec<ArticleEvaluation> = state
            .evaluated
            .iter()
            .filter(|ev| ev.decision == Decision::Discard)
            .cloned()
            .collect();

        state.current_query = self.refiner.refine(&state.current_query, &discards).await;
        state.iteration += 1;
    }

    /// Finalize: sort kept articles by score descending, truncate to the
    /// target count, attach scores, and persist. A store write failure is
    /// logged and swallowed; the finalized list is still returned.
    async fn finalize(&self, state: &SearchAgentState) -> Vec<SearchResult> {
        let scores: HashMap<&str, f32> = state
            .evaluated
            .iter()
            .map(|ev| (ev.url.as_str(), ev.overall_score))
            .collect();

        let mut ranked: Vec<(SearchResult, f32)> = state
            .kept_articles
            .iter()
            .map(|article| {
                let score = scores.get(article.url.as_str()).copied().unwrap_or(0.0);
                (article.clone(), score)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(self.spec.target_count);

        let finalized: Vec<SearchResult> = ranked
            .into_iter()
            .map(|(mut article, score)| {
                article.score = Some(score);
                article
            })
            .collect();

        info!(
            category = %self.spec.category,
            count = finalized.len(),
            target = self.spec.target_count,
            from_kept = state.kept_articles.len(),
            "finalized results"
        );

        if !finalized.is_empty() {
            let stored: Vec<StoredArticle> = finalized
                .iter()
                .map(|article| StoredArticle {
                    url: article.url.clone(),
                    title: article.title.clone(),
                    summary: article.summary.clone(),
                    domain: extract_domain(&article.url),
                    score: article.score.unwrap_or(0.0),
                })
                .collect();

            match self
                .store
                .save_articles(&stored, &self.spec.category, &self.config.run_label)
                .await
            {
                Ok(saved) => {
                    info!(category = %self.spec.category, saved, "persisted finalized articles")
                }
                Err(e) => warn!(
                    category = %self.spec.category,
                    error = %e,
                    "failed to persist finalized articles — returning results anyway"
                ),
            }
        }

        finalized
    }
}

/// Host portion of a URL, without scheme or `www.` prefix.
fn extract_domain(url: &str) -> String {
    let rest = url.split("://").nth(1).unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    host.trim_start_matches("www.").to_string()
}
