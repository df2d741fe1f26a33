//! LLM article judge.
//!
//! Batches candidates into one scoring prompt and parses structured
//! per-article evaluations back out. Whatever the model returns, every input
//! candidate ends up with exactly one evaluation: parse failures and count
//! mismatches are padded with a safe "discard" default, extra entries are
//! truncated, and each evaluation's URL is overwritten with the paired
//! candidate's URL. `overall_score` and `decision` are recomputed here from
//! the sub-scores and the iteration threshold rather than trusted from the
//! model.

use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use curation::json_extract;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{RecencyPolicy, ThresholdSchedule};
use crate::llm::ChatCompletion;
use crate::provider::SearchResult;

const NEUTRAL_SCORE: f32 = 2.5;
const EVALUATION_ERROR_REASON: &str = "evaluation error";
const CONTEXT_SNIPPET_MAX_CHARS: usize = 300;

const JUDGE_SYSTEM: &str = "You are a strict article judge for a daily AI product-manager \
briefing. Score candidate articles against the rubric you are given and respond only with the \
requested JSON array.";

/// Keep-or-discard verdict for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Keep,
    Discard,
}

/// Judge output for one [`SearchResult`].
///
/// `decision == Keep` iff `overall_score >= threshold(iteration)`, and
/// `overall_score` is always the mean of the four sub-scores; both are
/// enforced by construction in this module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleEvaluation {
    pub url: String,
    pub relevance_score: f32,
    pub recency_score: f32,
    pub source_quality_score: f32,
    pub summary_clarity_score: f32,
    pub overall_score: f32,
    pub decision: Decision,
    pub reasoning: String,
}

impl ArticleEvaluation {
    /// Safe default used when the model's output is missing or unparseable.
    fn evaluation_error(url: &str) -> Self {
        Self {
            url: url.to_string(),
            relevance_score: NEUTRAL_SCORE,
            recency_score: NEUTRAL_SCORE,
            source_quality_score: NEUTRAL_SCORE,
            summary_clarity_score: NEUTRAL_SCORE,
            overall_score: NEUTRAL_SCORE,
            decision: Decision::Discard,
            reasoning: EVALUATION_ERROR_REASON.to_string(),
        }
    }
}

/// Raw evaluation as the model reports it. Only the sub-scores and reasoning
/// are used; url, overall score, and decision are replaced by the caller.
#[derive(Debug, Clone, Deserialize)]
struct RawEvaluation {
    #[serde(default)]
    relevance_score: Option<f32>,
    #[serde(default)]
    recency_score: Option<f32>,
    #[serde(default)]
    source_quality_score: Option<f32>,
    #[serde(default)]
    summary_clarity_score: Option<f32>,
    #[serde(default)]
    reasoning: Option<String>,
}

impl RawEvaluation {
    fn into_evaluation(self, url: &str, threshold: f32) -> ArticleEvaluation {
        let clamp = |score: Option<f32>| score.unwrap_or(NEUTRAL_SCORE).clamp(0.0, 5.0);
        let relevance = clamp(self.relevance_score);
        let recency = clamp(self.recency_score);
        let source_quality = clamp(self.source_quality_score);
        let summary_clarity = clamp(self.summary_clarity_score);
        let overall = (relevance + recency + source_quality + summary_clarity) / 4.0;

        ArticleEvaluation {
            url: url.to_string(),
            relevance_score: relevance,
            recency_score: recency,
            source_quality_score: source_quality,
            summary_clarity_score: summary_clarity,
            overall_score: overall,
            decision: if overall >= threshold {
                Decision::Keep
            } else {
                Decision::Discard
            },
            reasoning: self.reasoning.unwrap_or_else(|| "no reasoning given".to_string()),
        }
    }
}

pub struct ArticleJudge {
    llm: Arc<dyn ChatCompletion>,
    thresholds: ThresholdSchedule,
    recency: RecencyPolicy,
}

impl ArticleJudge {
    pub fn new(llm: Arc<dyn ChatCompletion>, thresholds: ThresholdSchedule, recency: RecencyPolicy) -> Self {
        Self {
            llm,
            thresholds,
            recency,
        }
    }

    /// Evaluate `candidates` against the rubric for `iteration`.
    ///
    /// Infallible and order-preserving: the output always has exactly one
    /// evaluation per candidate, in input order. Pure scoring: persistence
    /// happens later, at finalization.
    pub async fn evaluate(
        &self,
        candidates: &[SearchResult],
        iteration: u32,
        query_context: &str,
    ) -> Vec<ArticleEvaluation> {
        self.evaluate_at(candidates, iteration, query_context, Local::now().date_naive())
            .await
    }

    /// Like [`Self::evaluate`] with "today" injected, so the rubric (and thus
    /// the whole evaluation) is reproducible given the same date.
    pub async fn evaluate_at(
        &self,
        candidates: &[SearchResult],
        iteration: u32,
        query_context: &str,
        today: NaiveDate,
    ) -> Vec<ArticleEvaluation> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let threshold = self.thresholds.for_iteration(iteration);
        let prompt = self.build_prompt(candidates, threshold, query_context, today);

        let reply = match self.llm.complete(JUDGE_SYSTEM, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, count = candidates.len(), "judge call failed — discarding batch");
                return candidates
                    .iter()
                    .map(|c| ArticleEvaluation::evaluation_error(&c.url))
                    .collect();
            }
        };

        let parsed: Vec<RawEvaluation> = match json_extract::extract_json_array(&reply)
            .and_then(|raw| serde_json::from_str(raw).ok())
        {
            Some(parsed) => parsed,
            None => {
                warn!(count = candidates.len(), "judge reply was not a parseable JSON array — discarding batch");
                return candidates
                    .iter()
                    .map(|c| ArticleEvaluation::evaluation_error(&c.url))
                    .collect();
            }
        };

        if parsed.len() != candidates.len() {
            warn!(
                expected = candidates.len(),
                got = parsed.len(),
                "evaluation count mismatch — padding with discards"
            );
        }

        let mut parsed = parsed.into_iter();
        candidates
            .iter()
            .map(|candidate| match parsed.next() {
                Some(raw) => raw.into_evaluation(&candidate.url, threshold),
                None => ArticleEvaluation::evaluation_error(&candidate.url),
            })
            .collect()
    }

    fn build_prompt(
        &self,
        candidates: &[SearchResult],
        threshold: f32,
        query_context: &str,
        today: NaiveDate,
    ) -> String {
        let cutoff_date = today - Duration::days(i64::from(self.recency.window_days));
        let cutoff_hours = self.recency.cutoff_hours(today);
        let monday = self.recency.is_weekend_gap_day(today);

        let mut articles_text = String::new();
        for (index, article) in candidates.iter().enumerate() {
            articles_text.push_str(&format!("\n{}. **{}**\n", index + 1, article.title));
            articles_text.push_str(&format!("   URL: {}\n", article.url));
            articles_text.push_str(&format!(
                "   Source: {}\n",
                article.source.as_deref().unwrap_or("Unknown")
            ));
            articles_text.push_str(&format!(
                "   Published: {}\n",
                article.published_date.as_deref().unwrap_or("Unknown")
            ));
            let context = article.summary.as_deref().or(article.snippet.as_deref());
            if let Some(context) = context {
                let clipped: String = context.chars().take(CONTEXT_SNIPPET_MAX_CHARS).collect();
                articles_text.push_str(&format!("   Summary: {clipped}\n"));
            }
        }

        let monday_band = if monday {
            format!(
                "   - 3 = published {}-{} hours ago (acceptable today due to the weekend gap)\n",
                self.recency.partial_credit_hours, self.recency.monday_grace_hours
            )
        } else {
            String::new()
        };

        format!(
            "Evaluate these candidate articles for an AI product-manager briefing. Score each 0-5 on:\n\
\n\
**Original search query:**\n{query}\n\
\n\
**CRITICAL: Today's date is {today} ({day_context}). Only articles published {cutoff_date} or later are eligible.**\n\
\n\
1. **Relevance**: how well the article matches the search query above.\n\
   - 5 = directly addresses the query topic\n\
   - 3 = somewhat related\n\
   - 1 = off-topic or tangential\n\
\n\
2. **Recency**: how fresh the article is. **STRICT CUTOFF: anything older than {cutoff_hours} hours scores 0 automatically.**\n\
   - 5 = published within the past {full_hours} hours\n\
   - 4 = published {full_hours}-{partial_hours} hours ago\n\
{monday_band}\
   - 0 = published more than {cutoff_hours} hours ago - reject immediately\n\
   If the article body mentions launches, events, or releases from before {cutoff_date}, score 0 regardless of page metadata. Republished old content is rejected.\n\
\n\
3. **Source quality**: is this a newsworthy launch or update?\n\
   - 5 = product launch, major feature release, significant API update, official announcement\n\
   - 3 = standard coverage of existing features or general analysis\n\
   - 2 = brief mention or minor update\n\
   - 1 = tweets, snippets, vague posts without substance\n\
\n\
4. **Summary clarity**: can a product manager understand it quickly? (5 = clear and actionable, 1 = vague or missing)\n\
\n\
Average >= {threshold:.1} keeps the article, otherwise it is discarded.\n\
\n\
**Articles ({count} total):**\n{articles}\n\
\n\
Return a JSON array with one object per article, in the same order:\n\
[{{\"url\": \"...\", \"relevance_score\": 4, \"recency_score\": 5, \"source_quality_score\": 4, \"summary_clarity_score\": 4, \"overall_score\": 4.25, \"decision\": \"keep\", \"reasoning\": \"brief reason\"}}]\n\
\n\
Respond ONLY with the JSON array.",
            query = query_context,
            today = today.format("%B %d, %Y"),
            day_context = self.recency.day_context(today),
            cutoff_date = cutoff_date.format("%B %d, %Y"),
            cutoff_hours = cutoff_hours,
            full_hours = self.recency.full_credit_hours,
            partial_hours = self.recency.partial_credit_hours,
            monday_band = monday_band,
            threshold = threshold,
            count = candidates.len(),
            articles = articles_text,
        )
    }
}
