//! LLM query refinement between search rounds.
//!
//! Given the most recent discards and their judge reasoning, asks the model
//! for a revised query that avoids the same pitfalls. Any failure falls back
//! to the unmodified query: the worst case is repeating the same search,
//! never crashing the loop.

use std::fmt::Write as _;
use std::sync::Arc;

use curation::json_extract;
use tracing::{debug, warn};

use crate::judge::ArticleEvaluation;
use crate::llm::ChatCompletion;

/// Discards carried into the refinement prompt. Bounding the context keeps
/// the prompt size stable no matter how many rounds have run.
pub const MAX_DISCARD_CONTEXT: usize = 10;

const REFINER_SYSTEM: &str = "You refine search queries for a daily AI product-manager briefing. \
Respond only with the refined query text.";

pub struct QueryRefiner {
    llm: Arc<dyn ChatCompletion>,
}

impl QueryRefiner {
    pub fn new(llm: Arc<dyn ChatCompletion>) -> Self {
        Self { llm }
    }

    /// Produce a revised query from `original_query` and the latest discards.
    pub async fn refine(&self, original_query: &str, discarded: &[ArticleEvaluation]) -> String {
        let recent = &discarded[discarded.len().saturating_sub(MAX_DISCARD_CONTEXT)..];
        let mut context = String::new();
        for evaluation in recent {
            let _ = writeln!(
                context,
                "- {} (score {:.1}) - {}",
                evaluation.url, evaluation.overall_score, evaluation.reasoning
            );
        }
        if context.is_empty() {
            context.push_str("None\n");
        }

        let prompt = format!(
            "Refine this search query to find better articles.\n\
\n\
ORIGINAL QUERY:\n{original_query}\n\
\n\
RECENT DISCARDED RESULTS (to avoid):\n{context}\n\
TASK:\n\
Refine the query to avoid low-quality results. Keep the core focus but add specificity.\n\
\n\
RULES:\n\
1. Remove terms that led to poor results\n\
2. Emphasize product announcements, APIs, and launches\n\
3. Explicitly avoid tutorials and getting-started guides\n\
4. Keep the query concise (2-3 sentences at most)\n\
\n\
Return ONLY the refined query text (no JSON, no explanation)."
        );

        match self.llm.complete(REFINER_SYSTEM, &prompt).await {
            Ok(reply) => {
                let refined = json_extract::strip_code_fences(&reply).trim().to_string();
                if refined.is_empty() {
                    warn!("refiner returned an empty query — reusing original");
                    original_query.to_string()
                } else {
                    debug!("refined query generated");
                    refined
                }
            }
            Err(e) => {
                warn!(error = %e, "query refinement failed — reusing original query");
                original_query.to_string()
            }
        }
    }
}
