//! Starting queries and the default specialist lineup.
//!
//! Three specialists cover the briefing's article sections: conversational
//! AI (voice and agents), general AI (startups and emerging companies), and
//! research/opinion (trends and analysis). Targets are 3 + 3 + 2 = 8
//! articles per briefing.

use crate::agent::AgentSpec;

const DEFAULT_SUMMARY_MAX_CHARS: usize = 1000;
/// Research articles need more room to summarize methodology and findings.
const RESEARCH_SUMMARY_MAX_CHARS: usize = 1500;

pub const CONVERSATIONAL_AI_QUERY: &str = "\
Recent voice AI and conversational agent news for AI product managers, from the past 24-96 hours. \
Cover real-time voice platforms, streaming speech APIs, agent frameworks, multi-agent \
orchestration, speech-to-text and text-to-speech advances, tool use, and conversational UX. \
Prefer product announcements, API updates, and technical posts from companies building in this \
space; avoid tutorials, getting-started guides, and news aggregators.";

pub const GENERAL_AI_QUERY: &str = "\
Recent product launches and updates from AI startups and emerging companies, from the past 24-96 \
hours, for AI product managers. Cover new tools and platforms, funding announcements with product \
detail, developer tooling, infrastructure startups, vertical AI solutions, and open-source \
releases from smaller teams. Exclude the major labs (OpenAI, Google, Anthropic, Microsoft, Meta); \
prefer company blogs and official announcements over aggregators and explainers.";

pub const RESEARCH_OPINION_QUERY: &str = "\
Recent AI research and strategic analysis for AI product managers, from the past 24-96 hours. \
Cover adoption trends, competitive landscape analysis, technical breakthroughs with business \
impact, benchmark results, regulatory changes, and novel use cases. Prefer original research, \
data-driven analysis, and case studies with results; avoid speculative listicles, hype pieces, \
and news aggregators.";

/// The standard three-specialist lineup.
pub fn default_specs() -> Vec<AgentSpec> {
    vec![
        AgentSpec {
            category: "conversational_ai".to_string(),
            target_count: 3,
            initial_query: CONVERSATIONAL_AI_QUERY.to_string(),
            summary_max_chars: DEFAULT_SUMMARY_MAX_CHARS,
        },
        AgentSpec {
            category: "general_ai".to_string(),
            target_count: 3,
            initial_query: GENERAL_AI_QUERY.to_string(),
            summary_max_chars: DEFAULT_SUMMARY_MAX_CHARS,
        },
        AgentSpec {
            category: "research_opinion".to_string(),
            target_count: 2,
            initial_query: RESEARCH_OPINION_QUERY.to_string(),
            summary_max_chars: RESEARCH_SUMMARY_MAX_CHARS,
        },
    ]
}
