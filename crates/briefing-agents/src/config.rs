//! Runtime configuration for the briefing agents.
//!
//! Everything is environment-driven with code defaults, except the two API
//! keys: a missing search-provider or LLM credential is a startup-time hard
//! failure, never a per-call fallback.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};

const DEFAULT_PROVIDER_URL: &str = "https://api.exa.ai";
const DEFAULT_LLM_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_LLM_TEMPERATURE: f32 = 0.3;

const DEFAULT_SEARCH_DAYS_LOOKBACK: u32 = 4;
const DEFAULT_DEDUP_LOOKBACK_DAYS: u32 = 5;
const DEFAULT_SEARCH_LIMIT_FIRST: usize = 5;
const DEFAULT_SEARCH_LIMIT_FOLLOWUP: usize = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DATA_DIR: &str = ".cache/briefing";
const DEFAULT_USER_LOCATION: &str = "US";

/// Domains that consistently produce low-quality aggregated content.
/// Passed to the provider as an exclusion list.
const LOW_QUALITY_DOMAINS: [&str; 5] = [
    "medium.com",
    "dev.to",
    "hackernoon.com",
    "towardsdatascience.com",
    "levelup.gitconnected.com",
];

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

/// Search provider endpoint.
#[derive(Debug, Clone)]
pub struct ProviderEndpoint {
    pub url: String,
    pub api_key: String,
}

/// Chat-completion endpoint used by the judge and the refiner.
#[derive(Debug, Clone)]
pub struct LlmEndpoint {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
}

/// Keep thresholds per iteration.
///
/// Invariant: `first >= followup`. The first round is the strictest; later
/// rounds relax slightly so a stalling agent converges instead of spinning.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdSchedule {
    pub first: f32,
    pub followup: f32,
}

impl Default for ThresholdSchedule {
    fn default() -> Self {
        Self {
            first: 4.0,
            followup: 3.8,
        }
    }
}

impl ThresholdSchedule {
    /// Keep cutoff for the given 1-based iteration.
    pub fn for_iteration(&self, iteration: u32) -> f32 {
        if iteration <= 1 {
            self.first
        } else {
            self.followup
        }
    }
}

/// Hour windows driving the recency rubric handed to the judge.
///
/// The Monday grace window exists because a Monday briefing has a weekend gap
/// behind it; it is policy, not calendar logic, so it stays configurable and
/// `weekend_aware = false` disables it entirely.
#[derive(Debug, Clone)]
pub struct RecencyPolicy {
    /// Published-date banner window, in days ("past N days only").
    pub window_days: u32,
    /// Full recency credit within this many hours.
    pub full_credit_hours: u32,
    /// Partial credit up to this many hours.
    pub partial_credit_hours: u32,
    /// Hard cutoff on Tuesday through Friday.
    pub weekday_cutoff_hours: u32,
    /// Hard cutoff on Monday, covering the weekend gap.
    pub monday_grace_hours: u32,
    pub weekend_aware: bool,
}

impl Default for RecencyPolicy {
    fn default() -> Self {
        Self {
            window_days: 4,
            full_credit_hours: 24,
            partial_credit_hours: 48,
            weekday_cutoff_hours: 48,
            monday_grace_hours: 72,
            weekend_aware: true,
        }
    }
}

impl RecencyPolicy {
    /// Whether `today` gets the weekend-gap grace window.
    pub fn is_weekend_gap_day(&self, today: NaiveDate) -> bool {
        self.weekend_aware && today.weekday() == Weekday::Mon
    }

    /// Hard cutoff in hours for a briefing generated on `today`.
    pub fn cutoff_hours(&self, today: NaiveDate) -> u32 {
        if self.is_weekend_gap_day(today) {
            self.monday_grace_hours
        } else {
            self.weekday_cutoff_hours
        }
    }

    /// Short day-of-week context string for the rubric.
    pub fn day_context(&self, today: NaiveDate) -> &'static str {
        if self.is_weekend_gap_day(today) {
            "Monday (weekend gap)"
        } else {
            "Tuesday-Friday (daily flow)"
        }
    }
}

/// Top-level configuration for a briefing run.
#[derive(Debug, Clone)]
pub struct BriefingConfig {
    pub provider: ProviderEndpoint,
    pub llm: LlmEndpoint,
    /// Published-date window for provider searches, in days.
    pub search_days_lookback: u32,
    /// Cross-run dedup window, in days.
    pub dedup_lookback_days: u32,
    pub thresholds: ThresholdSchedule,
    pub search_limit_first: usize,
    pub search_limit_followup: usize,
    pub excluded_domains: Vec<String>,
    pub user_location: Option<String>,
    pub recency: RecencyPolicy,
    /// Timeout applied to every external call.
    pub request_timeout: Duration,
    /// Root for the content store and the per-day result cache.
    pub data_dir: PathBuf,
    /// Recorded with persisted articles ("manual" or "automated").
    pub run_label: String,
}

impl Default for BriefingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderEndpoint {
                url: DEFAULT_PROVIDER_URL.to_string(),
                api_key: String::new(),
            },
            llm: LlmEndpoint {
                url: DEFAULT_LLM_URL.to_string(),
                api_key: String::new(),
                model: DEFAULT_LLM_MODEL.to_string(),
                temperature: DEFAULT_LLM_TEMPERATURE,
            },
            search_days_lookback: DEFAULT_SEARCH_DAYS_LOOKBACK,
            dedup_lookback_days: DEFAULT_DEDUP_LOOKBACK_DAYS,
            thresholds: ThresholdSchedule::default(),
            search_limit_first: DEFAULT_SEARCH_LIMIT_FIRST,
            search_limit_followup: DEFAULT_SEARCH_LIMIT_FOLLOWUP,
            excluded_domains: LOW_QUALITY_DOMAINS.iter().map(|d| d.to_string()).collect(),
            user_location: Some(DEFAULT_USER_LOCATION.to_string()),
            recency: RecencyPolicy::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            run_label: "manual".to_string(),
        }
    }
}

impl BriefingConfig {
    /// Build configuration from the environment.
    ///
    /// `EXA_API_KEY` and `OPENAI_API_KEY` are required; everything else has a
    /// default and an optional `BRIEFING_*` override.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        config.provider.api_key =
            std::env::var("EXA_API_KEY").context("EXA_API_KEY must be set (search provider credential)")?;
        config.llm.api_key =
            std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set (judge/refiner credential)")?;

        if let Ok(url) = std::env::var("EXA_BASE_URL") {
            config.provider.url = url;
        }
        if let Ok(url) = std::env::var("BRIEFING_LLM_URL") {
            config.llm.url = url;
        }
        if let Ok(model) = std::env::var("BRIEFING_LLM_MODEL") {
            config.llm.model = model;
        }
        if let Some(days) = env_parse::<u32>("BRIEFING_SEARCH_DAYS") {
            config.search_days_lookback = days;
            config.recency.window_days = days;
        }
        if let Some(days) = env_parse::<u32>("BRIEFING_DEDUP_DAYS") {
            config.dedup_lookback_days = days;
        }
        if let Some(secs) = env_parse::<u64>("BRIEFING_TIMEOUT_SECS").filter(|s| *s > 0) {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Ok(dir) = std::env::var("BRIEFING_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Provider result limit for the given 1-based iteration. Later rounds
    /// target a shrinking gap, so the limit is tunable per phase.
    pub fn search_limit(&self, iteration: u32) -> usize {
        if iteration <= 1 {
            self.search_limit_first
        } else {
            self.search_limit_followup
        }
    }
}
