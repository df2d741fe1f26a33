//! Specialist-agent phase machine: explicit phases and legal transition guards.
//!
//! Provides a typed phase model for the search loop so that:
//! 1. Every phase transition is auditable and logged.
//! 2. Illegal transitions are caught by `advance()` guards.
//! 3. A run's phase sequence can be reconstructed after the fact.
//!
//! The agent loop calls `advance()` to move between phases. Each call
//! validates the transition and records it in the transition log.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The set of agent phases.
///
/// Every run starts at `PlanningInitial` and terminates at `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    /// Setting the starting query and clearing accumulators.
    PlanningInitial,
    /// Calling the search provider and deduplicating candidates.
    Searching,
    /// Scoring unevaluated candidates with the LLM judge.
    Evaluating,
    /// Generating a refined query from this round's discards.
    Refining,
    /// Sorting, truncating, and persisting the kept articles.
    Finalizing,
    /// Run complete; terminal phase.
    Done,
}

impl AgentPhase {
    /// Whether this is the terminal phase (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlanningInitial => write!(f, "PlanningInitial"),
            Self::Searching => write!(f, "Searching"),
            Self::Evaluating => write!(f, "Evaluating"),
            Self::Refining => write!(f, "Refining"),
            Self::Finalizing => write!(f, "Finalizing"),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// Legal transitions between agent phases.
///
/// The transition table encodes the valid edges in the phase graph:
/// ```text
/// PlanningInitial → Searching
/// Searching → Evaluating
/// Evaluating → Refining | Finalizing
/// Refining → Searching
/// Finalizing → Done
/// ```
fn is_legal_transition(from: AgentPhase, to: AgentPhase) -> bool {
    use AgentPhase::*;

    matches!(
        (from, to),
        (PlanningInitial, Searching)
            | (Searching, Evaluating)
            // After evaluating: target not met → refine; otherwise finalize
            | (Evaluating, Refining)
            | (Evaluating, Finalizing)
            // After refining: re-enter search with the new query
            | (Refining, Searching)
            | (Finalizing, Done)
    )
}

/// A single recorded phase transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// The phase transitioned from.
    pub from: AgentPhase,
    /// The phase transitioned to.
    pub to: AgentPhase,
    /// Iteration number at the time of transition.
    pub iteration: u32,
    /// Milliseconds since the phase machine was created.
    pub elapsed_ms: u64,
    /// Optional context about why this transition happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone)]
pub struct IllegalTransition {
    pub from: AgentPhase,
    pub to: AgentPhase,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal phase transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// The agent phase machine.
///
/// Tracks the current phase, enforces legal transitions, and maintains a
/// complete log of all transitions for diagnostics.
pub struct PhaseMachine {
    current: AgentPhase,
    iteration: u32,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl PhaseMachine {
    /// Create a new phase machine starting at `PlanningInitial`.
    pub fn new() -> Self {
        Self {
            current: AgentPhase::PlanningInitial,
            iteration: 0,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    /// Get the current phase.
    pub fn current(&self) -> AgentPhase {
        self.current
    }

    /// Get the current iteration number.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Set the iteration counter (called by the agent loop).
    pub fn set_iteration(&mut self, iteration: u32) {
        self.iteration = iteration;
    }

    /// Attempt to advance to the next phase.
    ///
    /// Returns `Ok(())` if the transition is legal, or `Err(IllegalTransition)`
    /// if it would violate the phase graph.
    pub fn advance(&mut self, to: AgentPhase, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            iteration: self.iteration,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(
            from = %self.current,
            to = %to,
            iteration = self.iteration,
            "phase transition"
        );

        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    /// Whether the phase machine is in the terminal phase.
    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    /// Get the full transition log.
    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Get a summary string of the phase machine's history.
    pub fn summary(&self) -> String {
        let phases: Vec<String> = self.transitions.iter().map(|t| t.to.to_string()).collect();
        let mut summary = format!(
            "{} → {} ({}ms, {} transitions)",
            AgentPhase::PlanningInitial,
            self.current,
            self.created_at.elapsed().as_millis(),
            self.transitions.len(),
        );
        if !phases.is_empty() {
            summary.push_str(&format!(" [{}]", phases.join(" → ")));
        }
        summary
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}
