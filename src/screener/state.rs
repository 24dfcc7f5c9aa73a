//! Flow state machine: which phase the screener is in and the data it carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::AnswerRecord;

/// The phases of a screener run.
///
/// Loading → InProgress → Completed, with Error reachable from Loading and
/// from the final submission, and left again by retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPhase {
    Loading,
    Error,
    InProgress,
    Completed,
}

impl FlowPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: FlowPhase) -> bool {
        use FlowPhase::*;
        matches!(
            (self, target),
            (Loading, InProgress)
                | (Loading, Error)
                | (Error, Loading)
                | (Error, Completed)
                | (Error, Error)
                | (InProgress, InProgress)
                | (InProgress, Completed)
                | (InProgress, Error)
        )
    }

    /// Whether this phase is terminal (no further answers accepted).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for FlowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Loading => "loading",
            Self::Error => "error",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// The step a retry re-runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStep {
    /// Re-fetch the screener content.
    Fetch,
    /// Re-submit the answers that failed to go through.
    Submit { answers: AnswerRecord },
}

/// Current state of a screener run. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Loading,
    Error {
        /// Human-readable message for the user.
        message: String,
        retry: RetryStep,
    },
    InProgress {
        current_index: usize,
        answers: AnswerRecord,
    },
    Completed {
        /// Recommended assessments, possibly empty.
        recommendations: Vec<String>,
        /// The answers that were submitted.
        answers: AnswerRecord,
        completed_at: DateTime<Utc>,
    },
}

impl FlowState {
    pub fn phase(&self) -> FlowPhase {
        match self {
            Self::Loading => FlowPhase::Loading,
            Self::Error { .. } => FlowPhase::Error,
            Self::InProgress { .. } => FlowPhase::InProgress,
            Self::Completed { .. } => FlowPhase::Completed,
        }
    }

    /// Answers collected so far. Still available after a failed submission
    /// and after completion.
    pub fn answers(&self) -> Option<&AnswerRecord> {
        match self {
            Self::InProgress { answers, .. }
            | Self::Completed { answers, .. }
            | Self::Error {
                retry: RetryStep::Submit { answers },
                ..
            } => Some(answers),
            _ => None,
        }
    }

    /// Move to `next`, checking the phase transition table.
    pub fn transition_to(&mut self, next: FlowState) -> Result<(), String> {
        let (from, to) = (self.phase(), next.phase());
        if !from.can_transition_to(to) {
            return Err(format!("Cannot transition from {from} to {to}"));
        }
        tracing::debug!(%from, %to, "Screener flow transition");
        *self = next;
        Ok(())
    }
}

/// Position within the questionnaire, derived from the current index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// 1-based number of the question on screen.
    pub position: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(current_index: usize, total: usize) -> Self {
        Self {
            position: current_index + 1,
            total,
        }
    }

    /// Fraction in `0.0..=1.0`; reaches 1.0 only on the last question.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.position as f64 / self.total as f64
    }

    pub fn percent(&self) -> f64 {
        self.fraction() * 100.0
    }

    /// Counter line, e.g. "Question 2 of 8".
    pub fn counter(&self) -> String {
        format!("Question {} of {}", self.position, self.total)
    }
}
