//! Debate session state machine: phases, transitions, and session tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::SessionId;

/// Phase of a debate session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Request validated, nothing sent to any model yet.
    Created,
    /// Council members are streaming.
    Collecting,
    /// Waiting on the chairman.
    Synthesizing,
    /// Synthesis parsed and stored.
    Completed,
    /// Chairman call or synthesis write failed; responses are still stored.
    SynthesisFailed,
    /// Stopped before synthesis: too few responses, cancellation, or store failure.
    Aborted,
}

impl SessionPhase {
    /// Whether this is a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::SynthesisFailed | Self::Aborted
        )
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [SessionPhase] {
        match self {
            Self::Created => &[Self::Collecting, Self::Aborted],
            Self::Collecting => &[Self::Synthesizing, Self::Aborted],
            Self::Synthesizing => &[Self::Completed, Self::SynthesisFailed],
            Self::Completed | Self::SynthesisFailed | Self::Aborted => &[],
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Collecting => write!(f, "collecting"),
            Self::Synthesizing => write!(f, "synthesizing"),
            Self::Completed => write!(f, "completed"),
            Self::SynthesisFailed => write!(f, "synthesis_failed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// A phase transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: SessionPhase,
    pub to: SessionPhase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Error for invalid state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition {from} → {to}: {reason}")]
pub struct TransitionError {
    pub from: SessionPhase,
    pub to: SessionPhase,
    pub reason: String,
}

/// One debate, from validated request to terminal phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSession {
    /// Store-assigned id. `None` until the store opened the session.
    pub id: Option<SessionId>,
    pub query: String,
    pub chairman: String,
    /// Council in request order.
    pub council_members: Vec<String>,
    pub phase: SessionPhase,
    pub transitions: Vec<PhaseTransition>,
    pub created_at: DateTime<Utc>,
}

impl DebateSession {
    pub fn new(query: &str, chairman: &str, council_members: &[String]) -> Self {
        Self {
            id: None,
            query: query.to_string(),
            chairman: chairman.to_string(),
            council_members: council_members.to_vec(),
            phase: SessionPhase::Created,
            transitions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Transition to a new phase with a reason.
    pub fn transition(&mut self, to: SessionPhase, reason: &str) -> Result<(), TransitionError> {
        if self.phase.is_terminal() {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: "session already finished".to_string(),
            });
        }
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.phase.valid_transitions()
                ),
            });
        }

        self.transitions.push(PhaseTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;
        Ok(())
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        let id = self
            .id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        format!(
            "[{}] session={} | {} members | chairman={}",
            self.phase,
            id,
            self.council_members.len(),
            self.chairman
        )
    }
}
