//! Debate session manager: one request in, one ordered event sequence out.
//!
//! ```text
//! validate ─▶ create_session ─▶ debate_start ─▶ collect ─┬─▶ error (too few / cancelled)
//!                                                        └─▶ synthesis_start ─▶ synthesize
//!                                                              ├─ synthesis_complete ─┐
//!                                                              └─ synthesis_error ────┴─▶ debate_complete
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::run::DebateRun;
use super::state::{DebateSession, SessionPhase};
use crate::config::{CouncilConfig, MIN_RESPONSES_FOR_SYNTHESIS};
use crate::council::{ModelFailure, ResponseCollector, SynthesisDriver, SynthesisResult};
use crate::errors::{DebateError, ProducerError, SynthesisError, ValidationError};
use crate::events::{DebateEvent, EventEmitter};
use crate::producer::ModelProducer;
use crate::store::{SessionId, SharedDecisionStore};

/// Smallest council worth debating.
pub const MIN_COUNCIL_SIZE: usize = 2;

/// What the caller asks the council.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateRequest {
    pub query: String,
    /// Model ids in council order. Duplicates are allowed and run independently.
    pub council_members: Vec<String>,
    pub chairman: String,
}

impl DebateRequest {
    pub fn new(
        query: impl Into<String>,
        council_members: Vec<String>,
        chairman: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            council_members,
            chairman: chairman.into(),
        }
    }

    /// Reject requests that must never open a session.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.council_members.len() < MIN_COUNCIL_SIZE {
            return Err(ValidationError::CouncilTooSmall {
                required: MIN_COUNCIL_SIZE,
                actual: self.council_members.len(),
            });
        }
        if self.query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if self.chairman.trim().is_empty() {
            return Err(ValidationError::EmptyChairman);
        }
        if let Some(pos) = self.council_members.iter().position(|m| m.trim().is_empty()) {
            return Err(ValidationError::EmptyMember(pos));
        }
        Ok(())
    }
}

/// Summary of a finished run for programmatic callers.
///
/// The event sequence is authoritative; this mirrors it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebateOutcome {
    /// `None` when the request failed validation.
    pub session: Option<DebateSession>,
    /// Successful members in council order.
    pub succeeded: Vec<String>,
    pub failed: Vec<ModelFailure>,
    pub synthesis: Option<SynthesisResult>,
    /// Message of the session-terminal `error` or the `synthesis_error`, if any.
    pub error: Option<String>,
}

impl DebateOutcome {
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().and_then(|s| s.id)
    }

    pub fn phase(&self) -> Option<SessionPhase> {
        self.session.as_ref().map(|s| s.phase)
    }

    /// Whether synthesis was produced and stored.
    pub fn is_success(&self) -> bool {
        self.phase() == Some(SessionPhase::Completed)
    }
}

/// Runs debates against one producer and one Decision Store.
#[derive(Clone)]
pub struct DebateSessionManager {
    producer: Arc<dyn ModelProducer>,
    store: SharedDecisionStore,
    config: CouncilConfig,
}

impl DebateSessionManager {
    pub fn new(
        producer: Arc<dyn ModelProducer>,
        store: SharedDecisionStore,
        config: CouncilConfig,
    ) -> Self {
        Self {
            producer,
            store,
            config,
        }
    }

    /// Spawn a debate on the current runtime and hand back its event stream.
    pub fn start(&self, request: DebateRequest) -> DebateRun {
        let cancel = CancellationToken::new();
        let (emitter, events) = EventEmitter::channel(cancel.clone());
        let manager = self.clone();
        let task_cancel = cancel.clone();
        let handle =
            tokio::spawn(async move { manager.run(request, &emitter, &task_cancel).await });
        DebateRun::new(events, cancel, handle)
    }

    /// Drive one debate to its end, emitting every event through `emitter`.
    pub async fn run(
        &self,
        request: DebateRequest,
        emitter: &EventEmitter,
        cancel: &CancellationToken,
    ) -> DebateOutcome {
        let mut outcome = DebateOutcome::default();

        if let Err(e) = request.validate() {
            warn!(error = %e, "debate request rejected");
            fail(emitter, &mut outcome, DebateError::from(e));
            return outcome;
        }

        let mut session =
            DebateSession::new(&request.query, &request.chairman, &request.council_members);

        let session_id = match self
            .store
            .create_session(&request.query, &request.chairman)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "failed to open debate session");
                advance(&mut session, SessionPhase::Aborted, "store unavailable");
                outcome.session = Some(session);
                fail(emitter, &mut outcome, DebateError::from(e));
                return outcome;
            }
        };
        session.id = Some(session_id);

        info!(
            session_id,
            members = request.council_members.len(),
            chairman = %request.chairman,
            "debate started"
        );
        emitter.emit(DebateEvent::DebateStart {
            session_id,
            query: request.query.clone(),
            council_members: request.council_members.clone(),
            chairman: request.chairman.clone(),
        });
        advance(&mut session, SessionPhase::Collecting, "debate started");

        let collector =
            ResponseCollector::new(self.producer.clone(), self.store.clone(), &self.config);
        let collected = collector
            .collect(
                session_id,
                &request.query,
                &request.council_members,
                emitter,
                cancel,
            )
            .await;

        outcome.succeeded = collected
            .responses
            .iter()
            .map(|r| r.model_id.clone())
            .collect();
        outcome.failed = collected.failures.clone();

        if collected.cancelled {
            info!(session_id, "debate cancelled during collection");
            advance(&mut session, SessionPhase::Aborted, "cancelled");
            outcome.session = Some(session);
            fail(emitter, &mut outcome, DebateError::Cancelled);
            return outcome;
        }

        let required = self
            .config
            .min_successful_responses
            .max(MIN_RESPONSES_FOR_SYNTHESIS);
        let succeeded = collected.success_count();
        if succeeded < required {
            warn!(session_id, succeeded, required, "too few council responses");
            advance(&mut session, SessionPhase::Aborted, "insufficient responses");
            outcome.session = Some(session);
            fail(
                emitter,
                &mut outcome,
                DebateError::InsufficientResponses {
                    succeeded,
                    required,
                },
            );
            return outcome;
        }

        advance(&mut session, SessionPhase::Synthesizing, "enough responses");
        emitter.emit(DebateEvent::SynthesisStart {
            chairman: request.chairman.clone(),
        });

        let driver = SynthesisDriver::new(self.producer.clone(), &self.config);
        let synthesized = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SynthesisError::Chairman {
                model: request.chairman.clone(),
                source: ProducerError::Cancelled,
            }),
            result = self.synthesize_and_store(
                &driver,
                session_id,
                &request,
                &collected.responses,
            ) => result,
        };

        match synthesized {
            Ok(result) => {
                emitter.emit(DebateEvent::synthesis_complete(&result));
                advance(&mut session, SessionPhase::Completed, "synthesis stored");
                outcome.synthesis = Some(result);
            }
            Err(e) => {
                if e.is_cancelled() {
                    info!(session_id, "debate cancelled during synthesis");
                } else {
                    warn!(session_id, error = %e, "synthesis failed");
                }
                emitter.emit(DebateEvent::SynthesisError {
                    error: e.to_string(),
                });
                advance(&mut session, SessionPhase::SynthesisFailed, "synthesis failed");
                outcome.error = Some(e.to_string());
            }
        }

        emitter.emit(DebateEvent::DebateComplete { session_id });
        info!(session_id, phase = %session.phase, "debate finished");
        outcome.session = Some(session);
        outcome
    }

    async fn synthesize_and_store(
        &self,
        driver: &SynthesisDriver,
        session_id: SessionId,
        request: &DebateRequest,
        responses: &[crate::council::ModelResponseResult],
    ) -> Result<SynthesisResult, SynthesisError> {
        let result = driver
            .synthesize(&request.query, responses, &request.chairman)
            .await?;
        self.store.append_synthesis(session_id, &result).await?;
        Ok(result)
    }
}

/// Emit the single session-terminal `error` event.
fn fail(emitter: &EventEmitter, outcome: &mut DebateOutcome, error: DebateError) {
    let message = error.to_string();
    emitter.emit(DebateEvent::error(message.clone()));
    outcome.error = Some(message);
}

fn advance(session: &mut DebateSession, to: SessionPhase, reason: &str) {
    if let Err(e) = session.transition(to, reason) {
        warn!(error = %e, "debate session transition rejected");
    }
}
