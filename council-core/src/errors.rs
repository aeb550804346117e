//! Error taxonomy for the debate engine.
//!
//! | Error                  | Scope        | Surfaced as                         | Session-terminal |
//! |------------------------|--------------|-------------------------------------|------------------|
//! | `ValidationError`      | request      | single `error` event                | yes (no session) |
//! | `ProducerError`        | one member   | `model_error` for that member       | no               |
//! | `InsufficientResponses`| session      | single `error` event                | yes              |
//! | `SynthesisError`       | chairman     | `synthesis_error`                   | no               |
//! | `StoreError`           | persistence  | depends on the write that failed    | see call site    |
//!
//! Parse degradation of chairman output is not an error at all: the parser
//! returns empty sections and logs.

use thiserror::Error;

use crate::store::SessionId;

/// A debate request was rejected before any session was opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Need at least {required} council members for debate, got {actual}")]
    CouncilTooSmall { required: usize, actual: usize },

    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Chairman model must not be empty")]
    EmptyChairman,

    #[error("Council member at position {0} has an empty model id")]
    EmptyMember(usize),
}

/// Failure of a single model's streaming call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProducerError {
    /// The call was rejected before reaching the gateway.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Connection, TLS, or timeout failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The gateway answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// A frame of the wire stream could not be decoded.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The upstream signalled an error mid-stream.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The producer was cancelled by the session.
    #[error("cancelled")]
    Cancelled,
}

impl ProducerError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors from a Decision Store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Session {0} already has a synthesis")]
    SynthesisExists(SessionId),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The chairman synthesis step failed.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Chairman {model} failed: {source}")]
    Chairman {
        model: String,
        #[source]
        source: ProducerError,
    },

    #[error("Failed to store synthesis: {0}")]
    Store(#[from] StoreError),
}

impl SynthesisError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Chairman { source, .. } if source.is_cancelled())
    }
}

/// Session-terminal failures. Each is reported as exactly one `error` event.
#[derive(Debug, Error)]
pub enum DebateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Not enough models responded successfully for synthesis ({succeeded} of {required} required)")]
    InsufficientResponses { succeeded: usize, required: usize },

    #[error("Failed to open debate session: {0}")]
    Store(#[from] StoreError),

    #[error("Debate cancelled")]
    Cancelled,
}
