//! Outward debate events
//!
//! Every event serializes as `{"type": "<tag>", ...payload}`; [`DebateEvent::to_sse`]
//! renders the server-sent-events framing used by streaming front ends.

use serde::{Deserialize, Serialize};

use crate::council::{DebatePoint, ModelResponseResult, SynthesisResult};
use crate::store::SessionId;

/// All events emitted during one debate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebateEvent {
    /// A session was opened; precedes every `model_*` event
    DebateStart {
        session_id: SessionId,
        query: String,
        council_members: Vec<String>,
        chairman: String,
    },

    /// A council member started streaming
    ModelStart { model_id: String },

    /// A council member produced a chunk
    ModelChunk { model_id: String, chunk: String },

    /// A council member finished successfully
    ModelComplete {
        model_id: String,
        elapsed_seconds: f64,
        chunk_count: u64,
    },

    /// A council member failed
    ModelError { model_id: String, error: String },

    /// The chairman was asked to synthesize
    SynthesisStart { chairman: String },

    /// The chairman's answer, parsed
    SynthesisComplete {
        consensus_items: Vec<String>,
        debates: Vec<DebatePoint>,
        synthesis_text: String,
    },

    /// The chairman call or its persistence failed
    SynthesisError { error: String },

    /// Always the last event of a debate that got past collection
    DebateComplete { session_id: SessionId },

    /// Session-terminal failure
    Error { message: String },
}

impl DebateEvent {
    /// Tag used for the `type` field and the SSE `event:` line
    pub fn event_type(&self) -> &'static str {
        match self {
            DebateEvent::DebateStart { .. } => "debate_start",
            DebateEvent::ModelStart { .. } => "model_start",
            DebateEvent::ModelChunk { .. } => "model_chunk",
            DebateEvent::ModelComplete { .. } => "model_complete",
            DebateEvent::ModelError { .. } => "model_error",
            DebateEvent::SynthesisStart { .. } => "synthesis_start",
            DebateEvent::SynthesisComplete { .. } => "synthesis_complete",
            DebateEvent::SynthesisError { .. } => "synthesis_error",
            DebateEvent::DebateComplete { .. } => "debate_complete",
            DebateEvent::Error { .. } => "error",
        }
    }

    /// Model this event belongs to, if any
    pub fn model_id(&self) -> Option<&str> {
        match self {
            DebateEvent::ModelStart { model_id }
            | DebateEvent::ModelChunk { model_id, .. }
            | DebateEvent::ModelComplete { model_id, .. }
            | DebateEvent::ModelError { model_id, .. } => Some(model_id),
            _ => None,
        }
    }

    /// Session this event belongs to, if it carries one
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            DebateEvent::DebateStart { session_id, .. }
            | DebateEvent::DebateComplete { session_id } => Some(*session_id),
            _ => None,
        }
    }

    /// `model_complete` or `model_error`
    pub fn is_model_terminal(&self) -> bool {
        matches!(
            self,
            DebateEvent::ModelComplete { .. } | DebateEvent::ModelError { .. }
        )
    }

    pub fn model_complete(result: &ModelResponseResult) -> Self {
        DebateEvent::ModelComplete {
            model_id: result.model_id.clone(),
            elapsed_seconds: result.elapsed_seconds(),
            chunk_count: result.chunk_count,
        }
    }

    pub fn synthesis_complete(result: &SynthesisResult) -> Self {
        DebateEvent::SynthesisComplete {
            consensus_items: result.consensus_items.clone(),
            debates: result.debates.clone(),
            synthesis_text: result.synthesis_text.clone(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        DebateEvent::Error {
            message: message.into(),
        }
    }

    /// Payload without the `type` tag
    pub fn payload(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let serde_json::Value::Object(ref mut map) = value {
            map.remove("type");
        }
        value
    }

    /// `event: <tag>\ndata: <payload>\n\n`
    pub fn to_sse(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event_type(), self.payload())
    }
}
