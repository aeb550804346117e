//! Value types produced by a council round.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Final output of one successfully completed council member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponseResult {
    pub model_id: String,
    /// Concatenation of every streamed chunk.
    pub text: String,
    pub chunk_count: u64,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl ModelResponseResult {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// A council member that did not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFailure {
    pub model_id: String,
    pub error: String,
}

/// One point of disagreement extracted from the chairman's `DEBATES:` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebatePoint {
    pub topic: String,
    /// Everything after the first colon; empty when the bullet had none.
    pub positions: String,
}

impl DebatePoint {
    pub fn new(topic: impl Into<String>, positions: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            positions: positions.into(),
        }
    }
}

/// Structured chairman output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisResult {
    /// In order of appearance.
    pub consensus_items: Vec<String>,
    /// In order of appearance.
    pub debates: Vec<DebatePoint>,
    pub synthesis_text: String,
}

impl SynthesisResult {
    /// No section produced any content.
    pub fn is_empty(&self) -> bool {
        self.consensus_items.is_empty() && self.debates.is_empty() && self.synthesis_text.is_empty()
    }
}

/// Everything the collector learned from one fan-out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionOutcome {
    /// Successful responses in council order.
    pub responses: Vec<ModelResponseResult>,
    /// Failed members in council order.
    pub failures: Vec<ModelFailure>,
    /// The fan-out was cut short by cancellation.
    pub cancelled: bool,
}

impl CollectionOutcome {
    pub fn success_count(&self) -> usize {
        self.responses.len()
    }
}

pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
