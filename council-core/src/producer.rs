//! Model Response Producer contract.
//!
//! The engine never talks to a model gateway directly. It asks a
//! [`ModelProducer`] for a lazy, finite stream of text chunks per model and
//! treats any `Err` item as the terminal failure of that model.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::errors::ProducerError;

/// Chunks in generation order. The first `Err` ends the stream.
pub type ChunkStream = BoxStream<'static, Result<String, ProducerError>>;

/// Speaker of a chat message. The engine only sends user turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// One role/content pair sent to a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling parameters forwarded to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

impl SamplingOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature,
            ..Default::default()
        }
    }
}

/// Check the `stream`/`complete` preconditions shared by every producer.
pub fn check_request(model_id: &str, messages: &[ChatMessage]) -> Result<(), ProducerError> {
    if model_id.trim().is_empty() {
        return Err(ProducerError::InvalidRequest(
            "model id must not be empty".to_string(),
        ));
    }
    if messages.is_empty() {
        return Err(ProducerError::InvalidRequest(
            "message list must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Source of streamed model output.
///
/// Implementations do not retry; a failure is surfaced immediately as the
/// terminal item of the stream (or as the `Err` of `stream` itself when the
/// call cannot even start).
#[async_trait]
pub trait ModelProducer: Send + Sync {
    /// Start a streaming completion.
    async fn stream(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        options: SamplingOptions,
    ) -> Result<ChunkStream, ProducerError>;

    /// Non-streaming completion: the concatenation of [`Self::stream`]'s chunks.
    async fn complete(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        options: SamplingOptions,
    ) -> Result<String, ProducerError> {
        let mut chunks = self.stream(model_id, messages, options).await?;
        let mut full = String::new();
        while let Some(chunk) = chunks.next().await {
            full.push_str(&chunk?);
        }
        Ok(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    struct Canned(Vec<Result<String, ProducerError>>);

    #[async_trait]
    impl ModelProducer for Canned {
        async fn stream(
            &self,
            model_id: &str,
            messages: &[ChatMessage],
            _options: SamplingOptions,
        ) -> Result<ChunkStream, ProducerError> {
            check_request(model_id, messages)?;
            Ok(stream::iter(self.0.clone()).boxed())
        }
    }

    #[tokio::test]
    async fn complete_concatenates_chunks() {
        let producer = Canned(vec![Ok("Hel".into()), Ok("lo".into())]);
        let text = producer
            .complete("m", &[ChatMessage::user("hi")], SamplingOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn complete_surfaces_mid_stream_failure() {
        let producer = Canned(vec![
            Ok("partial".into()),
            Err(ProducerError::Upstream("overloaded".into())),
        ]);
        let err = producer
            .complete("m", &[ChatMessage::user("hi")], SamplingOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, ProducerError::Upstream("overloaded".into()));
    }

    #[test]
    fn empty_model_or_messages_rejected() {
        assert!(check_request("", &[ChatMessage::user("q")]).is_err());
        assert!(check_request("m", &[]).is_err());
        assert!(check_request("m", &[ChatMessage::user("q")]).is_ok());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::user("q")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"q"}"#);
    }
}
