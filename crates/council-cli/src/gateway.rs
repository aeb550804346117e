//! OpenAI-compatible gateway producer (LiteLLM proxy and friends).
//!
//! `POST {base}/chat/completions` with `stream: true`; the response body is
//! server-sent events, one `data:` line per delta, terminated by `data: [DONE]`.

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use council_core::producer::check_request;
use council_core::{ChatMessage, ChunkStream, ModelProducer, ProducerError, SamplingOptions};
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GatewayConfig;

/// Longest error body kept in `ProducerError::Status`.
const MAX_ERROR_BODY: usize = 500;

/// Token budget for the availability check.
const TEST_MAX_TOKENS: u32 = 5;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// One entry of `GET {base}/models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub owned_by: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

/// [`ModelProducer`] backed by an OpenAI-compatible HTTP gateway.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .read_timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Models the gateway advertises.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ProducerError> {
        let response = self
            .authorized(self.client.get(self.config.models_url()))
            .send()
            .await
            .map_err(transport)?;
        let response = ensure_success(response).await?;
        let list: ModelList = response
            .json()
            .await
            .map_err(|e| ProducerError::MalformedPayload(e.to_string()))?;
        Ok(list.data)
    }

    /// Whether `model_id` answers a tiny non-streaming completion.
    pub async fn test_model(&self, model_id: &str) -> bool {
        match self.send_test_completion(model_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(model = model_id, error = %e, "model check failed");
                false
            }
        }
    }

    async fn send_test_completion(&self, model_id: &str) -> Result<(), ProducerError> {
        let messages = [ChatMessage::user("Hi")];
        check_request(model_id, &messages)?;
        let body = CompletionRequest {
            model: model_id,
            messages: &messages,
            temperature: None,
            stream: false,
            max_tokens: Some(TEST_MAX_TOKENS),
        };
        let response = self
            .authorized(self.client.post(self.config.completions_url()))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ModelProducer for GatewayClient {
    async fn stream(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        options: SamplingOptions,
    ) -> Result<ChunkStream, ProducerError> {
        check_request(model_id, messages)?;

        let body = CompletionRequest {
            model: model_id,
            messages,
            temperature: Some(options.temperature),
            stream: true,
            max_tokens: options.max_tokens,
        };
        debug!(model = model_id, url = %self.config.completions_url(), "opening completion stream");

        let response = self
            .authorized(self.client.post(self.config.completions_url()))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let response = ensure_success(response).await?;

        Ok(sse_chunks(response.bytes_stream().boxed()))
    }
}

fn transport(e: reqwest::Error) -> ProducerError {
    ProducerError::Transport(e.to_string())
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProducerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|&i| body.is_char_boundary(i))
            .unwrap_or(0);
        body.truncate(cut);
    }
    warn!(status = status.as_u16(), "gateway returned an error status");
    Err(ProducerError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Decoded content of one SSE `data:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Non-empty `choices[0].delta.content`.
    Chunk(String),
    /// `[DONE]` sentinel.
    Done,
}

/// Incremental SSE line decoder for chat-completion streams.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across network reads decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every frame completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<SseFrame, ProducerError>> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();
        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            if let Some(frame) = decode_line(&line[..end]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Decode whatever is left once the body has ended without a newline.
    pub fn finish(&mut self) -> Option<Result<SseFrame, ProducerError>> {
        let line = std::mem::take(&mut self.buffer);
        decode_line(&line)
    }
}

fn decode_line(raw: &[u8]) -> Option<Result<SseFrame, ProducerError>> {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line.trim_end_matches('\r'),
        Err(e) => return Some(Err(ProducerError::MalformedPayload(e.to_string()))),
    };
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }
    if data.trim_end() == "[DONE]" {
        return Some(Ok(SseFrame::Done));
    }

    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return Some(Err(ProducerError::MalformedPayload(e.to_string()))),
    };

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(|| error.to_string());
        return Some(Err(ProducerError::Upstream(message)));
    }

    value
        .pointer("/choices/0/delta/content")
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty())
        .map(|c| Ok(SseFrame::Chunk(c.to_string())))
}

/// Decoding state threaded through [`futures::stream::unfold`].
struct SseStream {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, ProducerError>>,
    finished: bool,
}

impl SseStream {
    /// Queue frames up to the first `[DONE]` or error.
    fn absorb(&mut self, frames: impl IntoIterator<Item = Result<SseFrame, ProducerError>>) {
        for frame in frames {
            match frame {
                Ok(SseFrame::Chunk(text)) => self.pending.push_back(Ok(text)),
                Ok(SseFrame::Done) => {
                    self.finished = true;
                    return;
                }
                Err(e) => {
                    self.pending.push_back(Err(e));
                    self.finished = true;
                    return;
                }
            }
        }
    }
}

/// Turn a raw SSE body into content chunks.
pub fn sse_chunks(body: BoxStream<'static, reqwest::Result<Bytes>>) -> ChunkStream {
    let state = SseStream {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let frames = state.decoder.push(&bytes);
                    state.absorb(frames);
                }
                Some(Err(e)) => {
                    state.pending.push_back(Err(transport(e)));
                    state.finished = true;
                }
                None => {
                    let tail = state.decoder.finish();
                    state.absorb(tail);
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(frames: Vec<Result<SseFrame, ProducerError>>) -> Vec<String> {
        frames
            .into_iter()
            .filter_map(|f| match f {
                Ok(SseFrame::Chunk(c)) => Some(c),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn decodes_delta_content() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
              data: [DONE]\n\n",
        );
        assert_eq!(frames.len(), 3);
        assert_eq!(chunks(frames.clone()), vec!["Hel", "lo"]);
        assert_eq!(frames[2], Ok(SseFrame::Done));
    }

    #[test]
    fn line_split_across_reads() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"choices\":[{\"delta\":").is_empty());
        let frames = decoder.push(b"{\"content\":\"x\"}}]}\r\n");
        assert_eq!(chunks(frames), vec!["x"]);
    }

    #[test]
    fn multibyte_char_split_across_reads() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"•\"}}]}\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xE2).unwrap() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&line[..split]).is_empty());
        assert_eq!(chunks(decoder.push(&line[split..])), vec!["•"]);
    }

    #[test]
    fn role_only_and_empty_deltas_skipped() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(
            b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n\
              data: {\"choices\":[]}\n",
        );
        assert!(frames.is_empty());
    }

    #[test]
    fn comments_and_other_fields_ignored() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keep-alive\nevent: message\nid: 4\n\n");
        assert!(frames.is_empty());
    }

    #[test]
    fn error_object_is_upstream_error() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: {\"error\":{\"message\":\"rate limited\"}}\n");
        assert_eq!(
            frames,
            vec![Err(ProducerError::Upstream("rate limited".into()))]
        );
    }

    #[test]
    fn bad_json_is_malformed_payload() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: {not json\n");
        assert!(matches!(
            frames.as_slice(),
            [Err(ProducerError::MalformedPayload(_))]
        ));
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), Some(Ok(SseFrame::Done)));
        assert_eq!(decoder.finish(), None);
    }

    #[tokio::test]
    async fn stream_stops_at_done() {
        let body: Vec<reqwest::Result<Bytes>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            )),
            Ok(Bytes::from_static(
                b"data: [DONE]\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n",
            )),
        ];
        let out: Vec<_> = sse_chunks(futures::stream::iter(body).boxed()).collect().await;
        assert_eq!(out, vec![Ok("a".to_string())]);
    }

    #[tokio::test]
    async fn chunks_before_error_are_kept() {
        let body: Vec<reqwest::Result<Bytes>> = vec![Ok(Bytes::from_static(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\ndata: oops\n",
        ))];
        let out: Vec<_> = sse_chunks(futures::stream::iter(body).boxed()).collect().await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Ok("a".to_string()));
        assert!(matches!(out[1], Err(ProducerError::MalformedPayload(_))));
    }

    #[test]
    fn request_body_shape() {
        let messages = [ChatMessage::user("hi")];
        let body = CompletionRequest {
            model: "m",
            messages: &messages,
            temperature: Some(0.3),
            stream: true,
            max_tokens: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert!(json.get("max_tokens").is_none());
    }
}
