//! Scripted in-process producer shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};

use council_core::events::DebateEvent;
use council_core::{ChatMessage, ChunkStream, ModelProducer, ProducerError, SamplingOptions};

/// How one model behaves when called.
#[derive(Debug, Clone)]
pub enum Script {
    /// Yield each chunk, sleeping `delay` before every one.
    Reply { chunks: Vec<String>, delay: Duration },
    /// Reject the call before any chunk.
    FailImmediately(ProducerError),
    /// Yield some chunks, then fail.
    FailAfter {
        chunks: Vec<String>,
        error: ProducerError,
    },
    /// Never yield anything.
    Hang,
}

impl Script {
    pub fn reply(chunks: &[&str]) -> Self {
        Self::Reply {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            delay: Duration::ZERO,
        }
    }

    pub fn slow(chunks: &[&str], delay: Duration) -> Self {
        Self::Reply {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            delay,
        }
    }

    pub fn fail(message: &str) -> Self {
        Self::FailImmediately(ProducerError::Transport(message.to_string()))
    }
}

/// Producer whose every model follows a fixed [`Script`].
#[derive(Default)]
pub struct ScriptedProducer {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<(String, Vec<ChatMessage>, SamplingOptions)>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ScriptedProducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, model_id: &str, script: Script) -> Self {
        self.scripts.insert(model_id.to_string(), script);
        self
    }

    /// Every call made, in call order.
    pub fn calls(&self) -> Vec<(String, Vec<ChatMessage>, SamplingOptions)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, model_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _, _)| m == model_id)
            .count()
    }

    /// Most streams that were open at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the active counter when the stream is dropped.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ModelProducer for ScriptedProducer {
    async fn stream(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        options: SamplingOptions,
    ) -> Result<ChunkStream, ProducerError> {
        self.calls
            .lock()
            .unwrap()
            .push((model_id.to_string(), messages.to_vec(), options));

        let script = self
            .scripts
            .get(model_id)
            .cloned()
            .unwrap_or_else(|| {
                Script::FailImmediately(ProducerError::Upstream(format!(
                    "unknown model {model_id}"
                )))
            });

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let guard = Arc::new(ActiveGuard(self.active.clone()));

        match script {
            Script::FailImmediately(e) => Err(e),
            Script::Reply { chunks, delay } => Ok(stream::iter(chunks)
                .then(move |chunk| {
                    let guard = guard.clone();
                    async move {
                        let _guard = guard;
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        Ok(chunk)
                    }
                })
                .boxed()),
            Script::FailAfter { chunks, error } => {
                let items: Vec<Result<String, ProducerError>> = chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(error)))
                    .collect();
                Ok(stream::iter(items)
                    .map(move |item| {
                        let _guard = guard.clone();
                        item
                    })
                    .boxed())
            }
            Script::Hang => Ok(stream::pending()
                .map(move |item: Result<String, ProducerError>| {
                    let _guard = guard.clone();
                    item
                })
                .boxed()),
        }
    }
}

pub fn members(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

pub fn count(events: &[DebateEvent], event_type: &str) -> usize {
    events
        .iter()
        .filter(|e| e.event_type() == event_type)
        .count()
}

pub fn position(events: &[DebateEvent], event_type: &str) -> Option<usize> {
    events.iter().position(|e| e.event_type() == event_type)
}

/// Every member slot must see `model_start`, then chunks, then exactly one terminal event.
///
/// Events for the same model id are matched to slots in start order.
pub fn assert_member_sequences(events: &[DebateEvent], council: &[String]) {
    let mut open: HashMap<&str, usize> = HashMap::new();
    let mut finished: HashMap<&str, usize> = HashMap::new();

    for event in events {
        match event {
            DebateEvent::ModelStart { model_id } => {
                *open.entry(model_id.as_str()).or_default() += 1;
            }
            DebateEvent::ModelChunk { model_id, .. } => {
                let opened = open.get(model_id.as_str()).copied().unwrap_or(0);
                let done = finished.get(model_id.as_str()).copied().unwrap_or(0);
                assert!(opened > done, "chunk for {model_id} outside start/terminal");
            }
            DebateEvent::ModelComplete { model_id, .. }
            | DebateEvent::ModelError { model_id, .. } => {
                let opened = open.get(model_id.as_str()).copied().unwrap_or(0);
                let done = finished.entry(model_id.as_str()).or_default();
                *done += 1;
                assert!(*done <= opened, "terminal for {model_id} without start");
            }
            _ => {}
        }
    }

    let mut expected: HashMap<&str, usize> = HashMap::new();
    for m in council {
        *expected.entry(m.as_str()).or_default() += 1;
    }
    for (model, n) in expected {
        assert_eq!(open.get(model).copied().unwrap_or(0), n, "starts for {model}");
        assert_eq!(finished.get(model).copied().unwrap_or(0), n, "terminals for {model}");
    }
}
