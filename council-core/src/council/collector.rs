//! Concurrent response collector: JoinSet fan-out, mpsc fan-in.
//!
//! ```text
//!                 ┌─ member task 0 ─┐
//! collect(query) ─┼─ member task 1 ─┼─▶ mpsc (slot, event) ─▶ drain ─▶ EventEmitter
//!                 └─ member task N ─┘
//! ```
//!
//! Each member task owns a clone of the fan-in sender. The drain loop ends
//! when `recv()` returns `None`, which only happens once every task has
//! dropped its sender *and* the queue is empty, so no event can slip in
//! after the collector decides it is done. Tasks are then joined; a task
//! that died without reporting is surfaced as `model_error` exactly once.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{CollectionOutcome, ModelFailure, ModelResponseResult};
use crate::config::CouncilConfig;
use crate::errors::ProducerError;
use crate::events::{DebateEvent, EventEmitter};
use crate::producer::{ChatMessage, ModelProducer, SamplingOptions};
use crate::store::{SessionId, SharedDecisionStore};

/// Event tagged with the council slot that produced it.
type SlotEvent = (usize, DebateEvent);

/// Where a slot is in its `start → chunk* → terminal` sequence, as seen by the drain loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotProgress {
    Pending,
    Started,
    Finished,
}

/// What a member task hands back when it returns normally.
#[derive(Debug)]
struct MemberReport {
    slot: usize,
    outcome: Result<ModelResponseResult, String>,
}

/// Everything a member task needs, cloned per task.
#[derive(Clone)]
struct MemberContext {
    producer: Arc<dyn ModelProducer>,
    store: SharedDecisionStore,
    session_id: SessionId,
    query: Arc<str>,
    options: SamplingOptions,
    events: mpsc::UnboundedSender<SlotEvent>,
    cancel: CancellationToken,
    permits: Option<Arc<Semaphore>>,
}

/// Fans one query out to every council member and merges their output.
pub struct ResponseCollector {
    producer: Arc<dyn ModelProducer>,
    store: SharedDecisionStore,
    options: SamplingOptions,
    max_concurrent: Option<usize>,
}

impl ResponseCollector {
    pub fn new(
        producer: Arc<dyn ModelProducer>,
        store: SharedDecisionStore,
        config: &CouncilConfig,
    ) -> Self {
        Self {
            producer,
            store,
            options: SamplingOptions {
                temperature: config.council_temperature,
                max_tokens: config.max_tokens,
            },
            max_concurrent: config.max_concurrent_members,
        }
    }

    /// Query every member concurrently, forwarding their events to `emitter`
    /// as they arrive. Returns once every member has finished.
    pub async fn collect(
        &self,
        session_id: SessionId,
        query: &str,
        members: &[String],
        emitter: &EventEmitter,
        cancel: &CancellationToken,
    ) -> CollectionOutcome {
        info!(
            session_id,
            members = members.len(),
            cap = ?self.max_concurrent,
            "fanning query out to council"
        );

        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<SlotEvent>();
        let ctx = MemberContext {
            producer: self.producer.clone(),
            store: self.store.clone(),
            session_id,
            query: Arc::from(query),
            options: self.options,
            events: events_tx,
            cancel: cancel.clone(),
            // Tokio semaphores are FIFO, so a capped council still serves members in order.
            permits: self.max_concurrent.map(|n| Arc::new(Semaphore::new(n))),
        };

        let mut join_set: JoinSet<MemberReport> = JoinSet::new();
        for (slot, model_id) in members.iter().enumerate() {
            join_set.spawn(run_member(ctx.clone(), slot, model_id.clone()));
        }
        // Only the member tasks hold senders from here on.
        drop(ctx);

        let mut progress = vec![SlotProgress::Pending; members.len()];
        while let Some((slot, event)) = events_rx.recv().await {
            match event {
                DebateEvent::ModelStart { .. } => progress[slot] = SlotProgress::Started,
                ref e if e.is_model_terminal() => progress[slot] = SlotProgress::Finished,
                _ => {}
            }
            emitter.emit(event);
        }

        let mut reports: Vec<Option<MemberReport>> = (0..members.len()).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(report) => {
                    let slot = report.slot;
                    reports[slot] = Some(report);
                }
                Err(e) => warn!(session_id, error = %e, "council member task died"),
            }
        }

        let mut outcome = CollectionOutcome::default();
        for (slot, model_id) in members.iter().enumerate() {
            match reports[slot].take() {
                Some(MemberReport {
                    outcome: Ok(response),
                    ..
                }) => outcome.responses.push(response),
                Some(MemberReport {
                    outcome: Err(error),
                    ..
                }) => outcome.failures.push(ModelFailure {
                    model_id: model_id.clone(),
                    error,
                }),
                None => {
                    let error = "member task terminated unexpectedly".to_string();
                    surface_lost_member(emitter, model_id, &error, progress[slot]);
                    outcome.failures.push(ModelFailure {
                        model_id: model_id.clone(),
                        error,
                    });
                }
            }
        }
        outcome.cancelled = cancel.is_cancelled();

        info!(
            session_id,
            succeeded = outcome.responses.len(),
            failed = outcome.failures.len(),
            cancelled = outcome.cancelled,
            "council collection finished"
        );
        outcome
    }
}

/// Emit whatever a dead member still owes the caller so its sequence is complete.
fn surface_lost_member(
    emitter: &EventEmitter,
    model_id: &str,
    error: &str,
    progress: SlotProgress,
) {
    if progress == SlotProgress::Finished {
        return;
    }
    if progress == SlotProgress::Pending {
        emitter.emit(DebateEvent::ModelStart {
            model_id: model_id.to_string(),
        });
    }
    emitter.emit(DebateEvent::ModelError {
        model_id: model_id.to_string(),
        error: error.to_string(),
    });
}

/// One council member: start, stream, persist, report.
async fn run_member(ctx: MemberContext, slot: usize, model_id: String) -> MemberReport {
    let send = |event: DebateEvent| {
        // The collector keeps the receiver alive until every member returns.
        let _ = ctx.events.send((slot, event));
    };
    let fail = |error: String| {
        send(DebateEvent::ModelError {
            model_id: model_id.clone(),
            error: error.clone(),
        });
        MemberReport {
            slot,
            outcome: Err(error),
        }
    };

    let _permit = match &ctx.permits {
        Some(permits) => {
            let acquired = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => None,
                permit = permits.clone().acquire_owned() => permit.ok(),
            };
            if acquired.is_none() {
                send(DebateEvent::ModelStart {
                    model_id: model_id.clone(),
                });
                return fail(ProducerError::Cancelled.to_string());
            }
            acquired
        }
        None => None,
    };

    send(DebateEvent::ModelStart {
        model_id: model_id.clone(),
    });
    debug!(model = %model_id, slot, "council member started");

    let started = Instant::now();
    let streamed = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => Err(ProducerError::Cancelled),
        streamed = stream_member(&ctx, &model_id, &send) => streamed,
    };

    let (text, chunk_count) = match streamed {
        Ok(done) => done,
        Err(e) => {
            warn!(model = %model_id, slot, error = %e, "council member failed");
            return fail(e.to_string());
        }
    };

    let response = ModelResponseResult {
        model_id: model_id.clone(),
        text,
        chunk_count,
        elapsed: started.elapsed(),
    };

    if let Err(e) = ctx.store.append_response(ctx.session_id, &response).await {
        warn!(model = %model_id, slot, error = %e, "failed to store council response");
        return fail(format!("failed to store response: {e}"));
    }

    send(DebateEvent::model_complete(&response));
    debug!(
        model = %model_id,
        slot,
        chunks = response.chunk_count,
        elapsed_ms = response.elapsed.as_millis() as u64,
        "council member complete"
    );
    MemberReport {
        slot,
        outcome: Ok(response),
    }
}

/// Drain one producer stream, forwarding each chunk as it arrives.
async fn stream_member(
    ctx: &MemberContext,
    model_id: &str,
    send: &impl Fn(DebateEvent),
) -> Result<(String, u64), ProducerError> {
    let messages = [ChatMessage::user(ctx.query.as_ref())];
    let mut chunks = ctx.producer.stream(model_id, &messages, ctx.options).await?;

    let mut text = String::new();
    let mut count = 0u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        text.push_str(&chunk);
        count += 1;
        send(DebateEvent::ModelChunk {
            model_id: model_id.to_string(),
            chunk,
        });
    }
    Ok((text, count))
}
