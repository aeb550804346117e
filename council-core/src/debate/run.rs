//! Handle to a spawned debate.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::session::DebateOutcome;
use crate::events::{DebateEvent, EventReceiver};

/// A running debate: a stream of its events plus its final outcome.
///
/// Dropping the handle cancels the debate.
pub struct DebateRun {
    events: EventReceiver,
    cancel: CancellationToken,
    handle: JoinHandle<DebateOutcome>,
    guard: DropGuard,
}

impl DebateRun {
    pub(crate) fn new(
        events: EventReceiver,
        cancel: CancellationToken,
        handle: JoinHandle<DebateOutcome>,
    ) -> Self {
        let guard = cancel.clone().drop_guard();
        Self {
            events,
            cancel,
            handle,
            guard,
        }
    }

    /// Ask the debate to stop. In-flight members end with `model_error("cancelled")`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Discard any remaining events and wait for the run to finish.
    pub async fn outcome(self) -> Result<DebateOutcome, JoinError> {
        self.collect_events().await.map(|(_, outcome)| outcome)
    }

    /// Gather every remaining event, then the outcome.
    pub async fn collect_events(self) -> Result<(Vec<DebateEvent>, DebateOutcome), JoinError> {
        let Self {
            mut events,
            cancel: _,
            handle,
            guard,
        } = self;

        let mut collected = Vec::new();
        // Closes once the run task drops its emitter.
        while let Some(event) = events.recv().await {
            collected.push(event);
        }
        let outcome = handle.await;
        guard.disarm();
        Ok((collected, outcome?))
    }
}

impl Stream for DebateRun {
    type Item = DebateEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}
