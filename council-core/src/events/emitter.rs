//! Outward event channel for a single debate
//!
//! Unbounded Tokio mpsc: producers never block on a slow consumer, and a
//! dropped receiver (client went away) cancels the debate.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::types::DebateEvent;

/// Receiving half handed to the debate's caller
pub type EventReceiver = mpsc::UnboundedReceiver<DebateEvent>;

/// Sending half used by the session manager and the collector
#[derive(Clone)]
pub struct EventEmitter {
    sender: mpsc::UnboundedSender<DebateEvent>,
    cancel: CancellationToken,
}

impl EventEmitter {
    /// Create an emitter/receiver pair bound to `cancel`
    pub fn channel(cancel: CancellationToken) -> (Self, EventReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender, cancel }, receiver)
    }

    /// Send an event to the caller.
    ///
    /// Returns `false` once the receiver is gone; the first such failure
    /// cancels the debate so in-flight producers stop.
    pub fn emit(&self, event: DebateEvent) -> bool {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(()) => {
                trace!(event_type, "Event emitted");
                true
            }
            Err(_) => {
                if !self.cancel.is_cancelled() {
                    debug!(event_type, "Event receiver dropped, cancelling debate");
                    self.cancel.cancel();
                }
                false
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emitted_events_arrive_in_order() {
        let (emitter, mut rx) = EventEmitter::channel(CancellationToken::new());
        assert!(emitter.emit(DebateEvent::error("first")));
        assert!(emitter.emit(DebateEvent::error("second")));
        drop(emitter);

        assert_eq!(rx.recv().await, Some(DebateEvent::error("first")));
        assert_eq!(rx.recv().await, Some(DebateEvent::error("second")));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn dropped_receiver_cancels() {
        let cancel = CancellationToken::new();
        let (emitter, rx) = EventEmitter::channel(cancel.clone());
        drop(rx);

        assert!(!emitter.emit(DebateEvent::error("lost")));
        assert!(cancel.is_cancelled());
    }
}
