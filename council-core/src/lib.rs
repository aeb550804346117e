//! LLM Council Debate Engine
//!
//! This library provides:
//! - Concurrent fan-out of one query to a council of models, streamed as ordered events
//! - Partial-failure policy: synthesis only when enough members answered
//! - Chairman synthesis parsed into consensus, debates, and a final statement
//! - A Decision Store recording every response and synthesis per session
//!
//! # Components
//!
//! - [`producer`]: the `ModelProducer` seam every model call goes through
//! - [`council`]: response collector, synthesis driver, synthesis parser
//! - [`debate`]: session manager, phase state machine, run handle
//! - [`events`]: the outward event vocabulary and its channel
//! - [`store`]: in-memory and JSON-file Decision Stores
//!
//! # Usage
//!
//! ```ignore
//! let manager = DebateSessionManager::new(producer, store, CouncilConfig::from_env());
//! let mut run = manager.start(DebateRequest::new(
//!     "Should we shard the cache?",
//!     vec!["model-a".into(), "model-b".into()],
//!     "model-c",
//! ));
//! while let Some(event) = run.next().await {
//!     print!("{}", event.to_sse());
//! }
//! ```

pub mod config;
pub mod council;
pub mod debate;
pub mod errors;
pub mod events;
pub mod producer;
pub mod store;

pub use config::CouncilConfig;
pub use debate::{DebateOutcome, DebateRequest, DebateRun, DebateSessionManager, SessionPhase};
pub use errors::{DebateError, ProducerError, StoreError, SynthesisError, ValidationError};
pub use events::{DebateEvent, EventEmitter};
pub use producer::{ChatMessage, ChunkStream, ModelProducer, SamplingOptions};
pub use store::{
    DecisionRecord, DecisionStore, DecisionSummary, FileDecisionStore, MemoryDecisionStore,
    SessionId, SharedDecisionStore,
};
