//! Outward event stream of a debate
//!
//! # Ordering
//!
//! ```text
//! debate_start
//!   ├─ model_start(a) → model_chunk(a)* → model_complete(a) | model_error(a)
//!   ├─ model_start(b) → model_chunk(b)* → model_complete(b) | model_error(b)
//!   │      (members interleave freely; each member's own sequence is total)
//!   ├─ error                                  ← too few successes: stop here
//!   └─ synthesis_start → synthesis_complete | synthesis_error
//! debate_complete
//! ```

pub mod emitter;
pub mod types;

pub use emitter::{EventEmitter, EventReceiver};
pub use types::DebateEvent;
