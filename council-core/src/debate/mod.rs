//! Debate sessions: request validation, phase tracking, and the run handle.
//!
//! # Session Flow
//!
//! ```text
//! Created → Collecting → Synthesizing → Completed
//!   │           │              └──────→ SynthesisFailed
//!   │           └─ too few responses / cancelled → Aborted
//!   └─ store unavailable → Aborted
//! ```

pub mod run;
pub mod session;
pub mod state;

pub use run::DebateRun;
pub use session::{DebateOutcome, DebateRequest, DebateSessionManager, MIN_COUNCIL_SIZE};
pub use state::{DebateSession, PhaseTransition, SessionPhase, TransitionError};
