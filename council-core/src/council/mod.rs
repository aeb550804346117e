//! Council round: fan-out to members, chairman synthesis, synthesis parsing.
//!
//! - [`collector`]: one task per council member, events merged into one stream
//! - [`synthesis`]: chairman prompt + non-streaming call
//! - [`parser`]: chairman text → [`SynthesisResult`]

pub mod collector;
pub mod parser;
pub mod synthesis;
pub mod types;

pub use collector::ResponseCollector;
pub use parser::parse_synthesis;
pub use synthesis::{build_synthesis_prompt, SynthesisDriver};
pub use types::{
    CollectionOutcome, DebatePoint, ModelFailure, ModelResponseResult, SynthesisResult,
};
