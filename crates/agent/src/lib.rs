//! # Valet Agent
//!
//! The agent orchestration core: the component that turns one user message
//! into a sequence of model calls, tool dispatches, and streamed progress
//! events, while enforcing a token budget, a step budget, a wall-clock
//! timeout, loop prevention, and pre-execution validation of proposed
//! actions.
//!
//! The pieces, leaves first:
//!
//! - [`context`]: assembles a token-bounded message window per model call
//! - [`loop_detector`]: flags repeats, short cycles, and excessive
//!   repetition of a canonicalized action
//! - [`validator`]: schema-driven gate rejecting malformed, unknown,
//!   dangerous, or redundant actions before execution
//! - [`parser`]: extracts a proposed action from free-text model output
//! - [`sanitize`]: caps and scrubs tool observations before they re-enter
//!   the context
//! - [`turn`]: the driver loop wiring all of the above to the model
//!   endpoint and the tool dispatcher, streaming [`StepEvent`]s throughout

pub mod context;
pub mod loop_detector;
pub mod parser;
pub mod sanitize;
pub mod stream_event;
pub mod turn;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::{ContextBuilder, ContextInput};
pub use loop_detector::{LoopDetector, LoopReason};
pub use parser::Extraction;
pub use stream_event::StepEvent;
pub use turn::{TurnRequest, TurnRunner};
pub use validator::{ActionValidator, Rejection};
