//! Context window assembly.

pub mod builder;
pub mod token;

pub use builder::{ContextBuilder, ContextInput, coalesce, normalize_history};
