//! Generation and scoring collaborators
//!
//! Both collaborators speak to OpenAI-compatible HTTP endpoints. The traits
//! are the seams the rest of the crate depends on; tests substitute stubs.

mod generator;
mod scorer;

pub use generator::{GenerationError, Generator, HttpGenerator};
pub use scorer::{ContextPrecisionScorer, LlmContextPrecision};
