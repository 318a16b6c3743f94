//! Sift - Relevance-Gated Retrieval and Answer Routing
//!
//! Searches a local embedded knowledge base, scores how well the retrieved
//! chunks actually cover a question, and routes the question to the local
//! knowledge base or to external web search based on that verdict.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod evaluation;
pub mod knowledge;
pub mod llm;
pub mod pipeline;
pub mod relevance;
pub mod routing;
pub mod tools;

pub use error::{Result, SiftError};
