//! Text embedding against an OpenAI-compatible endpoint

mod provider;

pub use provider::{
    fallback_embedding, normalize, resize_embedding, EmbeddingError, EmbeddingProvider,
    HttpEmbeddingProvider,
};
