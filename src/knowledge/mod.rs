//! Local knowledge base
//!
//! Documents live in a flat JSON store alongside their embeddings; search
//! is a cosine scan over the stored vectors. The [`Retriever`] trait is
//! the seam the pipeline depends on.

mod scan;
mod store;

pub use scan::{ingest_directory, scan_directory, IngestSummary, ScannedDocument};
pub use store::{cosine_similarity, KnowledgeStore, StoredDocument};

use crate::embedding::EmbeddingError;
use crate::relevance::SearchResult;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed store file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unsupported store version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("Failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// Retrieval collaborator
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Top matching results for a query
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>, StoreError>;

    /// Number of stored documents
    async fn document_count(&self) -> usize;
}

/// Whether the knowledge base holds anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreState {
    Ready,
    Empty,
}

/// Health summary of the knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeStatus {
    pub status: StoreState,
    pub document_count: usize,
    /// Day the status was taken, YYYY-MM-DD
    pub last_updated: String,
}

impl KnowledgeStatus {
    pub fn from_count(count: usize) -> Self {
        Self {
            status: if count > 0 {
                StoreState::Ready
            } else {
                StoreState::Empty
            },
            document_count: count,
            last_updated: Utc::now().format("%Y-%m-%d").to_string(),
        }
    }
}
