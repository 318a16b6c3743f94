//! JSON-persisted vector store

use super::{KnowledgeStatus, Retriever, StoreError};
use crate::embedding::EmbeddingProvider;
use crate::relevance::SearchResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// On-disk envelope version
const STORE_VERSION: u32 = 1;

/// A stored document with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub content: String,
    pub source: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreEnvelope {
    version: u32,
    model: String,
    dimension: usize,
    updated_at: DateTime<Utc>,
    documents: Vec<StoredDocument>,
}

/// Flat vector store persisted as a single JSON file
pub struct KnowledgeStore {
    path: PathBuf,
    provider: Arc<dyn EmbeddingProvider>,
    documents: RwLock<Vec<StoredDocument>>,
}

impl KnowledgeStore {
    /// Open a store file, starting empty when none exists
    pub fn open(
        path: impl Into<PathBuf>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, StoreError> {
        let path = path.into();

        let documents = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|e| StoreError::Read {
                path: path.clone(),
                source: e,
            })?;
            let envelope: StoreEnvelope =
                serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                    path: path.clone(),
                    source: e,
                })?;
            if envelope.version != STORE_VERSION {
                return Err(StoreError::Version {
                    found: envelope.version,
                    expected: STORE_VERSION,
                });
            }
            debug!(
                "Loaded {} documents from {}",
                envelope.documents.len(),
                path.display()
            );
            envelope.documents
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            provider,
            documents: RwLock::new(documents),
        })
    }

    /// Embed and add one document, replacing any previous version of the
    /// same content
    pub async fn add_document(
        &self,
        content: &str,
        source: &str,
        metadata: serde_json::Value,
    ) -> Result<String, StoreError> {
        let embedding = self.provider.embed(content).await?;
        let id = blake3::hash(content.as_bytes()).to_hex().to_string();

        let document = StoredDocument {
            id: id.clone(),
            content: content.to_string(),
            source: source.to_string(),
            embedding,
            metadata,
        };

        let mut documents = self.documents.write().await;
        if let Some(existing) = documents.iter_mut().find(|d| d.id == id) {
            *existing = document;
        } else {
            documents.push(document);
        }

        Ok(id)
    }

    /// Persist the current documents to disk
    pub async fn save(&self) -> Result<(), StoreError> {
        let documents = self.documents.read().await;
        let envelope = StoreEnvelope {
            version: STORE_VERSION,
            model: self.provider.model_name().to_string(),
            dimension: self.provider.dimension(),
            updated_at: Utc::now(),
            documents: documents.clone(),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Write {
                path: self.path.clone(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(&envelope)?;
        std::fs::write(&self.path, json).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: e,
        })?;

        debug!("Saved {} documents to {}", documents.len(), self.path.display());
        Ok(())
    }

    /// Current health summary
    pub async fn status(&self) -> KnowledgeStatus {
        KnowledgeStatus::from_count(self.documents.read().await.len())
    }
}

#[async_trait]
impl Retriever for KnowledgeStore {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>, StoreError> {
        let query_embedding = self.provider.embed(query).await?;
        let documents = self.documents.read().await;

        let mut scored: Vec<(f32, &StoredDocument)> = documents
            .iter()
            .map(|doc| (cosine_similarity(&query_embedding, &doc.embedding), doc))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, doc)| {
                let mut result =
                    SearchResult::new(doc.content.clone(), doc.source.clone(), Some(score as f64));
                result.metadata = serde_json::json!({ "source": doc.source, "id": doc.id });
                result
            })
            .collect())
    }

    async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }
}

/// Cosine similarity; 0.0 for mismatched dimensions or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
