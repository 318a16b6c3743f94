//! Relevance-scored retrieval reporting
//!
//! This module turns raw retrieval results into an emitted report: overlap
//! validation of scores, aggregate relevance fusion, content-prefix
//! deduplication and the two render contracts (compact entries and the
//! Score/Content block consumed by chunk evaluation).

mod dedup;
mod fusion;
mod overlap;

pub use dedup::{build_report, content_key, dedup_results, DEDUP_PREFIX_CHARS, VALIDATION_NOTE};
pub use fusion::{fuse_relevance, score_results};
pub use overlap::{overlap_penalty, OverlapPenalty};

pub(crate) use overlap::tokenize;

use crate::error::{Result, SiftError};
use serde::{Deserialize, Serialize};

/// A raw result returned by a retrieval collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result text
    pub content: String,

    /// Origin label (document path or collection name)
    pub source: String,

    /// Similarity score when the backend provides one
    pub score: Option<f64>,

    /// Free-form backend metadata
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl SearchResult {
    pub fn new(content: impl Into<String>, source: impl Into<String>, score: Option<f64>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            score,
            metadata: serde_json::Value::Null,
        }
    }

    /// Effective raw score: the result's own score, else a numeric `score`
    /// key inside its metadata
    pub fn raw_score(&self) -> Option<f64> {
        self.score
            .or_else(|| self.metadata.get("score").and_then(|v| v.as_f64()))
    }
}

/// A search result with its overlap-validated score and dedup key attached
#[derive(Debug, Clone)]
pub struct ScoredResult {
    pub result: SearchResult,

    /// Raw score scaled by the overlap multiplier; `None` when the result
    /// carried no score anywhere
    pub adjusted_score: Option<f64>,

    /// Hash of the leading characters of the content, used as dedup key
    pub content_hash: u64,
}

impl ScoredResult {
    pub fn new(result: SearchResult, adjusted_score: Option<f64>) -> Self {
        let content_hash = content_key(&result.content);
        Self {
            result,
            adjusted_score,
            content_hash,
        }
    }
}

/// Compact report entry for one surviving result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub source: String,
    pub content: String,
    pub score: f64,
}

/// Emitted search report
///
/// Serialized field names and their order are a compatibility contract;
/// downstream consumers parse this JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceReport {
    /// Compact entries, at most the requested top-k
    pub results: Vec<ReportEntry>,

    /// Aggregate relevance in [0.0, 1.0]
    pub relevance_score: f64,

    /// Count of unique results after dedup, before top-k truncation
    pub total_results: usize,

    /// How many duplicates the dedup pass removed
    pub duplicates_removed: usize,

    /// The query the report answers
    pub query: String,

    /// Fixed note explaining how the relevance score was derived
    pub validation_note: String,

    /// Score/Content block for the chunk-relevance evaluator
    pub formatted_for_evaluation: String,
}

impl RelevanceReport {
    /// Pretty-printed JSON wrapped in the search-results envelope used as
    /// generation context
    pub fn to_wrapped_json(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(self).map_err(|e| SiftError::Json {
            source: e,
            context: "serializing relevance report".to_string(),
        })?;
        Ok(format!("<search_results>\n{}\n</search_results>", json))
    }
}
