//! Keyword-overlap validation between a query and result content

use ahash::AHashSet;

/// Overlap ratio below which the severe penalty applies
const LOW_OVERLAP_RATIO: f64 = 0.1;

/// Overlap ratio below which the moderate penalty applies
const PARTIAL_OVERLAP_RATIO: f64 = 0.3;

/// Multiplier for content sharing almost no keywords with the query
const SEVERE_PENALTY: f64 = 0.2;

/// Multiplier for content sharing only some keywords with the query
const MODERATE_PENALTY: f64 = 0.5;

/// Result of validating content against query keywords
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapPenalty {
    /// Fraction of query tokens present in the content
    pub ratio: f64,

    /// Scale factor to apply to the raw score
    pub multiplier: f64,
}

/// Lowercased whitespace tokens as a set
pub(crate) fn tokenize(text: &str) -> AHashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Compute the overlap penalty for a (query, content) pair
///
/// The ratio is the share of query tokens found in the content, over
/// lowercased whitespace tokens. An empty query yields ratio 0.0. The
/// multiplier is monotonic non-decreasing in the ratio.
pub fn overlap_penalty(query: &str, content: &str) -> OverlapPenalty {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return OverlapPenalty {
            ratio: 0.0,
            multiplier: SEVERE_PENALTY,
        };
    }

    let content_tokens = tokenize(content);
    let overlap = query_tokens.intersection(&content_tokens).count();
    let ratio = overlap as f64 / query_tokens.len() as f64;

    let multiplier = if ratio < LOW_OVERLAP_RATIO {
        SEVERE_PENALTY
    } else if ratio < PARTIAL_OVERLAP_RATIO {
        MODERATE_PENALTY
    } else {
        1.0
    };

    OverlapPenalty { ratio, multiplier }
}
