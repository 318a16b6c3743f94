//! Aggregate relevance scoring for retrieved result sets

use super::overlap::overlap_penalty;
use super::{ScoredResult, SearchResult};
use tracing::warn;

/// Query terms that ask about current conditions the knowledge base can
/// only answer with meteorological content
const WEATHER_QUERY_TERMS: &[&str] = &["weather", "temperature", "forecast"];

/// Content markers that satisfy a weather-flavored query
const WEATHER_CONTENT_TERMS: &[&str] = &[
    "weather",
    "temperature",
    "rain",
    "sunny",
    "cloudy",
    "forecast",
    "celsius",
    "fahrenheit",
];

/// Scale factor when a weather-flavored query finds no weather content
const WEATHER_MISMATCH_PENALTY: f64 = 0.1;

/// Attach overlap-validated scores and dedup keys to raw results
pub fn score_results(results: &[SearchResult], query: &str) -> Vec<ScoredResult> {
    results
        .iter()
        .map(|result| {
            let adjusted = result
                .raw_score()
                .map(|raw| raw * overlap_penalty(query, &result.content).multiplier);
            ScoredResult::new(result.clone(), adjusted)
        })
        .collect()
}

/// Aggregate relevance of a result set for a query, clamped to [0.0, 1.0]
///
/// Each scored result contributes its raw score scaled by the overlap
/// multiplier; results without any score are excluded from the average
/// rather than counted as zero. An empty result set, or one with no scored
/// results, yields 0.0.
pub fn fuse_relevance(results: &[SearchResult], query: &str) -> f64 {
    if results.is_empty() {
        return 0.0;
    }

    let adjusted: Vec<f64> = score_results(results, query)
        .into_iter()
        .filter_map(|scored| scored.adjusted_score)
        .collect();

    if adjusted.is_empty() {
        return 0.0;
    }

    let mut score = adjusted.iter().sum::<f64>() / adjusted.len() as f64;

    let query_lower = query.to_lowercase();
    if WEATHER_QUERY_TERMS
        .iter()
        .any(|term| query_lower.contains(term))
    {
        let has_weather_content = results.iter().any(|result| {
            let content_lower = result.content.to_lowercase();
            WEATHER_CONTENT_TERMS
                .iter()
                .any(|term| content_lower.contains(term))
        });

        if !has_weather_content {
            warn!(
                "Weather-flavored query '{}' found no weather content, penalizing relevance",
                query
            );
            score *= WEATHER_MISMATCH_PENALTY;
        }
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(content: &str, score: Option<f64>) -> SearchResult {
        SearchResult::new(content, "test.md", score)
    }

    #[test]
    fn test_empty_results_score_zero() {
        assert_eq!(fuse_relevance(&[], "any question"), 0.0);
    }

    #[test]
    fn test_scoreless_results_are_excluded() {
        let results = vec![
            result("bell palsy causes facial weakness", Some(0.8)),
            result("bell palsy treatment options", None),
        ];

        // Only the scored result participates: 0.8 * 1.0
        let score = fuse_relevance(&results, "bell palsy");
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_all_scoreless_results_score_zero() {
        let results = vec![result("some content", None), result("other content", None)];
        assert_eq!(fuse_relevance(&results, "a question"), 0.0);
    }

    #[test]
    fn test_low_overlap_penalizes_score() {
        let results = vec![result("recipe for sourdough bread", Some(0.9))];

        // Zero overlap: 0.9 * 0.2
        let score = fuse_relevance(&results, "quantum computing basics");
        assert!((score - 0.18).abs() < 1e-9);
    }

    #[test]
    fn test_metadata_score_fallback() {
        let mut r = result("bell palsy overview", None);
        r.metadata = serde_json::json!({ "score": 0.6 });

        let score = fuse_relevance(&[r], "bell palsy");
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_weather_query_without_weather_content() {
        let results = vec![result("bell palsy overview and treatment", Some(0.9))];

        let score = fuse_relevance(&results, "what's the weather like");
        // Zero overlap and weather mismatch both apply: 0.9 * 0.2 * 0.1
        assert!((score - 0.018).abs() < 1e-9);
    }

    #[test]
    fn test_weather_query_with_weather_content() {
        let results = vec![result(
            "today the weather forecast shows rain and low temperature",
            Some(0.8),
        )];

        let score = fuse_relevance(&results, "weather forecast today");
        // All three query tokens appear in the content, no penalty
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_score_clamped_to_one() {
        let results = vec![result("bell palsy facts", Some(1.7))];
        let score = fuse_relevance(&results, "bell palsy facts");
        assert_eq!(score, 1.0);
    }
}
