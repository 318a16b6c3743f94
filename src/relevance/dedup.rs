//! Content-prefix deduplication and report rendering

use super::fusion::{fuse_relevance, score_results};
use super::{RelevanceReport, ReportEntry, ScoredResult, SearchResult};
use ahash::{AHashSet, AHasher};
use std::hash::{Hash, Hasher};
use tracing::{debug, info};

/// Number of leading characters that form the dedup key
pub const DEDUP_PREFIX_CHARS: usize = 100;

/// Longest content echoed into a compact report entry
const ENTRY_CONTENT_CHARS: usize = 200;

/// Relevance below which the top entries are logged for inspection
const LOW_RELEVANCE_DEBUG: f64 = 0.3;

/// Fixed note carried by every report
pub const VALIDATION_NOTE: &str =
    "Relevance score includes content validation to prevent false positives";

/// Dedup key for result content
///
/// Hashes the first [`DEDUP_PREFIX_CHARS`] characters (not bytes) of the
/// content. Case-sensitive.
pub fn content_key(content: &str) -> u64 {
    let end = content
        .char_indices()
        .nth(DEDUP_PREFIX_CHARS)
        .map(|(idx, _)| idx)
        .unwrap_or(content.len());

    let mut hasher = AHasher::default();
    content[..end].hash(&mut hasher);
    hasher.finish()
}

/// Deduplicate results by content key, keeping the earliest occurrence
///
/// Input order is preserved for the survivors.
pub fn dedup_results(results: Vec<ScoredResult>) -> Vec<ScoredResult> {
    let mut seen: AHashSet<u64> = AHashSet::new();

    results
        .into_iter()
        .filter(|scored| seen.insert(scored.content_hash))
        .collect()
}

/// Build the emitted report for a query's raw results
///
/// Relevance is computed over the original slice. Duplicates are then
/// removed by content key and the surviving head of the list is rendered
/// both as compact entries and as the Score/Content block consumed by
/// chunk evaluation.
pub fn build_report(results: &[SearchResult], query: &str, top_k: usize) -> RelevanceReport {
    let relevance_score = fuse_relevance(results, query);

    let scored = score_results(results, query);
    let original_len = scored.len();
    let deduped = dedup_results(scored);
    let duplicates_removed = original_len - deduped.len();
    let total_results = deduped.len();

    let top = &deduped[..deduped.len().min(top_k)];

    let mut formatted_for_evaluation = String::new();
    for scored in top {
        let score = scored.result.raw_score().unwrap_or(0.0);
        formatted_for_evaluation.push_str(&format!(
            "Score: {}\nContent: {}\n\n",
            score, scored.result.content
        ));
    }

    let entries: Vec<ReportEntry> = top
        .iter()
        .map(|scored| ReportEntry {
            source: scored.result.source.clone(),
            content: truncate_content(&scored.result.content),
            score: scored.result.raw_score().unwrap_or(0.0),
        })
        .collect();

    info!(
        "Knowledge search completed: {} unique results ({} duplicates removed), relevance {:.2}",
        total_results, duplicates_removed, relevance_score
    );

    if relevance_score < LOW_RELEVANCE_DEBUG {
        let previews: Vec<String> = deduped
            .iter()
            .take(2)
            .map(|scored| scored.result.content.chars().take(50).collect())
            .collect();
        debug!(
            "Low relevance {:.2} for query '{}', top results: {:?}",
            relevance_score, query, previews
        );
    }

    RelevanceReport {
        results: entries,
        relevance_score,
        total_results,
        duplicates_removed,
        query: query.to_string(),
        validation_note: VALIDATION_NOTE.to_string(),
        formatted_for_evaluation,
    }
}

fn truncate_content(content: &str) -> String {
    let end = content
        .char_indices()
        .nth(ENTRY_CONTENT_CHARS)
        .map(|(idx, _)| idx);

    match end {
        Some(idx) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(content: &str, score: f64) -> ScoredResult {
        ScoredResult::new(
            SearchResult::new(content, "kb.md", Some(score)),
            Some(score),
        )
    }

    #[test]
    fn test_content_key_uses_leading_prefix() {
        let head = "x".repeat(100);
        let a = format!("{}{}", head, "tail one");
        let b = format!("{}{}", head, "different tail");

        // Same first 100 chars collide on purpose
        assert_eq!(content_key(&a), content_key(&b));
        assert_ne!(content_key("short text"), content_key("other text"));
    }

    #[test]
    fn test_content_key_is_case_sensitive() {
        assert_ne!(content_key("Bell palsy"), content_key("bell palsy"));
    }

    #[test]
    fn test_dedup_keeps_earliest() {
        let results = vec![
            scored("first body", 0.9),
            scored("second body", 0.8),
            scored("first body", 0.3),
        ];

        let deduped = dedup_results(results);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].result.content, "first body");
        assert_eq!(deduped[0].result.score, Some(0.9));
        assert_eq!(deduped[1].result.content, "second body");
    }

    #[test]
    fn test_build_report_counts() {
        let results = vec![
            SearchResult::new("alpha content", "a.md", Some(0.9)),
            SearchResult::new("beta content", "b.md", Some(0.8)),
            SearchResult::new("alpha content", "a.md", Some(0.7)),
        ];

        let report = build_report(&results, "alpha beta content", 3);

        assert_eq!(report.total_results, 2);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.query, "alpha beta content");
        assert_eq!(report.validation_note, VALIDATION_NOTE);
    }

    #[test]
    fn test_build_report_truncates_to_top_k() {
        let results: Vec<SearchResult> = (0..5)
            .map(|i| SearchResult::new(format!("unique content {}", i), "kb.md", Some(0.5)))
            .collect();

        let report = build_report(&results, "unique content", 3);

        // total_results counts all unique results, entries stop at top_k
        assert_eq!(report.total_results, 5);
        assert_eq!(report.duplicates_removed, 0);
        assert_eq!(report.results.len(), 3);
    }

    #[test]
    fn test_formatted_block_shape() {
        let results = vec![SearchResult::new("bell palsy overview", "kb.md", Some(0.85))];

        let report = build_report(&results, "bell palsy", 3);

        assert_eq!(
            report.formatted_for_evaluation,
            "Score: 0.85\nContent: bell palsy overview\n\n"
        );
    }

    #[test]
    fn test_missing_score_renders_as_zero() {
        let results = vec![SearchResult::new("unscored entry", "kb.md", None)];

        let report = build_report(&results, "unscored entry", 3);

        assert_eq!(
            report.formatted_for_evaluation,
            "Score: 0\nContent: unscored entry\n\n"
        );
        assert_eq!(report.results[0].score, 0.0);
    }

    #[test]
    fn test_long_content_truncated_with_ellipsis() {
        let long = "z".repeat(250);
        let results = vec![SearchResult::new(long.clone(), "kb.md", Some(0.5))];

        let report = build_report(&results, "z", 3);

        assert_eq!(report.results[0].content.len(), 203);
        assert!(report.results[0].content.ends_with("..."));
        // The evaluation block keeps the full content
        assert!(report.formatted_for_evaluation.contains(&long));
    }

    #[test]
    fn test_wrapped_json_envelope() {
        let results = vec![SearchResult::new("alpha", "a.md", Some(0.9))];
        let report = build_report(&results, "alpha", 3);

        let wrapped = report.to_wrapped_json().unwrap();
        assert!(wrapped.starts_with("<search_results>\n"));
        assert!(wrapped.ends_with("\n</search_results>"));

        let inner = wrapped
            .trim_start_matches("<search_results>\n")
            .trim_end_matches("\n</search_results>");
        let value: serde_json::Value = serde_json::from_str(inner).unwrap();
        assert_eq!(value["query"], "alpha");
        assert_eq!(value["total_results"], 1);
    }
}
