//! Integration test: relevance reporting over realistic retrieval output
//!
//! Exercises overlap validation, relevance fusion, deduplication and both
//! render contracts on one result set.

use sift::relevance::{build_report, SearchResult, VALIDATION_NOTE};

fn medical_results() -> Vec<SearchResult> {
    let intro = "Bell's palsy is a sudden weakness of the muscles on one side of the face. \
                 In most cases the weakness is temporary and improves over weeks.";
    let steroids = "Corticosteroid treatment started within 72 hours of onset improves the \
                    chance of full recovery of facial function.";
    let therapy = "Physical therapy and facial exercises may help maintain muscle tone while \
                   the facial nerve recovers.";

    vec![
        SearchResult::new(intro, "conditions/bell_palsy.md", Some(0.92)),
        SearchResult::new(steroids, "treatment/steroids.md", Some(0.87)),
        // Same content retrieved again from another collection
        SearchResult::new(intro, "archive/bell_palsy_copy.md", Some(0.74)),
        SearchResult::new(therapy, "treatment/therapy.md", Some(0.81)),
        SearchResult::new(steroids, "archive/steroids_copy.md", Some(0.66)),
    ]
}

#[test]
fn test_report_counts_and_entries() {
    let report = build_report(&medical_results(), "bell palsy treatment recovery", 3);

    // Five raw results collapse to three unique ones
    assert_eq!(report.total_results, 3);
    assert_eq!(report.duplicates_removed, 2);
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.query, "bell palsy treatment recovery");
    assert_eq!(report.validation_note, VALIDATION_NOTE);

    // First occurrence wins, so the archive copies never surface
    assert_eq!(report.results[0].source, "conditions/bell_palsy.md");
    assert_eq!(report.results[1].source, "treatment/steroids.md");
    assert_eq!(report.results[2].source, "treatment/therapy.md");

    assert!(report.relevance_score > 0.0);
    assert!(report.relevance_score <= 1.0);
}

#[test]
fn test_evaluation_block_is_parseable() {
    let report = build_report(&medical_results(), "bell palsy treatment recovery", 3);

    let blocks: Vec<&str> = report
        .formatted_for_evaluation
        .split("\n\n")
        .filter(|block| !block.is_empty())
        .collect();

    assert_eq!(blocks.len(), 3);
    for block in blocks {
        assert!(block.starts_with("Score: "), "bad block: {}", block);
        assert!(block.contains("\nContent: "), "bad block: {}", block);
    }

    // The block keeps full content even when entries are truncated
    assert!(report
        .formatted_for_evaluation
        .contains("improves the chance of full recovery"));
}

#[test]
fn test_wrapped_json_round_trips() {
    let report = build_report(&medical_results(), "bell palsy treatment", 2);

    let wrapped = report.to_wrapped_json().unwrap();
    assert!(wrapped.starts_with("<search_results>\n"));
    assert!(wrapped.ends_with("\n</search_results>"));

    let inner = wrapped
        .trim_start_matches("<search_results>\n")
        .trim_end_matches("\n</search_results>");
    let value: serde_json::Value = serde_json::from_str(inner).unwrap();

    // total_results counts unique results, entries stop at top-k
    assert_eq!(value["total_results"], 3);
    assert_eq!(value["duplicates_removed"], 2);
    assert_eq!(value["results"].as_array().unwrap().len(), 2);
    assert_eq!(value["query"], "bell palsy treatment");
    assert_eq!(value["validation_note"], VALIDATION_NOTE);
}

#[test]
fn test_off_topic_query_is_penalized() {
    // None of the query terms appear in the medical content, so every
    // result takes the severe overlap penalty
    let report = build_report(&medical_results(), "quantum computing fundamentals", 3);

    assert!(report.relevance_score < 0.3);
    // The penalty affects the aggregate score, not the entry scores
    assert_eq!(report.results[0].score, 0.92);
}

#[test]
fn test_weather_query_over_non_weather_content() {
    let report = build_report(&medical_results(), "weather forecast for lisbon", 3);

    // Severe overlap penalty and the weather mismatch penalty stack
    assert!(report.relevance_score < 0.05);
}

#[test]
fn test_empty_result_set_reports_zero_relevance() {
    let report = build_report(&[], "bell palsy", 3);

    assert_eq!(report.relevance_score, 0.0);
    assert_eq!(report.total_results, 0);
    assert_eq!(report.duplicates_removed, 0);
    assert!(report.results.is_empty());
    assert!(report.formatted_for_evaluation.is_empty());
}
