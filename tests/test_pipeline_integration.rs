//! End-to-end pipeline test with stubbed collaborators
//!
//! Retrieval, reporting, evaluation and routing run for real; only the
//! network-facing collaborators are stubbed.

use async_trait::async_trait;
use sift::evaluation::{RelevanceEvaluator, VerdictLabel};
use sift::knowledge::{Retriever, StoreError};
use sift::llm::{ContextPrecisionScorer, GenerationError, Generator};
use sift::pipeline::Pipeline;
use sift::relevance::SearchResult;
use sift::routing::Route;
use std::sync::Arc;
use std::time::Duration;

struct FixtureRetriever {
    results: Vec<SearchResult>,
}

impl FixtureRetriever {
    fn medical() -> Arc<Self> {
        let intro = "Bell's palsy is a sudden, temporary weakness of the facial muscles \
                     that usually affects one side of the face.";
        let steroids = "Corticosteroid treatment within 72 hours of onset improves the \
                        odds of complete recovery.";
        let therapy = "Facial exercises can help maintain muscle tone during recovery.";

        Arc::new(Self {
            results: vec![
                SearchResult::new(intro, "conditions/bell_palsy.md", Some(0.92)),
                SearchResult::new(steroids, "treatment/steroids.md", Some(0.88)),
                SearchResult::new(intro, "archive/bell_palsy.md", Some(0.75)),
                SearchResult::new(therapy, "treatment/exercises.md", Some(0.71)),
                SearchResult::new(steroids, "archive/steroids.md", Some(0.64)),
            ],
        })
    }
}

#[async_trait]
impl Retriever for FixtureRetriever {
    async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<SearchResult>, StoreError> {
        Ok(self.results.iter().take(top_k).cloned().collect())
    }

    async fn document_count(&self) -> usize {
        self.results.len()
    }
}

struct CannedGenerator;

#[async_trait]
impl Generator for CannedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Ok("Corticosteroids started early give the best outcome.".to_string())
    }
}

struct FixedScorer {
    score: f64,
}

#[async_trait]
impl ContextPrecisionScorer for FixedScorer {
    async fn score(
        &self,
        _question: &str,
        _answer: &str,
        _contexts: &[String],
    ) -> Result<f64, GenerationError> {
        Ok(self.score)
    }
}

fn pipeline_with_scorer(score: f64) -> Pipeline {
    let generator: Arc<dyn Generator> = Arc::new(CannedGenerator);
    let evaluator = RelevanceEvaluator::new(
        generator.clone(),
        Arc::new(FixedScorer { score }),
        Duration::from_secs(20),
        Duration::from_secs(25),
    )
    .unwrap();

    Pipeline::new(
        FixtureRetriever::medical(),
        Some(generator),
        Some(evaluator),
        None,
        5,
        3,
    )
}

#[tokio::test]
async fn test_search_report_counts_through_pipeline() {
    let pipeline = Pipeline::new(FixtureRetriever::medical(), None, None, None, 5, 3);

    let report = pipeline.search("bell palsy treatment", None).await.unwrap();

    // Five fetched results collapse to three unique ones
    assert_eq!(report.total_results, 3);
    assert_eq!(report.duplicates_removed, 2);
    assert_eq!(report.results.len(), 3);
    assert_eq!(
        report.formatted_for_evaluation.matches("Score: ").count(),
        3
    );
}

#[tokio::test]
async fn test_search_honors_requested_top_k() {
    let pipeline = Pipeline::new(FixtureRetriever::medical(), None, None, None, 5, 3);

    let report = pipeline
        .search("bell palsy treatment", Some(2))
        .await
        .unwrap();

    assert_eq!(report.results.len(), 2);
    // Unique count is unaffected by the requested cut
    assert_eq!(report.total_results, 3);
}

#[tokio::test]
async fn test_relevant_chunks_route_local() {
    let pipeline = pipeline_with_scorer(0.9);

    let answer = pipeline
        .ask("how is bell palsy treated")
        .await
        .unwrap();

    assert_eq!(answer.route, Route::UseLocal);
    assert_eq!(
        answer.text,
        "Corticosteroids started early give the best outcome."
    );

    let verdict = answer.verdict.unwrap();
    assert_eq!(verdict.label, VerdictLabel::Yes);
    assert_eq!(answer.report.duplicates_removed, 2);
}

#[tokio::test]
async fn test_irrelevant_chunks_route_external_and_degrade_without_tools() {
    let pipeline = pipeline_with_scorer(0.1);

    let answer = pipeline
        .ask("how is bell palsy treated")
        .await
        .unwrap();

    assert_eq!(answer.route, Route::UseExternal);
    assert_eq!(answer.verdict.unwrap().label, VerdictLabel::No);
    // No tool service is configured, so the answer degrades to local
    // knowledge with an explicit note
    assert!(answer
        .text
        .contains("external search was unavailable"));
}

#[tokio::test]
async fn test_search_wrapped_envelope_through_pipeline() {
    let pipeline = Pipeline::new(FixtureRetriever::medical(), None, None, None, 5, 3);

    let wrapped = pipeline.search_wrapped("bell palsy treatment", Some(2)).await;

    assert!(wrapped.starts_with("<search_results>\n"));
    assert!(wrapped.ends_with("\n</search_results>"));

    let inner = wrapped
        .trim_start_matches("<search_results>\n")
        .trim_end_matches("\n</search_results>");
    let value: serde_json::Value = serde_json::from_str(inner).unwrap();
    assert_eq!(value["results"].as_array().unwrap().len(), 2);
    assert_eq!(value["total_results"], 3);
}

#[tokio::test]
async fn test_status_through_pipeline() {
    let pipeline = Pipeline::new(FixtureRetriever::medical(), None, None, None, 5, 3);

    let status = pipeline.status().await;
    assert_eq!(status.document_count, 5);
}
