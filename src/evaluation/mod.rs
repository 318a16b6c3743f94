//! Chunk-relevance evaluation
//!
//! Decides whether retrieved chunks can answer a question. The scored path
//! runs an LLM-backed precision scorer under layered timeouts; when it
//! cannot deliver, a lexical heuristic takes over. Every failure mode
//! degrades to a verdict instead of an error.

mod heuristic;
mod parser;
mod worker;

pub use heuristic::heuristic_score;
pub use parser::{ChunkParse, ChunkParser, ParseDiagnostics, ParseStrategy};
pub use worker::{run_scorer_isolated, ScorerOutcome, TimeoutPhase};

use crate::error::Result;
use crate::llm::{ContextPrecisionScorer, Generator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Score above which the scored evaluation reads as relevant
const LLM_YES_THRESHOLD: f64 = 0.5;

/// Heuristic score above which the fallback reads as relevant
const FALLBACK_YES_THRESHOLD: f64 = 0.3;

/// Most chunks that enter a single evaluation
const MAX_EVALUATED_CHUNKS: usize = 3;

/// Chunks joined into the provisional answer context
const ANSWER_CONTEXT_CHUNKS: usize = 2;

/// Stand-in when the provisional answer cannot be generated
const PLACEHOLDER_ANSWER: &str = "Unable to generate answer from context";

/// Binary relevance call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictLabel {
    Yes,
    No,
    Unknown,
}

/// How a verdict was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictMethod {
    Llm,
    FallbackHeuristic,
    Error,
}

/// Outcome of evaluating retrieved chunks against a question
///
/// Immutable once produced. Consumers read the label; the score, method
/// and note exist for diagnostics and reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationVerdict {
    pub label: VerdictLabel,
    pub score: Option<f64>,
    pub method: VerdictMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl EvaluationVerdict {
    /// Verdict from a delivered scorer result
    pub fn from_llm_score(score: f64) -> Self {
        Self {
            label: if score > LLM_YES_THRESHOLD {
                VerdictLabel::Yes
            } else {
                VerdictLabel::No
            },
            score: Some(score),
            method: VerdictMethod::Llm,
            note: None,
        }
    }

    /// Verdict from the lexical fallback
    pub fn from_heuristic(score: f64, note: impl Into<String>) -> Self {
        Self {
            label: if score > FALLBACK_YES_THRESHOLD {
                VerdictLabel::Yes
            } else {
                VerdictLabel::No
            },
            score: Some(score),
            method: VerdictMethod::FallbackHeuristic,
            note: Some(note.into()),
        }
    }

    /// Verdict for inputs that never reached scoring
    pub fn error(note: impl Into<String>) -> Self {
        Self {
            label: VerdictLabel::Unknown,
            score: None,
            method: VerdictMethod::Error,
            note: Some(note.into()),
        }
    }
}

/// Evaluates whether retrieved chunks can answer a question
pub struct RelevanceEvaluator {
    generator: Arc<dyn Generator>,
    scorer: Arc<dyn ContextPrecisionScorer>,
    parser: ChunkParser,
    inner_timeout: Duration,
    outer_timeout: Duration,
}

impl RelevanceEvaluator {
    pub fn new(
        generator: Arc<dyn Generator>,
        scorer: Arc<dyn ContextPrecisionScorer>,
        inner_timeout: Duration,
        outer_timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            generator,
            scorer,
            parser: ChunkParser::new()?,
            inner_timeout,
            outer_timeout,
        })
    }

    /// Evaluate formatted results against a question
    ///
    /// Never returns an error: invalid input and parse failures produce an
    /// error verdict, scorer trouble produces a fallback verdict.
    pub async fn evaluate(&self, formatted_results: &str, question: &str) -> EvaluationVerdict {
        if formatted_results.is_empty() {
            return EvaluationVerdict::error("Results must be a non-empty string");
        }
        if question.is_empty() {
            return EvaluationVerdict::error("Question must be a non-empty string");
        }

        let chunks = match self.parser.parse(formatted_results) {
            ChunkParse::Parsed { chunks, strategy } => {
                debug!("Extracted {} chunks via {:?}", chunks.len(), strategy);
                chunks
            }
            ChunkParse::NoChunks { diagnostics } => {
                warn!("No chunks extracted from results: {:?}", diagnostics);
                return EvaluationVerdict::error(format!(
                    "No chunks extracted from results. Debug info: {:?}",
                    diagnostics
                ));
            }
        };

        let contexts: Vec<String> = chunks.into_iter().take(MAX_EVALUATED_CHUNKS).collect();
        let answer = self.provisional_answer(question, &contexts).await;

        let outcome = run_scorer_isolated(
            self.scorer.clone(),
            question.to_string(),
            answer,
            contexts,
            self.inner_timeout,
            self.outer_timeout,
        )
        .await;

        match outcome {
            ScorerOutcome::Scored(score) => {
                debug!("Context precision scored {:.3}", score);
                EvaluationVerdict::from_llm_score(score)
            }
            ScorerOutcome::Failed(reason) => {
                self.fallback_verdict(formatted_results, question, &reason)
            }
            ScorerOutcome::TimedOut {
                phase: TimeoutPhase::Inner,
            } => self.fallback_verdict(formatted_results, question, "scorer call timed out"),
            ScorerOutcome::TimedOut {
                phase: TimeoutPhase::Outer,
            } => self.fallback_verdict(formatted_results, question, "evaluation task timed out"),
        }
    }

    /// Brief answer synthesized from the leading chunks, used as the
    /// reference answer during scoring
    async fn provisional_answer(&self, question: &str, contexts: &[String]) -> String {
        let context_for_answer = contexts
            .iter()
            .take(ANSWER_CONTEXT_CHUNKS)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Based on the following context, provide a brief answer to the question.\n\n\
             Question: {}\nContext: {}\n\nAnswer:",
            question, context_for_answer
        );

        match self.generator.generate(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Provisional answer generation failed: {}", e);
                PLACEHOLDER_ANSWER.to_string()
            }
        }
    }

    fn fallback_verdict(
        &self,
        formatted_results: &str,
        question: &str,
        reason: &str,
    ) -> EvaluationVerdict {
        let score = heuristic_score(formatted_results, question);
        warn!(
            "Scored evaluation unavailable ({}), keyword-overlap heuristic scored {:.2}",
            reason, score
        );
        EvaluationVerdict::from_heuristic(
            score,
            format!(
                "Scored evaluation failed ({}), using keyword overlap heuristic",
                reason
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerationError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoGenerator {
        seen_prompt: Mutex<Option<String>>,
    }

    impl EchoGenerator {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
            *self.seen_prompt.lock().unwrap() = Some(prompt.to_string());
            Ok("stub answer".to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> std::result::Result<String, GenerationError> {
            Err(GenerationError::EmptyResponse)
        }
    }

    struct RecordingScorer {
        score: f64,
        seen_answer: Mutex<Option<String>>,
        seen_contexts: Mutex<Option<Vec<String>>>,
    }

    impl RecordingScorer {
        fn new(score: f64) -> Arc<Self> {
            Arc::new(Self {
                score,
                seen_answer: Mutex::new(None),
                seen_contexts: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl ContextPrecisionScorer for RecordingScorer {
        async fn score(
            &self,
            _question: &str,
            answer: &str,
            contexts: &[String],
        ) -> std::result::Result<f64, GenerationError> {
            *self.seen_answer.lock().unwrap() = Some(answer.to_string());
            *self.seen_contexts.lock().unwrap() = Some(contexts.to_vec());
            Ok(self.score)
        }
    }

    struct HangingScorer;

    #[async_trait]
    impl ContextPrecisionScorer for HangingScorer {
        async fn score(
            &self,
            _question: &str,
            _answer: &str,
            _contexts: &[String],
        ) -> std::result::Result<f64, GenerationError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(1.0)
        }
    }

    struct ErroringScorer;

    #[async_trait]
    impl ContextPrecisionScorer for ErroringScorer {
        async fn score(
            &self,
            _question: &str,
            _answer: &str,
            _contexts: &[String],
        ) -> std::result::Result<f64, GenerationError> {
            Err(GenerationError::EmptyResponse)
        }
    }

    fn evaluator(
        generator: Arc<dyn Generator>,
        scorer: Arc<dyn ContextPrecisionScorer>,
    ) -> RelevanceEvaluator {
        RelevanceEvaluator::new(
            generator,
            scorer,
            Duration::from_secs(20),
            Duration::from_secs(25),
        )
        .unwrap()
    }

    fn formatted_block(entries: usize) -> String {
        (0..entries)
            .map(|i| format!("Score: 0.8\nContent: chunk number {} body\n\n", i))
            .collect()
    }

    const QUESTION: &str = "What is Bell's palsy?";

    #[tokio::test]
    async fn test_empty_results_produce_error_verdict() {
        let eval = evaluator(EchoGenerator::new(), RecordingScorer::new(0.9));

        let verdict = eval.evaluate("", QUESTION).await;

        assert_eq!(verdict.label, VerdictLabel::Unknown);
        assert_eq!(verdict.method, VerdictMethod::Error);
        assert!(verdict.score.is_none());
    }

    #[tokio::test]
    async fn test_empty_question_produces_error_verdict() {
        let eval = evaluator(EchoGenerator::new(), RecordingScorer::new(0.9));

        let verdict = eval.evaluate(&formatted_block(2), "").await;

        assert_eq!(verdict.label, VerdictLabel::Unknown);
        assert_eq!(verdict.method, VerdictMethod::Error);
    }

    #[tokio::test]
    async fn test_unparseable_results_carry_diagnostics() {
        let eval = evaluator(EchoGenerator::new(), RecordingScorer::new(0.9));

        let verdict = eval.evaluate("free text with no markers", QUESTION).await;

        assert_eq!(verdict.method, VerdictMethod::Error);
        let note = verdict.note.unwrap();
        assert!(note.contains("No chunks extracted"));
        assert!(note.contains("contains_score: false"));
    }

    #[tokio::test]
    async fn test_high_score_yields_yes() {
        let scorer = RecordingScorer::new(0.9);
        let eval = evaluator(EchoGenerator::new(), scorer.clone());

        let verdict = eval.evaluate(&formatted_block(2), QUESTION).await;

        assert_eq!(verdict.label, VerdictLabel::Yes);
        assert_eq!(verdict.method, VerdictMethod::Llm);
        assert_eq!(verdict.score, Some(0.9));
        assert!(verdict.note.is_none());
    }

    #[tokio::test]
    async fn test_low_score_yields_no() {
        let eval = evaluator(EchoGenerator::new(), RecordingScorer::new(0.2));

        let verdict = eval.evaluate(&formatted_block(2), QUESTION).await;

        assert_eq!(verdict.label, VerdictLabel::No);
        assert_eq!(verdict.method, VerdictMethod::Llm);
    }

    #[tokio::test]
    async fn test_boundary_score_yields_no() {
        // Strictly greater than the threshold reads as yes
        let eval = evaluator(EchoGenerator::new(), RecordingScorer::new(0.5));

        let verdict = eval.evaluate(&formatted_block(1), QUESTION).await;

        assert_eq!(verdict.label, VerdictLabel::No);
    }

    #[tokio::test]
    async fn test_at_most_three_chunks_are_scored() {
        let scorer = RecordingScorer::new(0.9);
        let eval = evaluator(EchoGenerator::new(), scorer.clone());

        eval.evaluate(&formatted_block(5), QUESTION).await;

        let contexts = scorer.seen_contexts.lock().unwrap().clone().unwrap();
        assert_eq!(contexts.len(), 3);
        assert!(contexts[0].contains("chunk number 0"));
        assert!(contexts[2].contains("chunk number 2"));
    }

    #[tokio::test]
    async fn test_answer_prompt_uses_first_two_chunks() {
        let generator = EchoGenerator::new();
        let eval = evaluator(generator.clone(), RecordingScorer::new(0.9));

        eval.evaluate(&formatted_block(3), QUESTION).await;

        let prompt = generator.seen_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.starts_with("Based on the following context"));
        assert!(prompt.contains("chunk number 0"));
        assert!(prompt.contains("chunk number 1"));
        assert!(!prompt.contains("chunk number 2"));
    }

    #[tokio::test]
    async fn test_generator_failure_uses_placeholder_answer() {
        let scorer = RecordingScorer::new(0.9);
        let eval = evaluator(Arc::new(FailingGenerator), scorer.clone());

        let verdict = eval.evaluate(&formatted_block(2), QUESTION).await;

        // Evaluation continues with the placeholder
        assert_eq!(verdict.method, VerdictMethod::Llm);
        let answer = scorer.seen_answer.lock().unwrap().clone().unwrap();
        assert_eq!(answer, "Unable to generate answer from context");
    }

    #[tokio::test]
    async fn test_scorer_failure_falls_back_to_heuristic() {
        let eval = evaluator(EchoGenerator::new(), Arc::new(ErroringScorer));

        let block = "Score: 0.8\nContent: Bell's palsy causes sudden facial weakness\n\n";
        let verdict = eval.evaluate(block, "What is Bell's palsy?").await;

        assert_eq!(verdict.method, VerdictMethod::FallbackHeuristic);
        assert!(verdict.score.is_some());
        assert!(verdict.note.unwrap().contains("keyword overlap heuristic"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_scorer_falls_back_within_bound() {
        let eval = evaluator(EchoGenerator::new(), Arc::new(HangingScorer));

        let start = tokio::time::Instant::now();
        let verdict = eval.evaluate(&formatted_block(2), QUESTION).await;

        assert_eq!(verdict.method, VerdictMethod::FallbackHeuristic);
        assert!(verdict.note.unwrap().contains("timed out"));
        assert!(start.elapsed() <= Duration::from_secs(26));
    }
}
