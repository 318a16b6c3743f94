//! Context precision scoring

use super::generator::{GenerationError, Generator};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Scores how precisely retrieved contexts support an answer
///
/// Implementations may call remote services and can fail or stall; callers
/// are expected to wrap invocations in their own bounds.
#[async_trait]
pub trait ContextPrecisionScorer: Send + Sync {
    /// Precision of the contexts for the (question, answer) pair, in [0, 1]
    async fn score(
        &self,
        question: &str,
        answer: &str,
        contexts: &[String],
    ) -> Result<f64, GenerationError>;
}

/// LLM-judged context precision
///
/// Each context is judged for usefulness toward the answer; the final score
/// is the rank-weighted mean precision over the positive verdicts.
pub struct LlmContextPrecision {
    generator: Arc<dyn Generator>,
}

impl LlmContextPrecision {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    async fn judge(
        &self,
        question: &str,
        answer: &str,
        context: &str,
    ) -> Result<bool, GenerationError> {
        let prompt = format!(
            "Given a question, an answer, and a context, verify whether the context was useful \
             in arriving at the given answer.\n\n\
             Question: {}\nContext: {}\nAnswer: {}\n\n\
             Respond with exactly one digit: 1 if the context was useful, 0 if it was not.\nVerdict:",
            question, context, answer
        );

        let reply = self.generator.generate(&prompt).await?;
        Ok(parse_verdict(&reply))
    }
}

/// First 0/1 digit in the reply decides; anything else reads as not useful
fn parse_verdict(reply: &str) -> bool {
    reply
        .chars()
        .find(|c| *c == '0' || *c == '1')
        .map(|c| c == '1')
        .unwrap_or(false)
}

/// Rank-weighted mean precision over ordered binary verdicts
fn mean_precision(verdicts: &[bool]) -> f64 {
    let mut positives = 0usize;
    let mut weighted = 0.0;

    for (idx, verdict) in verdicts.iter().enumerate() {
        if *verdict {
            positives += 1;
            weighted += positives as f64 / (idx + 1) as f64;
        }
    }

    if positives == 0 {
        0.0
    } else {
        weighted / positives as f64
    }
}

#[async_trait]
impl ContextPrecisionScorer for LlmContextPrecision {
    async fn score(
        &self,
        question: &str,
        answer: &str,
        contexts: &[String],
    ) -> Result<f64, GenerationError> {
        if contexts.is_empty() {
            return Ok(0.0);
        }

        let mut verdicts = Vec::with_capacity(contexts.len());
        for context in contexts {
            verdicts.push(self.judge(question, answer, context).await?);
        }

        let score = mean_precision(&verdicts);
        debug!(
            "Judged {} contexts, {} useful, precision {:.3}",
            verdicts.len(),
            verdicts.iter().filter(|v| **v).count(),
            score
        );
        Ok(score)
    }
}
