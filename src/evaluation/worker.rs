//! Scorer isolation
//!
//! The precision scorer is an unreliable collaborator: it can fail, hang,
//! or return late. Each scoring attempt runs inside a disposable task with
//! an inner bound on the scorer call and an outer bound on delivery of the
//! outcome. A result that arrives after the caller stopped waiting is
//! dropped on the floor.

use crate::llm::ContextPrecisionScorer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::warn;

/// Which bound expired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPhase {
    /// The scorer call exceeded its budget inside the worker
    Inner,

    /// The worker failed to deliver before the caller stopped waiting
    Outer,
}

/// Terminal outcome of an isolated scoring attempt
#[derive(Debug, Clone)]
pub enum ScorerOutcome {
    Scored(f64),
    Failed(String),
    TimedOut { phase: TimeoutPhase },
}

/// Run the scorer inside a disposable task with layered timeouts
pub async fn run_scorer_isolated(
    scorer: Arc<dyn ContextPrecisionScorer>,
    question: String,
    answer: String,
    contexts: Vec<String>,
    inner: Duration,
    outer: Duration,
) -> ScorerOutcome {
    let (tx, rx) = oneshot::channel();

    let handle = tokio::spawn(async move {
        let outcome =
            match tokio::time::timeout(inner, scorer.score(&question, &answer, &contexts)).await {
                Ok(Ok(score)) => ScorerOutcome::Scored(score),
                Ok(Err(e)) => ScorerOutcome::Failed(e.to_string()),
                Err(_) => ScorerOutcome::TimedOut {
                    phase: TimeoutPhase::Inner,
                },
            };

        // The receiver may already be gone; a late outcome has nowhere to land
        let _ = tx.send(outcome);
    });

    match tokio::time::timeout(outer, rx).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_)) => ScorerOutcome::Failed("Scoring task ended without a result".to_string()),
        Err(_) => {
            handle.abort();
            warn!(
                "No scoring outcome delivered within {:?}, abandoning the task",
                outer
            );
            ScorerOutcome::TimedOut {
                phase: TimeoutPhase::Outer,
            }
        }
    }
}
