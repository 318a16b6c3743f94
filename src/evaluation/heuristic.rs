//! Pure lexical fallback scoring

use crate::relevance::tokenize;

/// Keyword-overlap score between a question and the full results text
///
/// The share of question tokens present in the results, clamped to 1.0.
/// An empty question yields 0.0. Deterministic and purely local; this is
/// the score of last resort when the real scorer is unavailable.
pub fn heuristic_score(results_text: &str, question: &str) -> f64 {
    let question_tokens = tokenize(question);
    if question_tokens.is_empty() {
        return 0.0;
    }

    let results_tokens = tokenize(results_text);
    let overlap = question_tokens.intersection(&results_tokens).count();

    (overlap as f64 / question_tokens.len() as f64).min(1.0)
}
