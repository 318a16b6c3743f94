//! Local-versus-external answer routing

use crate::evaluation::{EvaluationVerdict, VerdictLabel};
use crate::relevance::RelevanceReport;
use serde::{Deserialize, Serialize};

/// Query terms that mark a question as time-sensitive
const TIME_SENSITIVE_TERMS: &[&str] = &["today", "current", "weather", "news"];

/// Relevance below which an unevaluated report is not trusted
const RELEVANCE_THRESHOLD: f64 = 0.3;

/// Where the answer should come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    UseLocal,
    UseExternal,
}

/// A routing decision with its stated reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    pub route: Route,
    pub reason: String,
}

/// True when the query asks about something the knowledge base cannot
/// keep current
pub fn is_time_sensitive(query: &str) -> bool {
    let query_lower = query.to_lowercase();
    TIME_SENSITIVE_TERMS
        .iter()
        .any(|term| query_lower.contains(term))
}

/// Decide where to answer from
///
/// Rules apply in order and the first match wins:
/// 1. time-sensitive query routes external regardless of everything else,
/// 2. a yes verdict routes local,
/// 3. without a usable verdict the report's relevance decides,
/// 4. a no verdict routes external.
pub fn route(
    report: &RelevanceReport,
    verdict: Option<&EvaluationVerdict>,
    query: &str,
) -> RouteDecision {
    if is_time_sensitive(query) {
        return RouteDecision {
            route: Route::UseExternal,
            reason: "query asks about time-sensitive information".to_string(),
        };
    }

    match verdict.map(|v| v.label) {
        Some(VerdictLabel::Yes) => RouteDecision {
            route: Route::UseLocal,
            reason: "retrieved chunks were judged relevant".to_string(),
        },
        Some(VerdictLabel::No) => RouteDecision {
            route: Route::UseExternal,
            reason: "retrieved chunks were judged irrelevant".to_string(),
        },
        Some(VerdictLabel::Unknown) | None => {
            if report.relevance_score < RELEVANCE_THRESHOLD {
                RouteDecision {
                    route: Route::UseExternal,
                    reason: format!(
                        "no usable verdict and relevance {:.2} is below {}",
                        report.relevance_score, RELEVANCE_THRESHOLD
                    ),
                }
            } else {
                RouteDecision {
                    route: Route::UseLocal,
                    reason: format!(
                        "no usable verdict but relevance {:.2} is acceptable",
                        report.relevance_score
                    ),
                }
            }
        }
    }
}
