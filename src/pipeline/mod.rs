//! Question answering pipeline
//!
//! Ties the collaborators together: retrieve candidates, build the
//! relevance report, evaluate chunk relevance, route the question and
//! synthesize the final answer locally or through the external search
//! tool.

use crate::config::{expand_tilde, Config};
use crate::embedding::{EmbeddingProvider, HttpEmbeddingProvider};
use crate::error::{Result, SiftError};
use crate::evaluation::{EvaluationVerdict, RelevanceEvaluator};
use crate::knowledge::{KnowledgeStatus, KnowledgeStore, Retriever};
use crate::llm::{ContextPrecisionScorer, GenerationError, Generator, HttpGenerator, LlmContextPrecision};
use crate::relevance::{build_report, RelevanceReport};
use crate::routing::{is_time_sensitive, route, Route};
use crate::tools::{ExternalTools, ToolClient};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A fully resolved answer with its routing trail
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub route: Route,
    pub reason: String,
    pub report: RelevanceReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<EvaluationVerdict>,
}

/// The question answering pipeline
pub struct Pipeline {
    retriever: Arc<dyn Retriever>,
    generator: Option<Arc<dyn Generator>>,
    evaluator: Option<RelevanceEvaluator>,
    tools: Option<ExternalTools>,
    fetch_k: usize,
    report_top_k: usize,
}

impl Pipeline {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        generator: Option<Arc<dyn Generator>>,
        evaluator: Option<RelevanceEvaluator>,
        tools: Option<ExternalTools>,
        fetch_k: usize,
        report_top_k: usize,
    ) -> Self {
        Self {
            retriever,
            generator,
            evaluator,
            tools,
            fetch_k,
            report_top_k,
        }
    }

    /// Build the pipeline from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = build_provider(config)?;
        let store = build_store(config, provider)?;
        let retriever: Arc<dyn Retriever> = Arc::new(store);

        let (generator, evaluator) = if config.llm.enabled {
            let generator = build_generator(config)?;
            let scorer: Arc<dyn ContextPrecisionScorer> =
                Arc::new(LlmContextPrecision::new(generator.clone()));
            let evaluator = RelevanceEvaluator::new(
                generator.clone(),
                scorer,
                Duration::from_secs(config.evaluation.inner_timeout_secs),
                Duration::from_secs(config.evaluation.outer_timeout_secs),
            )?;
            (Some(generator), Some(evaluator))
        } else {
            (None, None)
        };

        let tools = if config.tools.enabled {
            let socket_path = expand_tilde(&config.tools.socket_path);
            Some(ExternalTools::new(ToolClient::new(socket_path)))
        } else {
            None
        };

        Ok(Self::new(
            retriever,
            generator,
            evaluator,
            tools,
            config.retrieval.top_k,
            config.retrieval.report_top_k,
        ))
    }

    /// Answer a question end to end
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SiftError::Query("Question must not be empty".to_string()));
        }

        let generator = self.generator.clone().ok_or_else(|| {
            SiftError::Config(
                "LLM generation is disabled; enable [llm] in the configuration to ask questions"
                    .to_string(),
            )
        })?;

        let results = self.retriever.search(question, self.fetch_k).await?;
        let report = build_report(&results, question, self.report_top_k);

        // Time-sensitive questions route externally regardless of the
        // verdict, so the scorer call is skipped for them
        let verdict = if is_time_sensitive(question) {
            debug!("Skipping relevance evaluation for time-sensitive question");
            None
        } else if let Some(evaluator) = &self.evaluator {
            Some(
                evaluator
                    .evaluate(&report.formatted_for_evaluation, question)
                    .await,
            )
        } else {
            None
        };

        let decision = route(&report, verdict.as_ref(), question);
        info!("Routing question via {:?}: {}", decision.route, decision.reason);

        let text = match decision.route {
            Route::UseLocal => self.answer_local(&generator, question, &report).await?,
            Route::UseExternal => self.answer_external(&generator, question, &report).await?,
        };

        Ok(Answer {
            text,
            route: decision.route,
            reason: decision.reason,
            report,
            verdict,
        })
    }

    /// Search the knowledge base and build the relevance report
    pub async fn search(&self, query: &str, top_k: Option<usize>) -> Result<RelevanceReport> {
        let results = self.retriever.search(query, self.fetch_k).await?;
        Ok(build_report(
            &results,
            query,
            top_k.unwrap_or(self.report_top_k),
        ))
    }

    /// Search and render the wrapped report JSON, never failing
    ///
    /// Errors are folded into an error-shaped JSON object so callers
    /// always receive something parseable.
    pub async fn search_wrapped(&self, query: &str, top_k: Option<usize>) -> String {
        if query.trim().is_empty() {
            return serde_json::json!({
                "error": "Query parameter is required and must be a non-empty string",
                "results": [],
                "relevance_score": 0.0,
            })
            .to_string();
        }

        match self.search(query, top_k).await {
            Ok(report) => match report.to_wrapped_json() {
                Ok(wrapped) => wrapped,
                Err(e) => error_report_json(&format!("Error searching knowledge base: {}", e), query),
            },
            Err(e) => error_report_json(&format!("Error searching knowledge base: {}", e), query),
        }
    }

    /// Knowledge base status
    pub async fn status(&self) -> KnowledgeStatus {
        let count = self.retriever.document_count().await;
        info!("Knowledge base status checked: {} documents", count);
        KnowledgeStatus::from_count(count)
    }

    async fn answer_local(
        &self,
        generator: &Arc<dyn Generator>,
        question: &str,
        report: &RelevanceReport,
    ) -> Result<String> {
        let context = report.to_wrapped_json()?;
        let prompt = format!(
            "Answer the question using the search results below. Be concise and cite sources.\n\n{}\n\nQuestion: {}\n\nAnswer:",
            context, question
        );
        generate_or_empty(generator, &prompt).await
    }

    async fn answer_external(
        &self,
        generator: &Arc<dyn Generator>,
        question: &str,
        report: &RelevanceReport,
    ) -> Result<String> {
        let tools = match &self.tools {
            Some(tools) => tools,
            None => {
                warn!("External tools are disabled, answering from local knowledge");
                return self.degraded_local(generator, question, report).await;
            }
        };

        let searched = if question.to_lowercase().contains("news") {
            tools.news_search(question).await
        } else {
            tools.web_search(question).await
        };

        match searched {
            Ok(data) => {
                let context = render_web_results(&data);
                let prompt = format!(
                    "Answer the question using the web search results below. Be concise and cite sources.\n\n{}\n\nQuestion: {}\n\nAnswer:",
                    context, question
                );
                generate_or_empty(generator, &prompt).await
            }
            Err(e) => {
                warn!(
                    "External search failed, answering from local knowledge: {}",
                    e
                );
                self.degraded_local(generator, question, report).await
            }
        }
    }

    async fn degraded_local(
        &self,
        generator: &Arc<dyn Generator>,
        question: &str,
        report: &RelevanceReport,
    ) -> Result<String> {
        let text = self.answer_local(generator, question, report).await?;
        Ok(format!(
            "{}\n\nNote: external search was unavailable; this answer uses only the local knowledge base.",
            text
        ))
    }
}

/// Build the embedding provider from configuration
pub fn build_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let api_key = resolve_api_key(&config.embedding.api_key_env);
    let provider = HttpEmbeddingProvider::new(
        &config.embedding.base_url,
        api_key,
        &config.embedding.model,
        config.embedding.dimension,
        Duration::from_secs(config.embedding.timeout_secs),
    )?;
    Ok(Arc::new(provider))
}

/// Open the knowledge store from configuration
pub fn build_store(config: &Config, provider: Arc<dyn EmbeddingProvider>) -> Result<KnowledgeStore> {
    let store_path = expand_tilde(&config.knowledge.store_path);
    Ok(KnowledgeStore::open(store_path, provider)?)
}

fn build_generator(config: &Config) -> Result<Arc<dyn Generator>> {
    let api_key = resolve_api_key(&config.llm.api_key_env);
    let generator = HttpGenerator::new(
        &config.llm.base_url,
        api_key,
        &config.llm.model,
        config.llm.temperature,
        Duration::from_secs(config.llm.timeout_secs),
    )?;
    Ok(Arc::new(generator))
}

/// Resolve an API key, accepting OPENAI_API_KEY as the shared fallback
fn resolve_api_key(env_name: &str) -> String {
    std::env::var(env_name)
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .unwrap_or_default()
}

fn error_report_json(message: &str, query: &str) -> String {
    serde_json::json!({
        "error": message,
        "results": [],
        "relevance_score": 0.0,
        "query": query,
    })
    .to_string()
}

/// Render the tool service's web results into a prompt context block
fn render_web_results(data: &serde_json::Value) -> String {
    let mut rendered = String::new();

    if let Some(answer) = data.get("answer").and_then(|v| v.as_str()) {
        if !answer.is_empty() {
            rendered.push_str("Answer summary: ");
            rendered.push_str(answer);
            rendered.push_str("\n\n");
        }
    }

    if let Some(results) = data.get("results").and_then(|v| v.as_array()) {
        for (i, result) in results.iter().enumerate() {
            let title = result
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or("Untitled");
            let url = result.get("url").and_then(|v| v.as_str()).unwrap_or("");
            let content = result.get("content").and_then(|v| v.as_str()).unwrap_or("");
            rendered.push_str(&format!("{}. {} ({})\n{}\n\n", i + 1, title, url, content));
        }
    }

    if rendered.is_empty() {
        rendered.push_str("No web results were returned.");
    }

    rendered
}

async fn generate_or_empty(generator: &Arc<dyn Generator>, prompt: &str) -> Result<String> {
    match generator.generate(prompt).await {
        Ok(text) => Ok(text),
        Err(GenerationError::EmptyResponse) => {
            Ok("Generation completed but returned an empty response.".to_string())
        }
        Err(e) => Err(e.into()),
    }
}
