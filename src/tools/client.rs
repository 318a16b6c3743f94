//! Client for the external search tool service
//!
//! Tools run in a separate process reachable over a Unix socket. The
//! client probes the service once with a health check and caches the
//! verdict, so a missing service costs one failed connect per run
//! rather than one per query.

use super::protocol::{read_frame, write_frame, ToolError, ToolRequest, ToolResponse};
use std::path::PathBuf;
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const DEFAULT_MAX_RESULTS: usize = 5;
const DEFAULT_SEARCH_DEPTH: &str = "basic";
const DEFAULT_INCLUDE_ANSWER: bool = true;
const DEFAULT_NEWS_DAYS_BACK: u32 = 7;

/// Low-level client that opens one connection per call
pub struct ToolClient {
    socket_path: PathBuf,
}

impl ToolClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    /// Send a request and wait for the response
    pub async fn call(&self, request: &ToolRequest) -> Result<ToolResponse, ToolError> {
        let mut stream =
            UnixStream::connect(&self.socket_path)
                .await
                .map_err(|e| ToolError::Connect {
                    path: self.socket_path.clone(),
                    source: e,
                })?;

        write_frame(&mut stream, request).await?;
        read_frame(&mut stream).await
    }
}

/// Cached outcome of the health probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeState {
    Unprobed,
    Ready,
    Unavailable,
}

/// High-level tool facade with availability caching
pub struct ExternalTools {
    client: ToolClient,
    state: Mutex<ProbeState>,
}

impl ExternalTools {
    pub fn new(client: ToolClient) -> Self {
        Self {
            client,
            state: Mutex::new(ProbeState::Unprobed),
        }
    }

    /// Probe the service on first use and cache the verdict
    async fn ensure_ready(&self) -> Result<(), ToolError> {
        let mut state = self.state.lock().await;
        match *state {
            ProbeState::Ready => Ok(()),
            ProbeState::Unavailable => Err(ToolError::Unavailable),
            ProbeState::Unprobed => {
                let verdict = match self.client.call(&ToolRequest::HealthCheck).await {
                    Ok(response) if response.success => ProbeState::Ready,
                    Ok(response) => {
                        warn!(
                            "Tool service health check failed: {}",
                            response.message.unwrap_or_default()
                        );
                        ProbeState::Unavailable
                    }
                    Err(e) => {
                        warn!("Tool service is not reachable: {}", e);
                        ProbeState::Unavailable
                    }
                };
                *state = verdict;
                if verdict == ProbeState::Ready {
                    Ok(())
                } else {
                    Err(ToolError::Unavailable)
                }
            }
        }
    }

    /// Whether the service answered its health check
    pub async fn is_available(&self) -> bool {
        self.ensure_ready().await.is_ok()
    }

    async fn checked_call(&self, request: ToolRequest) -> Result<serde_json::Value, ToolError> {
        self.ensure_ready().await?;

        debug!("Calling external tool: {:?}", request);
        let response = self.client.call(&request).await?;
        if response.success {
            Ok(response.data.unwrap_or(serde_json::Value::Null))
        } else {
            Err(ToolError::Call(
                response
                    .message
                    .unwrap_or_else(|| "unknown tool failure".to_string()),
            ))
        }
    }

    /// General web search with service defaults
    pub async fn web_search(&self, query: &str) -> Result<serde_json::Value, ToolError> {
        self.checked_call(ToolRequest::WebSearch {
            query: query.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            search_depth: DEFAULT_SEARCH_DEPTH.to_string(),
            include_answer: DEFAULT_INCLUDE_ANSWER,
        })
        .await
    }

    /// Recent news search with service defaults
    pub async fn news_search(&self, query: &str) -> Result<serde_json::Value, ToolError> {
        self.checked_call(ToolRequest::NewsSearch {
            query: query.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            days_back: DEFAULT_NEWS_DAYS_BACK,
        })
        .await
    }
}
