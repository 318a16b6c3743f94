// Length-prefixed JSON protocol for the external tool service socket

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

/// Maximum message size (10MB)
pub(crate) const MAX_MESSAGE_SIZE: u32 = 10 * 1024 * 1024;

/// Errors from the external tool transport
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Failed to connect to tool service at {path:?}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Tool transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Tool message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: u32, max: u32 },

    #[error("Malformed tool message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Tool call failed: {0}")]
    Call(String),

    #[error("Tool service is unavailable")]
    Unavailable,
}

/// Requests sent to the tool service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolRequest {
    /// General web search
    WebSearch {
        query: String,
        max_results: usize,
        search_depth: String,
        include_answer: bool,
    },
    /// Recent news search
    NewsSearch {
        query: String,
        max_results: usize,
        days_back: u32,
    },
    /// Probe whether the service is reachable and configured
    HealthCheck,
}

/// Response envelope sent back by the tool service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResponse {
    /// Create a successful response
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Create a successful response with data
    pub fn success_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// Create an error response
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Read a length-prefixed JSON message from a Unix stream
pub async fn read_frame<T: DeserializeOwned>(stream: &mut UnixStream) -> Result<T, ToolError> {
    let length = stream.read_u32().await?;

    if length > MAX_MESSAGE_SIZE {
        return Err(ToolError::MessageTooLarge {
            size: length,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buffer = vec![0u8; length as usize];
    stream.read_exact(&mut buffer).await?;

    Ok(serde_json::from_slice(&buffer)?)
}

/// Write a length-prefixed JSON message to a Unix stream
pub async fn write_frame<T: Serialize>(stream: &mut UnixStream, value: &T) -> Result<(), ToolError> {
    let payload = serde_json::to_vec(value)?;

    if payload.len() > MAX_MESSAGE_SIZE as usize {
        return Err(ToolError::MessageTooLarge {
            size: payload.len() as u32,
            max: MAX_MESSAGE_SIZE,
        });
    }

    stream.write_u32(payload.len() as u32).await?;
    stream.write_all(&payload).await?;
    stream.flush().await?;

    Ok(())
}
