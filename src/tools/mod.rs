//! External search tools reached over a Unix socket

mod client;
mod protocol;

pub use client::{ExternalTools, ToolClient};
pub use protocol::{read_frame, write_frame, ToolError, ToolRequest, ToolResponse};
