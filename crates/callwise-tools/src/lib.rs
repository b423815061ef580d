//! Callwise Tools - external tool servers
//!
//! Agents reach tools through MCP (Model Context Protocol) servers, either a
//! remote HTTP endpoint or a locally spawned process. [`ToolHost`] is the seam
//! the crew runner calls through.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod mcp;

use callwise_llm::ToolDefinition;

pub use mcp::{McpClient, McpError, McpResult, McpServerConfig, McpTransport};

/// Something that can expose tools to a model and execute its calls
#[async_trait::async_trait]
pub trait ToolHost: Send + Sync {
    /// Tool definitions offered by the named servers
    fn definitions(&self, servers: &[String]) -> Vec<ToolDefinition>;

    /// Execute a call by the tool name the model used, returning text for the model
    async fn invoke(&self, tool_name: &str, arguments: serde_json::Value) -> McpResult<String>;
}
