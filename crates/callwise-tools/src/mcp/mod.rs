//! Model Context Protocol client
//!
//! Tool servers are reached over one of two transports:
//!
//! - `stdio`: a spawned child speaking line-delimited JSON-RPC
//! - `http`: `streamable-http` (a POST per request, answered with JSON or an
//!   event stream) or the older `sse` flavour (a long-lived event stream that
//!   announces where to POST)
//!
//! ```no_run
//! use callwise_tools::mcp::{presets, McpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = McpClient::new();
//! client.add_server(presets::mermaid()).await?;
//! for tool in client.list_server_tools("mermaid")? {
//!     println!("{}: {}", tool.name, tool.description);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod protocol;
mod transport;

pub use client::{McpClient, McpClientConfig, PROTOCOL_VERSION};
pub use config::{api_key_header, expand_env_value, presets, HttpProtocol, McpServerConfig, McpTransport};
pub use protocol::{
    qualified_tool_name, split_tool_name, McpContent, McpError, McpRequest, McpResponse,
    McpResult, McpTool, McpToolResult,
};
pub use transport::{McpConnection, REQUEST_TIMEOUT};
