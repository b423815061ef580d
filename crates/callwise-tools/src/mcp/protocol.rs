//! JSON-RPC 2.0 messages and the MCP payloads carried in them

use callwise_llm::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const JSONRPC_VERSION: &str = "2.0";

/// Joins server and tool into the name the model sees: `mermaid__generate`
pub const TOOL_NAME_SEPARATOR: &str = "__";

/// Anything that can go wrong between the crew and a tool server
#[derive(Debug, Error)]
pub enum McpError {
    /// Process, pipe or HTTP failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed or unexpected message
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON-RPC error object from the server
    #[error("Server error {code}: {message}")]
    Server {
        /// JSON-RPC error code
        code: i64,
        /// Server's explanation
        message: String,
    },

    /// No response within [`super::REQUEST_TIMEOUT`]
    #[error("Request timed out")]
    Timeout,

    /// No connected server of that name
    #[error("Server '{0}' not found")]
    ServerNotFound(String),

    /// The server never listed this tool (tool, server)
    #[error("Tool '{0}' not found on server '{1}'")]
    ToolNotFound(String, String),
}

/// `Result` with [`McpError`]
pub type McpResult<T> = std::result::Result<T, McpError>;

/// Outgoing message; without an `id` it is a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    /// Always `"2.0"`
    pub jsonrpc: String,
    /// Method such as `tools/call`
    pub method: String,
    /// Correlates the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Method arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl McpRequest {
    fn build(method: impl Into<String>, id: Option<u64>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            id,
            params: None,
        }
    }

    /// Request expecting a response tagged `id`
    pub fn new(method: impl Into<String>, id: u64) -> Self {
        Self::build(method, Some(id))
    }

    /// Fire-and-forget message
    pub fn notification(method: impl Into<String>) -> Self {
        Self::build(method, None)
    }

    /// Attach arguments
    pub fn with_params(self, params: Value) -> Self {
        Self {
            params: Some(params),
            ..self
        }
    }
}

/// Incoming message; server-initiated notifications have no `id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    /// Always `"2.0"`
    pub jsonrpc: String,
    /// Id of the request answered
    #[serde(default)]
    pub id: Option<u64>,
    /// Success payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpRpcError>,
}

impl McpResponse {
    /// Success payload, or the error object as [`McpError::Server`]
    pub fn into_result(self) -> McpResult<Option<Value>> {
        if let Some(McpRpcError { code, message, .. }) = self.error {
            return Err(McpError::Server { code, message });
        }
        Ok(self.result)
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRpcError {
    /// Numeric code (`-32601` method not found, ...)
    pub code: i64,
    /// Human-readable message
    pub message: String,
    /// Server-specific details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Entry of a `tools/list` result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    /// Name unique within its server
    pub name: String,
    /// Shown to the model
    #[serde(default)]
    pub description: String,
    /// JSON schema of the arguments; servers may omit it for argument-less tools
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl McpTool {
    /// Definition offered to the model under `<server>__<tool>`
    pub fn to_tool_definition(&self, server_name: &str) -> ToolDefinition {
        ToolDefinition::new(
            qualified_tool_name(server_name, &self.name),
            &self.description,
            self.input_schema.clone(),
        )
    }
}

/// `<server>__<tool>`
pub fn qualified_tool_name(server_name: &str, tool_name: &str) -> String {
    [server_name, tool_name].join(TOOL_NAME_SEPARATOR)
}

/// Inverse of [`qualified_tool_name`]; splits at the first separator so tool
/// names may themselves contain underscores
pub fn split_tool_name(full_name: &str) -> McpResult<(&str, &str)> {
    full_name
        .split_once(TOOL_NAME_SEPARATOR)
        .filter(|(server, tool)| !server.is_empty() && !tool.is_empty())
        .ok_or_else(|| {
            McpError::Protocol(format!(
                "Invalid MCP tool name '{}'. Expected '<server>{}<tool>'",
                full_name, TOOL_NAME_SEPARATOR
            ))
        })
}

/// Result of `tools/call`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolResult {
    /// Output items in order
    #[serde(default)]
    pub content: Vec<McpContent>,
    /// The tool ran but reported failure
    #[serde(default)]
    pub is_error: bool,
}

impl McpToolResult {
    /// Text fed back to the model: one line per item, binary items as
    /// placeholders, `Error: ` prefixed when the tool failed
    pub fn to_text(&self) -> String {
        let body = self
            .content
            .iter()
            .map(McpContent::describe)
            .collect::<Vec<_>>()
            .join("\n");

        if self.is_error {
            format!("Error: {}", body)
        } else {
            body
        }
    }
}

/// One output item of a tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpContent {
    /// Plain text
    Text {
        /// The text
        text: String,
    },
    /// Inline image
    Image {
        /// Base64 payload
        data: String,
        /// e.g. `image/png`
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Embedded resource, textual or binary
    Resource {
        /// Where it lives
        uri: String,
        /// Text body
        #[serde(default)]
        text: Option<String>,
        /// Base64 body
        #[serde(default)]
        blob: Option<String>,
    },
}

impl McpContent {
    /// Textual body, if the item has one
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::Resource { text: Some(text), .. } => Some(text),
            Self::Image { .. } | Self::Resource { text: None, .. } => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Image { mime_type, .. } => format!("[image: {}]", mime_type),
            Self::Resource { uri, text: None, .. } => format!("[resource: {}]", uri),
            other => other.as_text().unwrap_or_default().to_string(),
        }
    }
}

/// Result of `initialize`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpInitResult {
    /// Revision the server agreed to
    pub protocol_version: String,
    /// Who answered
    #[serde(default)]
    pub server_info: Option<ServerInfo>,
}

/// `serverInfo` of an `initialize` result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Implementation name
    pub name: String,
    /// Implementation version
    #[serde(default)]
    pub version: Option<String>,
}
