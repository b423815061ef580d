//! Connections to every configured tool server

use super::config::McpServerConfig;
use super::protocol::{
    split_tool_name, McpError, McpInitResult, McpRequest, McpResult, McpTool, McpToolResult,
};
use super::transport::McpConnection;
use crate::ToolHost;
use callwise_llm::ToolDefinition;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Protocol revision sent in `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// `[mcp]` section of the application config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpClientConfig {
    /// Master switch; off means no server is started
    #[serde(default)]
    pub enabled: bool,
    /// Servers agents may refer to by name
    #[serde(default)]
    pub servers: Vec<McpServerConfig>,
}

struct Server {
    connection: McpConnection,
    tools: Vec<McpTool>,
}

impl Server {
    fn offers(&self, tool_name: &str) -> bool {
        self.tools.iter().any(|t| t.name == tool_name)
    }
}

/// Handshaken servers and the tools they listed
#[derive(Default)]
pub struct McpClient {
    servers: BTreeMap<String, Server>,
}

fn decode<T: DeserializeOwned>(what: &str, value: Value) -> McpResult<T> {
    serde_json::from_value(value)
        .map_err(|e| McpError::Protocol(format!("Failed to parse {}: {}", what, e)))
}

impl McpClient {
    /// No servers
    pub fn new() -> Self {
        Self::default()
    }

    /// Start every `auto_start` server of an enabled config; a server that
    /// fails is logged and skipped so the crew can run without it
    pub async fn from_config(config: &McpClientConfig) -> Self {
        let mut client = Self::new();
        if !config.enabled {
            info!("MCP is disabled in configuration");
            return client;
        }

        for server in config.servers.iter().filter(|s| s.auto_start) {
            if let Err(e) = client.add_server(server.clone()).await {
                warn!(
                    server = %server.name,
                    error = %e,
                    "Failed to start MCP server (continuing without it)"
                );
            }
        }
        client
    }

    /// Connect, run the `initialize` handshake and cache `tools/list`;
    /// an existing server of the same name is replaced
    pub async fn add_server(&mut self, config: McpServerConfig) -> McpResult<()> {
        if let Some(old) = self.servers.remove(&config.name) {
            warn!(server = %config.name, "Server already connected, replacing");
            old.connection.close().await;
        }

        let connection = McpConnection::connect(&config).await?;
        let tools = match Self::handshake(&connection).await {
            Ok(tools) => tools,
            Err(e) => {
                connection.close().await;
                return Err(e);
            }
        };

        info!(
            server = %config.name,
            tools = ?tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "MCP server initialized"
        );
        self.servers
            .insert(config.name, Server { connection, tools });
        Ok(())
    }

    async fn handshake(connection: &McpConnection) -> McpResult<Vec<McpTool>> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "clientInfo": { "name": "callwise", "version": env!("CARGO_PKG_VERSION") },
        });
        if let Some(result) = connection.call("initialize", Some(params)).await? {
            let init: McpInitResult = decode("init result", result)?;
            debug!(
                server = %connection.name,
                protocol = %init.protocol_version,
                server_info = ?init.server_info.map(|s| s.name),
                "MCP handshake complete"
            );
        }
        connection
            .notify(McpRequest::notification("notifications/initialized"))
            .await?;

        #[derive(Deserialize)]
        struct Listing {
            tools: Vec<McpTool>,
        }
        match connection.call("tools/list", None).await? {
            Some(result) => Ok(decode::<Listing>("tools", result)?.tools),
            None => Ok(Vec::new()),
        }
    }

    /// Names of connected servers, sorted
    pub fn list_servers(&self) -> Vec<&str> {
        self.servers.keys().map(String::as_str).collect()
    }

    /// Tools a server listed at connect time
    pub fn list_server_tools(&self, server_name: &str) -> McpResult<&[McpTool]> {
        self.server(server_name).map(|s| s.tools.as_slice())
    }

    fn server(&self, name: &str) -> McpResult<&Server> {
        self.servers
            .get(name)
            .ok_or_else(|| McpError::ServerNotFound(name.to_string()))
    }

    /// `tools/call` on a connected server; tools it never listed are refused locally
    pub async fn call_tool(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: Value,
    ) -> McpResult<McpToolResult> {
        let server = self.server(server_name)?;
        if !server.offers(tool_name) {
            return Err(McpError::ToolNotFound(
                tool_name.to_string(),
                server_name.to_string(),
            ));
        }

        let params = json!({ "name": tool_name, "arguments": arguments });
        match server.connection.call("tools/call", Some(params)).await? {
            Some(result) => decode("tool result", result),
            None => Err(McpError::Protocol("No result returned".to_string())),
        }
    }

    /// Close every connection
    pub async fn shutdown(&mut self) {
        for (name, server) in std::mem::take(&mut self.servers) {
            debug!(server = %name, "closing MCP connection");
            server.connection.close().await;
        }
    }
}

#[async_trait::async_trait]
impl ToolHost for McpClient {
    fn definitions(&self, servers: &[String]) -> Vec<ToolDefinition> {
        let mut definitions = Vec::new();
        for name in servers {
            match self.servers.get(name) {
                Some(server) => definitions.extend(
                    server.tools.iter().map(|t| t.to_tool_definition(name)),
                ),
                None => {
                    warn!(server = %name, "MCP server not connected, its tools are unavailable")
                }
            }
        }
        definitions
    }

    async fn invoke(&self, tool_name: &str, arguments: Value) -> McpResult<String> {
        let (server, tool) = split_tool_name(tool_name)?;
        Ok(self.call_tool(server, tool, arguments).await?.to_text())
    }
}
