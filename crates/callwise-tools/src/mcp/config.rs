//! MCP server configuration
//!
//! A server is described by a name plus a tagged transport: a remote HTTP
//! endpoint or a local process speaking JSON-RPC over stdio.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// MCP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Server name (unique identifier)
    pub name: String,
    /// Transport configuration
    pub transport: McpTransport,
    /// Whether to connect when the client starts
    #[serde(default = "default_true")]
    pub auto_start: bool,
}

fn default_true() -> bool {
    true
}

/// HTTP flavour spoken by a remote server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpProtocol {
    /// Single endpoint, JSON or event-stream replies per POST
    #[default]
    #[serde(rename = "streamable-http")]
    StreamableHttp,
    /// Legacy server-sent events stream plus a POST endpoint
    #[serde(rename = "sse")]
    Sse,
}

/// MCP transport type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpTransport {
    /// Remote server over HTTP
    Http {
        /// Server URL
        url: String,
        /// HTTP flavour
        #[serde(default)]
        protocol: HttpProtocol,
        /// Environment variable holding the API key
        #[serde(default)]
        api_key_env: Option<String>,
        /// Header the API key is sent in
        #[serde(default)]
        api_key_header: Option<String>,
    },
    /// Local process over stdin/stdout
    Stdio {
        /// Command to run
        command: String,
        /// Command arguments
        #[serde(default)]
        args: Vec<String>,
        /// Extra environment variables, `${VAR}` values are expanded
        #[serde(default)]
        env: HashMap<String, String>,
    },
}

impl McpTransport {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http {
                protocol: HttpProtocol::StreamableHttp,
                ..
            } => "streamable-http",
            Self::Http {
                protocol: HttpProtocol::Sse,
                ..
            } => "sse",
            Self::Stdio { .. } => "stdio",
        }
    }
}

/// API key header for an HTTP server
///
/// Present only when both the variable name and the header name are set.
/// The value comes from `lookup(var)`, empty when the variable is unset.
pub fn api_key_header(
    api_key_env: Option<&str>,
    api_key_header: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<(String, String)> {
    let env = api_key_env.filter(|s| !s.is_empty())?;
    let header = api_key_header.filter(|s| !s.is_empty())?;
    let value = lookup(env).unwrap_or_else(|| {
        warn!(var = %env, "API key variable not set, sending empty header");
        String::new()
    });
    Some((header.to_string(), value))
}

/// Expand a whole-value `${VAR}` reference, empty when the variable is unset
pub fn expand_env_value(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    match value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(var) => lookup(var).unwrap_or_else(|| {
            warn!(var = %var, "environment variable not found, using empty string");
            String::new()
        }),
        None => value.to_string(),
    }
}

/// Process environment lookup
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Named server presets
pub mod presets {
    use super::*;

    /// Google Stitch UI design server (streamable HTTP, key in `STITCH_API_KEY`)
    pub fn stitch() -> McpServerConfig {
        McpServerConfig {
            name: "stitch".to_string(),
            transport: McpTransport::Http {
                url: "https://stitch.googleapis.com/mcp".to_string(),
                protocol: HttpProtocol::StreamableHttp,
                api_key_env: Some("STITCH_API_KEY".to_string()),
                api_key_header: Some("X-Goog-Api-Key".to_string()),
            },
            auto_start: true,
        }
    }

    /// Mermaid diagram renderer, spawned through `npx`
    ///
    /// With `CONTENT_IMAGE_SUPPORTED=false` the `generate` tool writes image
    /// files and needs `name` and `folder` arguments.
    pub fn mermaid() -> McpServerConfig {
        McpServerConfig {
            name: "mermaid".to_string(),
            transport: McpTransport::Stdio {
                command: "npx".to_string(),
                args: vec!["-y".to_string(), "@peng-shawn/mermaid-mcp-server".to_string()],
                env: HashMap::from([(
                    "CONTENT_IMAGE_SUPPORTED".to_string(),
                    "false".to_string(),
                )]),
            },
            auto_start: true,
        }
    }

    /// Look a preset up by name
    pub fn by_name(name: &str) -> Option<McpServerConfig> {
        match name {
            "stitch" => Some(stitch()),
            "mermaid" => Some(mermaid()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_stdio_config_deserialization() {
        let json = r#"{
            "name": "mermaid",
            "transport": {
                "type": "stdio",
                "command": "npx",
                "args": ["-y", "@peng-shawn/mermaid-mcp-server"],
                "env": {"CONTENT_IMAGE_SUPPORTED": "false"}
            }
        }"#;

        let config: McpServerConfig = serde_json::from_str(json).unwrap();
        assert!(config.auto_start);
        assert_eq!(config, presets::mermaid());
        assert_eq!(config.transport.kind(), "stdio");
    }

    #[test]
    fn test_http_config_deserialization() {
        let config: McpServerConfig = parse_config(
            r#"{"name":"stitch","transport":{"type":"http","url":"https://stitch.googleapis.com/mcp",
                "api_key_env":"STITCH_API_KEY","api_key_header":"X-Goog-Api-Key"}}"#,
        );
        assert_eq!(config, presets::stitch());
        assert_eq!(config.transport.kind(), "streamable-http");

        let legacy: McpServerConfig = parse_config(
            r#"{"name":"old","transport":{"type":"http","url":"http://localhost:8000/sse","protocol":"sse"}}"#,
        );
        match legacy.transport {
            McpTransport::Http {
                protocol,
                api_key_env,
                ..
            } => {
                assert_eq!(protocol, HttpProtocol::Sse);
                assert_eq!(api_key_env, None);
            }
            other => panic!("expected http transport, got {:?}", other),
        }
    }

    fn parse_config(json: &str) -> McpServerConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_api_key_header_requires_both_names() {
        let env = env_of(&[("STITCH_API_KEY", "k-123")]);

        assert_eq!(
            api_key_header(Some("STITCH_API_KEY"), Some("X-Goog-Api-Key"), &env),
            Some(("X-Goog-Api-Key".to_string(), "k-123".to_string()))
        );
        assert_eq!(api_key_header(Some("STITCH_API_KEY"), None, &env), None);
        assert_eq!(api_key_header(None, Some("X-Goog-Api-Key"), &env), None);
        assert_eq!(api_key_header(Some(""), Some("X-Goog-Api-Key"), &env), None);
    }

    #[test]
    fn test_api_key_header_unset_variable_is_empty() {
        let env = env_of(&[]);
        assert_eq!(
            api_key_header(Some("MISSING_KEY"), Some("X-Api-Key"), env),
            Some(("X-Api-Key".to_string(), String::new()))
        );
    }

    #[test]
    fn test_expand_env_value() {
        let env = env_of(&[("HOME_DIR", "/home/sales")]);
        assert_eq!(expand_env_value("${HOME_DIR}", &env), "/home/sales");
        assert_eq!(expand_env_value("${NOPE}", &env), "");
        assert_eq!(expand_env_value("false", &env), "false");
        assert_eq!(expand_env_value("prefix-${HOME_DIR}", &env), "prefix-${HOME_DIR}");
    }

    #[test]
    fn test_presets_by_name() {
        assert!(presets::by_name("stitch").is_some());
        assert!(presets::by_name("mermaid").is_some());
        assert!(presets::by_name("figma").is_none());
    }
}
