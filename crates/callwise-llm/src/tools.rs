//! Function calling: what the model is offered and what it asks for

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A callable tool as advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Name the model calls it by
    pub name: String,
    /// What it does, in the model's words
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Describe a tool
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Id the result must be tagged with
    pub id: String,
    /// Tool name
    pub name: String,
    /// Raw JSON arguments as the model produced them
    pub arguments: String,
}

impl ToolCall {
    /// Decoded arguments; some models send `""` for "no arguments"
    pub fn arguments_json(&self) -> Result<serde_json::Value> {
        match self.arguments.trim() {
            "" => Ok(serde_json::Value::Object(Default::default())),
            raw => serde_json::from_str(raw).map_err(|e| Error::InvalidResponse(e.to_string())),
        }
    }
}

/// How the model may use the offered tools
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// Model decides
    #[default]
    Auto,
    /// Answer in text only
    None,
    /// At least one call
    Required,
    /// This tool specifically
    Tool(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_json() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "generate_diagram".to_string(),
            arguments: r#"{"code": "graph TD; A-->B"}"#.to_string(),
        };
        assert_eq!(call.arguments_json().unwrap()["code"], "graph TD; A-->B");

        let blank = ToolCall {
            arguments: "  ".to_string(),
            ..call.clone()
        };
        assert_eq!(blank.arguments_json().unwrap(), serde_json::json!({}));

        let broken = ToolCall {
            arguments: "{not json".to_string(),
            ..call
        };
        assert!(matches!(broken.arguments_json(), Err(Error::InvalidResponse(_))));
    }
}
