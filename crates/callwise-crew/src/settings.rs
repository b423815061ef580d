//! Crew runtime settings (`[crew]` configuration section)

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Crew runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrewSettings {
    /// Directory holding `agents.toml` and `tasks.toml`
    pub definitions_dir: PathBuf,
    /// Directory task output files and the run log are written to
    pub output_dir: PathBuf,
    /// Markdown file read into the `project_specification` input
    pub context_file: PathBuf,
    /// Crew-wide LLM requests per minute
    pub max_rpm: u32,
    /// Per-agent requests per minute when the agent sets none
    pub agent_max_rpm: u32,
    /// Tool-calling rounds per task before a final answer is forced
    pub max_tool_iterations: usize,
    /// Configured model for the large tier
    pub model_large: Option<String>,
    /// Configured model for the small tier
    pub model_small: Option<String>,
    /// Kickoff retry policy
    pub retry: RetryPolicy,
}

impl Default for CrewSettings {
    fn default() -> Self {
        Self {
            definitions_dir: PathBuf::from("config/crew"),
            output_dir: PathBuf::from("docs"),
            context_file: PathBuf::from("knowledge/project_context.md"),
            max_rpm: 5,
            agent_max_rpm: 10,
            max_tool_iterations: 8,
            model_large: None,
            model_small: None,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_section_keeps_defaults() {
        let settings: CrewSettings = toml::from_str(
            r#"
output_dir = "out"

[retry]
max_attempts = 5
"#,
        )
        .unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("out"));
        assert_eq!(settings.max_rpm, 5);
        assert_eq!(settings.max_tool_iterations, 8);
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.base_delay_secs, 60);
    }
}
