//! Server configuration types

use anyhow::{bail, Result};
use callwise_core::ScoringPolicy;
use callwise_crew::CrewSettings;
use callwise_store::SeedOptions;
use callwise_tools::mcp::McpClientConfig;
use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scoring: ScoringPolicy,
    #[serde(default)]
    pub seed: SeedOptions,
    #[serde(default)]
    pub crew: CrewSettings,
    #[serde(default)]
    pub mcp: McpClientConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Frontend directory served at `/` when present
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub seed_on_startup: bool,
}

/// SQLite configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    5
}

impl AppConfig {
    /// Reject values the services cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            bail!("server.host must not be empty");
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be at least 1");
        }
        self.scoring.validate()?;
        if self.crew.max_tool_iterations == 0 {
            bail!("crew.max_tool_iterations must be at least 1");
        }
        Ok(())
    }
}
