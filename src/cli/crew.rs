//! Crew CLI commands
//!
//! `callwise crew run`               - run every task
//! `callwise crew trigger <json>`    - run with a trigger payload
//! `callwise crew replay <task_id>`  - re-run from a task

use super::CrewCommands;
use crate::server::config::AppConfig;
use anyhow::{Context, Result};
use callwise_crew::{Crew, CrewInputs, CrewOutput, CrewSpec, ModelRouting, Models, RunLog};
use callwise_tools::mcp::{presets, McpClient, McpClientConfig};
use chrono::Datelike;
use std::sync::Arc;
use tracing::{info, warn};

/// Run a crew subcommand
pub async fn run(cmd: CrewCommands, config: &AppConfig) -> Result<()> {
    let settings = &config.crew;

    let spec = CrewSpec::load(&settings.definitions_dir).with_context(|| {
        format!(
            "Failed to load crew definitions from {}",
            settings.definitions_dir.display()
        )
    })?;

    let routing = ModelRouting::resolve(
        settings.model_large.as_deref(),
        settings.model_small.as_deref(),
        |name| std::env::var(name).ok(),
    );
    let models = Models::from_routing(&routing).context("Failed to configure LLM providers")?;

    let mcp_config = tool_servers(&config.mcp, &spec.tool_servers());
    let client = Arc::new(McpClient::from_config(&mcp_config).await);
    let crew = Crew::new(spec, models, settings).with_tools(client.clone());

    let result = match cmd {
        CrewCommands::Run => {
            let inputs = standard_inputs(config)?;
            crew.kickoff_with_retry(&inputs, &settings.retry).await
        }
        CrewCommands::Trigger { payload } => {
            let inputs = standard_inputs(config)?
                .with_trigger_payload(&payload)
                .context("Trigger payload must be valid JSON")?;
            crew.kickoff_with_retry(&inputs, &settings.retry).await
        }
        CrewCommands::Replay { task_id } => crew.replay(&task_id).await,
    };

    let output_dir = crew.output_dir().to_path_buf();
    drop(crew);
    if let Some(mut client) = Arc::into_inner(client) {
        client.shutdown().await;
    }

    let output = result.context("Crew run failed")?;
    print_summary(&output, &output_dir);
    Ok(())
}

fn standard_inputs(config: &AppConfig) -> Result<CrewInputs> {
    let year = chrono::Local::now().year();
    CrewInputs::standard(&config.crew.context_file, year).with_context(|| {
        format!(
            "Failed to read project context from {}",
            config.crew.context_file.display()
        )
    })
}

/// Configured servers plus presets for servers agents name but nobody configured
fn tool_servers(config: &McpClientConfig, referenced: &[String]) -> McpClientConfig {
    let mut config = config.clone();
    if !config.enabled {
        if !referenced.is_empty() {
            info!(servers = ?referenced, "MCP disabled, agents run without tools");
        }
        return config;
    }

    for name in referenced {
        if config.servers.iter().any(|s| &s.name == name) {
            continue;
        }
        match presets::by_name(name) {
            Some(preset) => config.servers.push(preset),
            None => warn!(server = %name, "No configuration or preset for MCP server"),
        }
    }
    config
}

fn print_summary(output: &CrewOutput, output_dir: &std::path::Path) {
    println!("\nCrew finished: {} tasks", output.tasks.len());
    for task in &output.tasks {
        match &task.output_file {
            Some(path) => println!("  {:<24} -> {}", task.task_id, path.display()),
            None => println!("  {:<24} ({} chars)", task.task_id, task.raw.len()),
        }
    }
    let usage = output.usage();
    println!(
        "Tokens: {} in / {} out",
        usage.input_tokens, usage.output_tokens
    );
    println!("Run log: {}", RunLog::path(output_dir).display());
}
