//! CLI module for Callwise
//!
//! - `serve`: HTTP API and frontend
//! - `seed` / `rank`: data commands against the configured database
//! - `crew`: the document-generation agent crew

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

pub mod crew;
pub mod data;

/// Callwise call recommendation CLI
#[derive(Parser, Debug)]
#[command(name = "callwise")]
#[command(about = "Call recommendation service and planning crew")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve,
    /// Insert demo customers when the database is empty
    Seed,
    /// Print the call priority list
    Rank {
        /// Date to score against (YYYY-MM-DD), defaults to today
        #[arg(long, value_parser = parse_today)]
        today: Option<NaiveDate>,
    },
    /// Run the planning crew
    #[command(subcommand)]
    Crew(CrewCommands),
}

#[derive(Subcommand, Debug)]
pub enum CrewCommands {
    /// Run every task in order
    Run,
    /// Run with a JSON trigger payload added to the inputs
    Trigger {
        /// JSON payload
        payload: String,
    },
    /// Re-run from a task, reusing earlier outputs of the last run
    Replay {
        /// Task id to start from
        task_id: String,
    },
}

fn parse_today(value: &str) -> Result<NaiveDate, String> {
    callwise_core::parse_date(value).map_err(|e| e.to_string())
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    let config = crate::server::load_config()?;
    match command {
        Commands::Serve => crate::server::run(config).await,
        Commands::Seed => data::seed(&config).await,
        Commands::Rank { today } => data::rank(&config, today).await,
        Commands::Crew(cmd) => crew::run(cmd, &config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["callwise", "rank", "--today", "2026-03-01"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Rank { today: Some(d) }) if d == NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        ));

        let cli = Cli::try_parse_from(["callwise", "crew", "replay", "qa_task"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Crew(CrewCommands::Replay { task_id })) if task_id == "qa_task"
        ));

        let cli = Cli::try_parse_from(["callwise"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_rejects_bad_today() {
        assert!(Cli::try_parse_from(["callwise", "rank", "--today", "03/01/2026"]).is_err());
    }
}
