//! Callwise Crew - sequential multi-agent runner
//!
//! A crew is an ordered list of tasks, each bound to one agent persona.
//! Tasks run one after another; a task may read the outputs of earlier tasks
//! as context, and an agent may call tools on MCP servers.
//!
//! Definitions are TOML files (`agents.toml`, `tasks.toml`) with
//! `{placeholder}` slots filled from [`CrewInputs`] at kickoff.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod crew;
pub mod definition;
pub mod error;
pub mod inputs;
pub mod rate_limit;
pub mod retry;
pub mod routing;
pub mod run_log;
pub mod settings;

pub use crew::{Crew, CrewOutput, TaskOutput};
pub use definition::{AgentSpec, CrewSpec, ModelTier, TaskSpec};
pub use error::{CrewError, Result};
pub use inputs::{CrewInputs, TRIGGER_PAYLOAD_KEY};
pub use rate_limit::RateLimiter;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use routing::{ModelBinding, ModelRouting, Models};
pub use run_log::RunLog;
pub use settings::CrewSettings;
