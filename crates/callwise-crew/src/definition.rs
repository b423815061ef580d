//! Agent and task definitions
//!
//! Loaded from two TOML files in the crew directory:
//!
//! ```toml
//! # agents.toml
//! [agents.requirements_analyst]
//! role = "Requirements Analyst"
//! goal = "..."
//! backstory = "..."
//! model = "large"
//!
//! # tasks.toml
//! [[tasks]]
//! id = "requirements_task"
//! agent = "requirements_analyst"
//! description = "..."
//! expected_output = "..."
//! output_file = "requirements.md"
//! ```
//!
//! Task order in `tasks.toml` is execution order.

use crate::error::{CrewError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// File holding agent personas
pub const AGENTS_FILE: &str = "agents.toml";
/// File holding the task list
pub const TASKS_FILE: &str = "tasks.toml";

/// Model size class an agent runs on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Judgement-heavy work (analysis, architecture, design)
    #[default]
    Large,
    /// Instruction-following work (code, test cases)
    Small,
}

impl ModelTier {
    /// Environment variable overriding this tier's model
    #[must_use]
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Large => "MODEL_LARGE",
            Self::Small => "MODEL_SMALL",
        }
    }
}

/// An agent persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Role title
    pub role: String,
    /// What the agent tries to achieve
    pub goal: String,
    /// Persona background
    pub backstory: String,
    /// Model tier
    #[serde(default)]
    pub model: ModelTier,
    /// Per-agent request cap, the crew default applies when unset
    #[serde(default)]
    pub max_rpm: Option<u32>,
    /// MCP servers whose tools this agent may call
    #[serde(default)]
    pub tools: Vec<String>,
}

/// One step of the crew
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Unique id, also the replay handle
    pub id: String,
    /// What to do
    pub description: String,
    /// What a finished answer looks like
    pub expected_output: String,
    /// Agent id that performs the task
    pub agent: String,
    /// Earlier task ids whose outputs are passed as context
    #[serde(default)]
    pub context: Vec<String>,
    /// File under the output directory the answer is written to
    #[serde(default)]
    pub output_file: Option<String>,
}

#[derive(Deserialize)]
struct AgentsFile {
    #[serde(default)]
    agents: BTreeMap<String, AgentSpec>,
}

#[derive(Deserialize)]
struct TasksFile {
    #[serde(default)]
    tasks: Vec<TaskSpec>,
}

/// A validated set of agents and tasks
#[derive(Debug, Clone, PartialEq)]
pub struct CrewSpec {
    agents: BTreeMap<String, AgentSpec>,
    tasks: Vec<TaskSpec>,
}

impl CrewSpec {
    /// Build and validate
    pub fn new(agents: BTreeMap<String, AgentSpec>, tasks: Vec<TaskSpec>) -> Result<Self> {
        let spec = Self { agents, tasks };
        spec.validate()?;
        Ok(spec)
    }

    /// Load `agents.toml` and `tasks.toml` from a directory
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let agents_path = dir.join(AGENTS_FILE);
        let tasks_path = dir.join(TASKS_FILE);

        let agents_src = std::fs::read_to_string(&agents_path)
            .map_err(|e| CrewError::io(&agents_path, e))?;
        let tasks_src =
            std::fs::read_to_string(&tasks_path).map_err(|e| CrewError::io(&tasks_path, e))?;

        let agents: AgentsFile = toml::from_str(&agents_src).map_err(|e| CrewError::Toml {
            path: agents_path.clone(),
            message: e.to_string(),
        })?;
        let tasks: TasksFile = toml::from_str(&tasks_src).map_err(|e| CrewError::Toml {
            path: tasks_path.clone(),
            message: e.to_string(),
        })?;

        let spec = Self::new(agents.agents, tasks.tasks)?;
        info!(
            dir = %dir.display(),
            agents = spec.agents.len(),
            tasks = spec.tasks.len(),
            "Loaded crew definitions"
        );
        Ok(spec)
    }

    /// Agents by id
    #[must_use]
    pub fn agents(&self) -> &BTreeMap<String, AgentSpec> {
        &self.agents
    }

    /// Look an agent up
    #[must_use]
    pub fn agent(&self, id: &str) -> Option<&AgentSpec> {
        self.agents.get(id)
    }

    /// Tasks in execution order
    #[must_use]
    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    /// Position of a task in execution order
    #[must_use]
    pub fn task_index(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// MCP server names referenced by any agent
    #[must_use]
    pub fn tool_servers(&self) -> Vec<String> {
        let mut servers: Vec<String> = self
            .agents
            .values()
            .flat_map(|a| a.tools.iter().cloned())
            .collect();
        servers.sort();
        servers.dedup();
        servers
    }

    fn validate(&self) -> Result<()> {
        if self.tasks.is_empty() {
            return Err(CrewError::Config("crew has no tasks".to_string()));
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (index, task) in self.tasks.iter().enumerate() {
            if seen.insert(task.id.as_str(), index).is_some() {
                return Err(CrewError::Config(format!("duplicate task id '{}'", task.id)));
            }

            if !self.agents.contains_key(&task.agent) {
                return Err(CrewError::Config(format!(
                    "task '{}' uses unknown agent '{}'",
                    task.id, task.agent
                )));
            }

            for dep in &task.context {
                if dep == &task.id {
                    return Err(CrewError::Config(format!(
                        "task '{}' lists itself as context",
                        task.id
                    )));
                }
                // `seen` only holds tasks up to this one, so a later id is a forward reference
                if !seen.contains_key(dep.as_str()) {
                    let exists = self.tasks.iter().any(|t| &t.id == dep);
                    return Err(CrewError::Config(if exists {
                        format!(
                            "task '{}' uses '{}' as context before it runs",
                            task.id, dep
                        )
                    } else {
                        format!("task '{}' uses unknown context task '{}'", task.id, dep)
                    }));
                }
            }
        }

        for (id, agent) in &self.agents {
            if agent.max_rpm == Some(0) {
                return Err(CrewError::Config(format!("agent '{}' has max_rpm = 0", id)));
            }
        }

        debug!(tasks = self.tasks.len(), "crew definitions valid");
        Ok(())
    }
}
