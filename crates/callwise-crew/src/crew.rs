//! Sequential crew execution
//!
//! Every task goes through the same steps: interpolate the agent persona and
//! task text, collect the outputs of its context tasks, wait for the crew and
//! agent rate limiters, talk to the agent's model (with a bounded tool loop
//! when the agent has MCP servers), then store and optionally write the answer.

use crate::definition::{AgentSpec, CrewSpec, TaskSpec};
use crate::error::{CrewError, Result};
use crate::inputs::CrewInputs;
use crate::rate_limit::RateLimiter;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::routing::{ModelBinding, Models};
use crate::run_log::RunLog;
use crate::settings::CrewSettings;
use callwise_llm::{ChatReply, ChatRequest, Message, ToolChoice, ToolDefinition, Usage};
use callwise_tools::ToolHost;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const CONTEXT_SEPARATOR: &str = "\n\n----------\n\n";

const FINAL_ANSWER_PROMPT: &str =
    "You have used all available tool calls. Give your final answer now without calling any tools.";

/// Answer of one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Task id
    pub task_id: String,
    /// Agent id that produced it
    pub agent: String,
    /// Final answer text
    pub raw: String,
    /// File the answer was written to
    pub output_file: Option<PathBuf>,
    /// Tokens spent across every turn of the task
    #[serde(default)]
    pub usage: Usage,
    /// Completion time
    pub completed_at: DateTime<Utc>,
}

/// Result of a kickoff or replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewOutput {
    /// Task outputs in execution order
    pub tasks: Vec<TaskOutput>,
}

impl CrewOutput {
    /// Answer of the last task
    #[must_use]
    pub fn final_output(&self) -> Option<&str> {
        self.tasks.last().map(|t| t.raw.as_str())
    }

    /// Tokens spent by all tasks, including ones reused by a replay
    #[must_use]
    pub fn usage(&self) -> Usage {
        self.tasks
            .iter()
            .fold(Usage::default(), |total, task| total + task.usage)
    }
}

/// A runnable crew
pub struct Crew {
    spec: CrewSpec,
    models: Models,
    tools: Option<Arc<dyn ToolHost>>,
    output_dir: PathBuf,
    max_tool_iterations: usize,
    crew_limiter: RateLimiter,
    agent_limiters: HashMap<String, RateLimiter>,
}

impl Crew {
    /// Assemble a crew from validated definitions
    #[must_use]
    pub fn new(spec: CrewSpec, models: Models, settings: &CrewSettings) -> Self {
        let agent_limiters = spec
            .agents()
            .iter()
            .map(|(id, agent)| {
                let rpm = agent.max_rpm.unwrap_or(settings.agent_max_rpm);
                (id.clone(), RateLimiter::per_minute(rpm))
            })
            .collect();

        Self {
            spec,
            models,
            tools: None,
            output_dir: settings.output_dir.clone(),
            max_tool_iterations: settings.max_tool_iterations,
            crew_limiter: RateLimiter::per_minute(settings.max_rpm),
            agent_limiters,
        }
    }

    /// Attach the tool host agents call through
    #[must_use]
    pub fn with_tools(mut self, tools: Arc<dyn ToolHost>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Definitions this crew runs
    #[must_use]
    pub fn spec(&self) -> &CrewSpec {
        &self.spec
    }

    /// Directory outputs and the run log go to
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run every task in order
    pub async fn kickoff(&self, inputs: &CrewInputs) -> Result<CrewOutput> {
        self.prepare_output_dir().await?;
        info!(
            tasks = self.spec.tasks().len(),
            output_dir = %self.output_dir.display(),
            "Crew kickoff"
        );

        let mut log = RunLog::new(inputs.clone());
        log.save(&self.output_dir).await?;
        self.run_from(0, &mut log).await
    }

    /// Kickoff under a retry policy; only transient LLM failures are retried
    pub async fn kickoff_with_retry(
        &self,
        inputs: &CrewInputs,
        policy: &RetryPolicy,
    ) -> Result<CrewOutput> {
        retry_with_backoff(policy, || self.kickoff(inputs), CrewError::is_retryable).await
    }

    /// Re-run from `task_id` on, reusing stored outputs of the tasks before it
    pub async fn replay(&self, task_id: &str) -> Result<CrewOutput> {
        let start = self
            .spec
            .task_index(task_id)
            .ok_or_else(|| CrewError::UnknownTask(task_id.to_string()))?;

        let mut log = RunLog::load(&self.output_dir)
            .await?
            .ok_or_else(|| CrewError::NoRunLog(RunLog::path(&self.output_dir)))?;

        if let Some(missing) = self.spec.tasks()[..start]
            .iter()
            .find(|t| log.output_of(&t.id).is_none())
        {
            return Err(CrewError::Config(format!(
                "cannot replay from '{}': no stored output for earlier task '{}'",
                task_id, missing.id
            )));
        }

        info!(task = %task_id, reused = start, "Crew replay");
        self.prepare_output_dir().await?;
        self.run_from(start, &mut log).await
    }

    async fn prepare_output_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| CrewError::io(&self.output_dir, e))
    }

    async fn run_from(&self, start: usize, log: &mut RunLog) -> Result<CrewOutput> {
        for task in &self.spec.tasks()[start..] {
            let output = {
                let context: Vec<&TaskOutput> = task
                    .context
                    .iter()
                    .filter_map(|id| log.output_of(id))
                    .collect();
                self.execute_task(task, &context, &log.inputs).await?
            };
            log.record(output);
            log.save(&self.output_dir).await?;
        }

        let tasks = self
            .spec
            .tasks()
            .iter()
            .filter_map(|t| log.output_of(&t.id).cloned())
            .collect();
        Ok(CrewOutput { tasks })
    }

    async fn execute_task(
        &self,
        task: &TaskSpec,
        context: &[&TaskOutput],
        inputs: &CrewInputs,
    ) -> Result<TaskOutput> {
        let agent = self
            .spec
            .agent(&task.agent)
            .ok_or_else(|| CrewError::Config(format!("unknown agent '{}'", task.agent)))?;

        let messages = vec![
            Message::system(system_prompt(agent, inputs)?),
            Message::user(task_prompt(task, context, inputs)?),
        ];

        let started = Instant::now();
        info!(task = %task.id, agent = %task.agent, role = %agent.role, "Task started");

        let binding = self.models.for_tier(agent.model);
        let (raw, usage) = self.converse(&task.agent, agent, binding, messages).await?;

        let output_file = match &task.output_file {
            Some(file) => Some(self.write_output(file, &raw).await?),
            None => None,
        };

        info!(
            task = %task.id,
            duration_ms = started.elapsed().as_millis() as u64,
            tokens = usage.total(),
            output_file = ?output_file,
            "Task completed"
        );

        Ok(TaskOutput {
            task_id: task.id.clone(),
            agent: task.agent.clone(),
            raw,
            output_file,
            usage,
            completed_at: Utc::now(),
        })
    }

    async fn converse(
        &self,
        agent_id: &str,
        agent: &AgentSpec,
        binding: &ModelBinding,
        mut messages: Vec<Message>,
    ) -> Result<(String, Usage)> {
        let Some((host, tools)) = self.tools_for(agent, binding) else {
            let reply = self
                .ask(agent_id, binding, ChatRequest::new(&binding.model, messages))
                .await?;
            return Ok((reply.text, reply.usage));
        };

        let mut usage = Usage::default();
        for iteration in 1..=self.max_tool_iterations {
            let request =
                ChatRequest::new(&binding.model, messages.clone()).with_tools(tools.clone());
            let ChatReply {
                text,
                tool_calls,
                usage: spent,
                ..
            } = self.ask(agent_id, binding, request).await?;
            usage += spent;

            if tool_calls.is_empty() {
                return Ok((text, usage));
            }

            debug!(
                agent = %agent_id,
                iteration,
                calls = tool_calls.len(),
                "model requested tools"
            );
            messages.push(Message::assistant_with_tool_calls(text, tool_calls.clone()));

            for call in &tool_calls {
                let result = match call.arguments_json() {
                    Ok(arguments) => match host.invoke(&call.name, arguments).await {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(agent = %agent_id, tool = %call.name, error = %e, "Tool call failed");
                            format!("Error: {}", e)
                        }
                    },
                    Err(e) => format!("Error: invalid tool arguments: {}", e),
                };
                messages.push(Message::tool_response(&call.id, result));
            }
        }

        warn!(
            agent = %agent_id,
            max_iterations = self.max_tool_iterations,
            "Tool iteration limit reached, requesting final answer"
        );
        messages.push(Message::user(FINAL_ANSWER_PROMPT));
        let request = ChatRequest::new(&binding.model, messages)
            .with_tools(tools)
            .with_tool_choice(ToolChoice::None);
        let reply = self.ask(agent_id, binding, request).await?;
        Ok((reply.text, usage + reply.usage))
    }

    /// One throttled model turn
    async fn ask(
        &self,
        agent_id: &str,
        binding: &ModelBinding,
        request: ChatRequest,
    ) -> Result<ChatReply> {
        self.throttle(agent_id).await;
        let reply = binding.provider.chat(&request).await?;
        if reply.truncated() {
            warn!(agent = %agent_id, model = %binding.model, "Answer cut off at the token limit");
        }
        Ok(reply)
    }

    fn tools_for<'a>(
        &'a self,
        agent: &AgentSpec,
        binding: &ModelBinding,
    ) -> Option<(&'a Arc<dyn ToolHost>, Vec<ToolDefinition>)> {
        if agent.tools.is_empty() {
            return None;
        }
        let host = self.tools.as_ref()?;
        if !binding.provider.supports_tools() {
            warn!(
                provider = %binding.provider.name(),
                "provider does not support tools, running agent without them"
            );
            return None;
        }
        let definitions = host.definitions(&agent.tools);
        if definitions.is_empty() {
            None
        } else {
            Some((host, definitions))
        }
    }

    async fn throttle(&self, agent_id: &str) {
        self.crew_limiter.acquire().await;
        if let Some(limiter) = self.agent_limiters.get(agent_id) {
            limiter.acquire().await;
        }
    }

    async fn write_output(&self, file: &str, content: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(file);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CrewError::io(parent, e))?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| CrewError::io(&path, e))?;
        Ok(path)
    }
}

fn system_prompt(agent: &AgentSpec, inputs: &CrewInputs) -> Result<String> {
    Ok(format!(
        "You are {}. {}\nYour personal goal is: {}",
        inputs.interpolate(&agent.role)?,
        inputs.interpolate(&agent.backstory)?,
        inputs.interpolate(&agent.goal)?
    ))
}

fn task_prompt(task: &TaskSpec, context: &[&TaskOutput], inputs: &CrewInputs) -> Result<String> {
    let mut prompt = format!(
        "Current Task: {}\n\nThis is the expected criteria for your final answer: {}\nyou MUST return the actual complete content as the final answer, not a summary.",
        inputs.interpolate(&task.description)?,
        inputs.interpolate(&task.expected_output)?
    );

    if !context.is_empty() {
        let joined = context
            .iter()
            .map(|c| c.raw.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(&joined);
    }

    Ok(prompt)
}
