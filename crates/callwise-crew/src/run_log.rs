//! Stored task outputs of the last kickoff, used by replay

use crate::crew::TaskOutput;
use crate::error::{CrewError, Result};
use crate::inputs::CrewInputs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Run log file name inside the output directory
pub const RUN_LOG_FILE: &str = ".crew_run.json";

/// Inputs and finished task outputs of one kickoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    /// When the kickoff began
    pub started_at: DateTime<Utc>,
    /// Inputs the run was started with
    pub inputs: CrewInputs,
    /// Outputs in execution order
    pub tasks: Vec<TaskOutput>,
}

impl RunLog {
    /// Fresh log for a kickoff
    #[must_use]
    pub fn new(inputs: CrewInputs) -> Self {
        Self {
            started_at: Utc::now(),
            inputs,
            tasks: Vec::new(),
        }
    }

    /// Location of the log under an output directory
    #[must_use]
    pub fn path(output_dir: &Path) -> PathBuf {
        output_dir.join(RUN_LOG_FILE)
    }

    /// Stored output of a task
    #[must_use]
    pub fn output_of(&self, task_id: &str) -> Option<&TaskOutput> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    /// Record a finished task, replacing an earlier output of the same task
    pub fn record(&mut self, output: TaskOutput) {
        self.tasks.retain(|t| t.task_id != output.task_id);
        self.tasks.push(output);
    }

    /// Read the log, `None` when no run has been stored
    pub async fn load(output_dir: &Path) -> Result<Option<Self>> {
        let path = Self::path(output_dir);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CrewError::io(&path, e)),
        };
        let log = serde_json::from_str(&raw).map_err(|e| CrewError::RunLog(e.to_string()))?;
        Ok(Some(log))
    }

    /// Write the log
    pub async fn save(&self, output_dir: &Path) -> Result<()> {
        let path = Self::path(output_dir);
        let json =
            serde_json::to_string_pretty(self).map_err(|e| CrewError::RunLog(e.to_string()))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| CrewError::io(&path, e))?;
        debug!(path = %path.display(), tasks = self.tasks.len(), "run log saved");
        Ok(())
    }
}
