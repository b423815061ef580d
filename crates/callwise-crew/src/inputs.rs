//! Kickoff inputs and `{placeholder}` interpolation

use crate::error::{CrewError, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

/// Input key carrying the `trigger` command's JSON payload
pub const TRIGGER_PAYLOAD_KEY: &str = "crewai_trigger_payload";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("PLACEHOLDER is a compile-time constant")
});

/// Named string values substituted into agent and task text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrewInputs(BTreeMap<String, String>);

impl CrewInputs {
    /// Empty inputs
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard inputs: `project_specification` read from `context_file`
    /// and `current_year`
    pub fn standard(context_file: impl AsRef<Path>, current_year: i32) -> Result<Self> {
        let path = context_file.as_ref();
        let specification =
            std::fs::read_to_string(path).map_err(|e| CrewError::io(path, e))?;
        Ok(Self::new()
            .with("project_specification", specification)
            .with("current_year", current_year.to_string()))
    }

    /// Add or replace a value
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Attach a trigger payload, rejecting anything that is not JSON
    pub fn with_trigger_payload(self, payload: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| CrewError::InvalidPayload(e.to_string()))?;
        Ok(self.with(TRIGGER_PAYLOAD_KEY, value.to_string()))
    }

    /// Look a value up
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Fill every `{name}` slot in one pass; substituted text is not rescanned
    pub fn interpolate(&self, template: &str) -> Result<String> {
        let mut missing = None;
        let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
            let key = &caps[1];
            match self.0.get(key) {
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| key.to_string());
                    caps[0].to_string()
                }
            }
        });

        match missing {
            Some(key) => Err(CrewError::MissingInput(key)),
            None => Ok(rendered.into_owned()),
        }
    }
}
