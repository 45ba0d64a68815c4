//! Pipeline and step definitions

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{ConfigError, UnknownStep};

/// A single check step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStep {
    /// Step name
    pub name: String,
    /// Shell command line to run
    pub command: String,
    /// Whether a failure stops the run
    #[serde(default = "default_gating")]
    pub gating: bool,
    /// Message printed before the step starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Lines printed when a gating step fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failure: Vec<String>,
    /// Timeout in seconds, none by default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

fn default_gating() -> bool {
    true
}

impl CheckStep {
    pub fn gating(name: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            command: command.to_string(),
            gating: true,
            status: None,
            failure: Vec::new(),
            timeout: None,
        }
    }

    /// A step whose outcome never affects the run
    pub fn advisory(name: &str, command: &str) -> Self {
        Self {
            gating: false,
            ..Self::gating(name, command)
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn with_failure(mut self, lines: &[&str]) -> Self {
        self.failure = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn status_message(&self) -> String {
        self.status
            .clone()
            .unwrap_or_else(|| format!("Running {}...", self.name))
    }

    pub fn failure_messages(&self) -> Vec<String> {
        if self.failure.is_empty() {
            vec![
                format!("{} failed.", self.name),
                format!("Please fix the {} issues before committing.", self.name),
            ]
        } else {
            self.failure.clone()
        }
    }
}

/// An ordered list of check steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Pipeline name
    #[serde(skip)]
    pub name: String,
    /// Pipeline description
    #[serde(default)]
    pub description: String,
    /// Steps, run in this order
    pub steps: Vec<CheckStep>,
}

impl Pipeline {
    /// Reject pipelines the runner can't make sense of
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::NoSteps);
        }

        let mut seen = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(ConfigError::EmptyName { index: index + 1 });
            }
            if !seen.insert(step.name.as_str()) {
                return Err(ConfigError::DuplicateStep(step.name.clone()));
            }
        }

        Ok(())
    }

    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name.clone()).collect()
    }

    fn ensure_known(&self, name: &str) -> Result<(), UnknownStep> {
        if self.steps.iter().any(|s| s.name == name) {
            Ok(())
        } else {
            Err(UnknownStep {
                name: name.to_string(),
                available: self.step_names(),
            })
        }
    }

    /// Decide which steps run, keeping declared order
    pub fn plan(&self, only: Option<&str>, skip: &[String]) -> Result<Vec<PlannedStep>, UnknownStep> {
        if let Some(only) = only {
            self.ensure_known(only)?;
        }
        for name in skip {
            self.ensure_known(name)?;
        }

        let planned = self
            .steps
            .iter()
            .filter(|step| only.map_or(true, |o| step.name == o))
            .map(|step| PlannedStep {
                step: step.clone(),
                skip: skip.contains(&step.name),
            })
            .collect();

        Ok(planned)
    }
}

/// A step together with whether the user asked to skip it
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub step: CheckStep,
    pub skip: bool,
}

/// Built-in pipeline for Rust/Cargo projects
pub fn rust_pipeline() -> Pipeline {
    Pipeline {
        name: "rust".to_string(),
        description: "Rust/Cargo projects".to_string(),
        steps: vec![
            CheckStep::advisory("fmt", "cargo fmt --all").with_status("Running cargo fmt..."),
            CheckStep::gating("clippy", "cargo clippy --all-targets -- -D warnings")
                .with_status("Running cargo clippy...")
                .with_failure(&[
                    "Clippy issues detected.",
                    "Please fix the Clippy issues before committing.",
                ]),
            CheckStep::gating("features", "cargo hack --feature-powerset check")
                .with_status("Running cargo hack...")
                .with_failure(&[
                    "Feature combination issues detected.",
                    "Please fix the feature combination issues before committing.",
                ]),
            CheckStep::gating("test", "cargo test --quiet")
                .with_status("Running cargo test...")
                .with_failure(&[
                    "Unit test failed.",
                    "Please fix the failing tests before committing.",
                ]),
        ],
    }
}
