//! Error types

use std::path::PathBuf;
use thiserror::Error;

/// Why a run ended in failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("gating step `{step}` failed")]
    GatingStepFailed { step: String },
}

impl CheckError {
    pub fn step(&self) -> &str {
        match self {
            Self::GatingStepFailed { step } => step,
        }
    }
}

/// Problems with a project's `.precheck.yaml`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config in {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("pipeline has no steps")]
    NoSteps,

    #[error("step #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("step `{0}` is defined more than once")]
    DuplicateStep(String),
}

/// `--step` / `--skip` named something the pipeline doesn't have
#[derive(Debug, Error)]
#[error("unknown step `{name}` (available: {})", .available.join(", "))]
pub struct UnknownStep {
    pub name: String,
    pub available: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gating_failure_names_step() {
        let err = CheckError::GatingStepFailed {
            step: "clippy".to_string(),
        };
        assert_eq!(err.step(), "clippy");
        assert_eq!(err.to_string(), "gating step `clippy` failed");
    }

    #[test]
    fn test_unknown_step_lists_available() {
        let err = UnknownStep {
            name: "lint".to_string(),
            available: vec!["fmt".to_string(), "clippy".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "unknown step `lint` (available: fmt, clippy)"
        );
    }
}
