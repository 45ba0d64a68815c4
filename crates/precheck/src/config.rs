//! Project configuration (`.precheck.yaml`)
//!
//! A project may replace the built-in pipeline with its own list of steps.
//! Missing fields fall back to the same defaults as the built-in steps:
//! steps gate unless told otherwise, and have no timeout.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::pipeline::{rust_pipeline, Pipeline};

/// Config file looked up in the project root
pub const CONFIG_FILE: &str = ".precheck.yaml";

/// Path of the project config, if the project has one
pub fn find_config(project: &Path) -> Option<PathBuf> {
    let path = project.join(CONFIG_FILE);
    path.is_file().then_some(path)
}

/// Load and validate a pipeline from a config file
pub fn load_config(path: &Path) -> Result<Pipeline, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config(&content, path)
}

fn parse_config(content: &str, path: &Path) -> Result<Pipeline, ConfigError> {
    let mut pipeline: Pipeline =
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    pipeline.name = "project".to_string();
    if pipeline.description.is_empty() {
        pipeline.description = format!("Steps from {}", path.display());
    }
    pipeline.validate()?;

    Ok(pipeline)
}

/// Pick the pipeline for a run: explicit file, then project file, then built-in
pub fn select_pipeline(project: &Path, explicit: Option<&Path>) -> Result<Pipeline, ConfigError> {
    match explicit.map(Path::to_path_buf).or_else(|| find_config(project)) {
        Some(path) => {
            tracing::debug!("loading pipeline from {}", path.display());
            load_config(&path)
        }
        None => Ok(rust_pipeline()),
    }
}

/// Config file contents equivalent to the built-in pipeline
pub fn render_default() -> Result<String> {
    let body = serde_yaml::to_string(&rust_pipeline()).context("Failed to render pipeline")?;

    Ok(format!(
        "# precheck configuration\n\
         #\n\
         # Steps run in order. A failing gating step stops the run with exit code 1.\n\
         # Non-gating steps (gating: false) never affect the outcome.\n\
         # Optional per step: status, failure (list of lines), timeout (seconds).\n\
         \n{}",
        body
    ))
}

/// Write the default config into a project, refusing to overwrite
pub fn write_default(project: &Path) -> Result<PathBuf> {
    let path = project.join(CONFIG_FILE);
    if path.exists() {
        anyhow::bail!("Config already exists: {}", path.display());
    }

    fs::write(&path, render_default()?).context("Failed to write config file")?;
    Ok(path)
}
