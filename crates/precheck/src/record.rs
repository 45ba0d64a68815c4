//! Last-run record
//!
//! Only the outcome is stored, one record per data directory; it is shown by
//! `precheck status` when the recorded project matches.

use anyhow::Result;
use precheck_core::Paths;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::runner::RunReport;

const RECORD_FILE: &str = "last_run.json";

/// Outcome of the most recent run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub project_path: String,
    pub pipeline: String,
    pub passed: bool,
    #[serde(default)]
    pub failed_step: Option<String>,
    pub timestamp: String,
}

impl RunRecord {
    pub fn from_report(project: &Path, pipeline: &str, report: &RunReport) -> Self {
        Self {
            project_path: canonical(project),
            pipeline: pipeline.to_string(),
            passed: report.success(),
            failed_step: report.failed_step().map(str::to_string),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn canonical(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

/// Save the record, replacing any earlier one
pub fn save_record(paths: &Paths, record: &RunRecord) -> Result<()> {
    fs::create_dir_all(&paths.data)?;
    let content = serde_json::to_string_pretty(record)?;
    fs::write(paths.state(RECORD_FILE), content)?;
    Ok(())
}

/// Load the record if it belongs to this project
pub fn load_record(paths: &Paths, project: &Path) -> Option<RunRecord> {
    let content = fs::read_to_string(paths.state(RECORD_FILE)).ok()?;
    let record: RunRecord = serde_json::from_str(&content).ok()?;

    if record.project_path == canonical(project) {
        Some(record)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckError;
    use tempfile::tempdir;

    fn failed_report() -> RunReport {
        RunReport {
            steps: Vec::new(),
            duration_ms: 12,
            failure: Some(CheckError::GatingStepFailed {
                step: "test".to_string(),
            }),
        }
    }

    #[test]
    fn test_round_trip_same_project() {
        let state = tempdir().unwrap();
        let project = tempdir().unwrap();
        let paths = Paths::at(state.path());

        let record = RunRecord::from_report(project.path(), "rust", &failed_report());
        save_record(&paths, &record).unwrap();

        let loaded = load_record(&paths, project.path()).unwrap();
        assert_eq!(loaded, record);
        assert!(!loaded.passed);
        assert_eq!(loaded.failed_step.as_deref(), Some("test"));
    }

    #[test]
    fn test_other_project_has_no_record() {
        let state = tempdir().unwrap();
        let project = tempdir().unwrap();
        let other = tempdir().unwrap();
        let paths = Paths::at(state.path());

        let record = RunRecord::from_report(project.path(), "rust", &failed_report());
        save_record(&paths, &record).unwrap();

        assert!(load_record(&paths, other.path()).is_none());
    }

    #[test]
    fn test_no_record_yet() {
        let state = tempdir().unwrap();
        let paths = Paths::at(state.path());
        assert!(load_record(&paths, state.path()).is_none());
    }
}
