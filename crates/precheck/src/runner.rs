//! Check step runner
//!
//! Steps run one at a time, in order. The first failing gating step ends the
//! run; non-gating steps are reported but never change the outcome.

use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::CheckError;
use crate::pipeline::{CheckStep, PlannedStep};

/// What a single invocation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub success: bool,
    /// None when the process never ran to completion (spawn error, timeout)
    pub exit_code: Option<i32>,
    pub output: String,
}

/// Runs the command behind a step
pub trait StepExecutor {
    async fn execute(&mut self, step: &CheckStep, dir: &Path) -> StepOutcome;
}

/// Where child output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Straight to the terminal
    Inherit,
    /// Collected into the step result
    Capture,
}

/// Runs steps through `sh -c`
pub struct ShellExecutor {
    mode: OutputMode,
}

impl ShellExecutor {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }
}

impl StepExecutor for ShellExecutor {
    async fn execute(&mut self, step: &CheckStep, dir: &Path) -> StepOutcome {
        match run_shell(&step.command, dir, self.mode, step.timeout).await {
            Ok(outcome) => outcome,
            Err(e) => StepOutcome {
                success: false,
                exit_code: None,
                output: e.to_string(),
            },
        }
    }
}

async fn run_shell(
    cmd: &str,
    dir: &Path,
    mode: OutputMode,
    timeout_secs: Option<u64>,
) -> std::io::Result<StepOutcome> {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd).current_dir(dir).kill_on_drop(true);

    if mode == OutputMode::Capture {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
    }

    let child = command.spawn()?;
    let wait = child.wait_with_output();

    let output = match timeout_secs {
        Some(secs) => match timeout(Duration::from_secs(secs), wait).await {
            Ok(result) => result?,
            Err(_) => {
                return Ok(StepOutcome {
                    success: false,
                    exit_code: None,
                    output: format!("Timeout exceeded ({}s)", secs),
                })
            }
        },
        None => wait.await?,
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    Ok(StepOutcome {
        success: output.status.success(),
        exit_code: output.status.code(),
        output: format!("{}{}", stdout, stderr),
    })
}

/// Where a run currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running(String),
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of one step
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub name: String,
    pub gating: bool,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output: String,
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub steps: Vec<StepResult>,
    pub duration_ms: u64,
    pub failure: Option<CheckError>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    /// 0 when every gating step passed, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.success() {
            0
        } else {
            1
        }
    }

    pub fn failed_step(&self) -> Option<&str> {
        self.failure.as_ref().map(CheckError::step)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": self.success(),
            "exit_code": self.exit_code(),
            "duration_ms": self.duration_ms,
            "failed_step": self.failed_step(),
            "steps": self.steps,
        })
    }
}

/// How much the runner prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Normal,
    /// Diagnostics only
    Quiet,
    /// Nothing; used for JSON output
    Silent,
}

/// Terminal output that also keeps a transcript of every message line
pub struct Console {
    verbosity: Verbosity,
    transcript: Vec<String>,
}

impl Console {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            transcript: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    fn status(&mut self, line: &str) {
        self.transcript.push(line.to_string());
        if self.verbosity == Verbosity::Normal {
            println!("{}", line.bold());
            let _ = std::io::stdout().flush();
        }
    }

    fn diagnostic(&mut self, line: &str) {
        self.transcript.push(line.to_string());
        if self.verbosity != Verbosity::Silent {
            eprintln!("{}", line.red());
        }
    }

    fn step_done(&self, result: &StepResult) {
        if self.verbosity != Verbosity::Normal {
            return;
        }

        let duration = format_duration(result.duration_ms);
        let label = match (result.status, result.gating) {
            (StepStatus::Passed, _) => "ok".green(),
            (StepStatus::Failed, true) => "FAIL".red(),
            (StepStatus::Failed, false) => "warn".yellow(),
            (StepStatus::Skipped, _) => "skip".yellow(),
        };
        println!(
            "[{}] {} {}",
            format!("{:>5}", duration).dimmed(),
            label,
            result.name
        );
    }

    fn output_excerpt(&self, output: &str) {
        if self.verbosity == Verbosity::Silent || output.is_empty() {
            return;
        }

        let max_lines = 10;
        let total_lines = output.lines().count();
        for line in output.lines().take(max_lines) {
            eprintln!("     {}", line.dimmed());
        }
        if total_lines > max_lines {
            eprintln!(
                "     {}",
                format!("... and {} more lines", total_lines - max_lines).dimmed()
            );
        }
    }
}

/// Runs a planned pipeline against a project directory
pub struct CheckRunner<E> {
    steps: Vec<PlannedStep>,
    dir: PathBuf,
    executor: E,
    console: Console,
    state: RunState,
}

impl<E: StepExecutor> CheckRunner<E> {
    pub fn new(steps: Vec<PlannedStep>, dir: &Path, executor: E, console: Console) -> Self {
        Self {
            steps,
            dir: dir.to_path_buf(),
            executor,
            console,
            state: RunState::Pending,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    #[cfg(test)]
    pub fn console(&self) -> &Console {
        &self.console
    }

    #[cfg(test)]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn transition(&mut self, next: RunState) {
        debug!("run state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run every step in order, stopping at the first gating failure
    pub async fn run(&mut self) -> RunReport {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut failure = None;

        let steps = std::mem::take(&mut self.steps);
        for planned in &steps {
            let step = &planned.step;

            if planned.skip {
                info!("skipping step {}", step.name);
                let result = StepResult {
                    name: step.name.clone(),
                    gating: step.gating,
                    status: StepStatus::Skipped,
                    exit_code: None,
                    duration_ms: 0,
                    output: String::new(),
                };
                self.console.step_done(&result);
                results.push(result);
                continue;
            }

            self.transition(RunState::Running(step.name.clone()));
            self.console.status(&step.status_message());

            let step_start = Instant::now();
            let outcome = self.executor.execute(step, &self.dir).await;
            let result = StepResult {
                name: step.name.clone(),
                gating: step.gating,
                status: if outcome.success {
                    StepStatus::Passed
                } else {
                    StepStatus::Failed
                },
                exit_code: outcome.exit_code,
                duration_ms: step_start.elapsed().as_millis() as u64,
                output: outcome.output,
            };

            self.console.step_done(&result);

            if result.status == StepStatus::Failed {
                if step.gating {
                    self.console.output_excerpt(&result.output);
                    for line in step.failure_messages() {
                        self.console.diagnostic(&line);
                    }
                    failure = Some(CheckError::GatingStepFailed {
                        step: step.name.clone(),
                    });
                    results.push(result);
                    break;
                }

                warn!(
                    "non-gating step {} failed (exit {:?}), continuing",
                    step.name, result.exit_code
                );
            }

            results.push(result);
        }
        self.steps = steps;

        match &failure {
            Some(err) => self.transition(RunState::Failed(err.step().to_string())),
            None => self.transition(RunState::Succeeded),
        }

        RunReport {
            steps: results,
            duration_ms: start.elapsed().as_millis() as u64,
            failure,
        }
    }
}

/// Format duration in milliseconds to human-readable string
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let mins = ms / 60000;
        let secs = (ms % 60000) / 1000;
        format!("{}m{}s", mins, secs)
    }
}
