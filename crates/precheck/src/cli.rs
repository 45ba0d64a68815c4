//! CLI command definitions and handlers

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use precheck_core::{resolve, Paths, ToolStatus};
use std::path::{Path, PathBuf};

use crate::config::{select_pipeline, write_default};
use crate::hook::install_hook;
use crate::pipeline::Pipeline;
use crate::record::{load_record, save_record, RunRecord};
use crate::runner::{
    format_duration, CheckRunner, Console, OutputMode, RunReport, ShellExecutor, Verbosity,
};

/// Exit code for usage and configuration problems; no step ran
pub const EXIT_USAGE: u8 = 2;

/// precheck - Pre-commit checks runner
#[derive(Parser)]
#[command(name = "precheck")]
#[command(version)]
#[command(about = "Run format, lint, feature-matrix and test checks before committing")]
#[command(after_help = "\
TRIGGER:
    Run precheck before every commit, or install it as the git pre-commit hook.
    The first failing check stops the run.

EXAMPLES:
    precheck                   Format, then clippy, cargo hack and cargo test
    precheck --skip features   Skip the feature-combination check
    precheck --step clippy     Run only the clippy step
    precheck --json            Machine-readable report
    precheck -C ../other       Check another project directory
    precheck status            Show pipeline, tool availability and last run
    precheck steps             List steps in order
    precheck init              Write .precheck.yaml with the default steps
    precheck install-hook      Install .git/hooks/pre-commit

EXIT CODES:
    0    all gating checks passed
    1    a gating check failed
    2    usage or configuration error")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Project directory (default: current directory)
    #[arg(short = 'C', long = "dir", global = true)]
    pub path: Option<PathBuf>,

    /// Load steps from this file instead of .precheck.yaml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Run only specific step
    #[arg(long)]
    pub step: Option<String>,

    /// Skip specific step (can be repeated)
    #[arg(long)]
    pub skip: Vec<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Only print failures
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show pipeline, tool availability and last run
    Status,

    /// List the steps that would run
    Steps,

    /// Create .precheck.yaml with the default steps
    Init,

    /// Install precheck as the git pre-commit hook
    InstallHook {
        /// Replace an existing hook
        #[arg(long)]
        force: bool,
    },
}

/// Run the CLI, returning the process exit code
pub async fn run(cli: Cli, paths: &Paths) -> Result<u8> {
    let path = match cli.path.clone() {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    match &cli.command {
        Some(Commands::Status) => with_pipeline(&cli, &path, |p| {
            cmd_status(p, &path, paths, cli.json)
        }),
        Some(Commands::Steps) => with_pipeline(&cli, &path, |p| cmd_steps(p, cli.json)),
        Some(Commands::Init) => cmd_init(&path),
        Some(Commands::InstallHook { force }) => cmd_install_hook(&path, *force),
        None => cmd_check(&cli, &path, paths).await,
    }
}

fn load_pipeline(cli: &Cli, path: &Path) -> Option<Pipeline> {
    match select_pipeline(path, cli.config.as_deref()) {
        Ok(pipeline) => Some(pipeline),
        Err(e) => {
            report_error(cli.json, &anyhow::Error::from(e));
            None
        }
    }
}

fn with_pipeline(
    cli: &Cli,
    path: &Path,
    f: impl FnOnce(&Pipeline) -> Result<u8>,
) -> Result<u8> {
    match load_pipeline(cli, path) {
        Some(pipeline) => f(&pipeline),
        None => Ok(EXIT_USAGE),
    }
}

fn report_error(json: bool, err: &anyhow::Error) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "success": false,
                "exit_code": EXIT_USAGE,
                "error": format!("{:#}", err),
                "steps": []
            })
        );
    } else {
        eprintln!("{} {:#}", "ERROR:".red(), err);
    }
}

/// Run the checks
async fn cmd_check(cli: &Cli, path: &Path, paths: &Paths) -> Result<u8> {
    let Some(pipeline) = load_pipeline(cli, path) else {
        return Ok(EXIT_USAGE);
    };

    let plan = match pipeline.plan(cli.step.as_deref(), &cli.skip) {
        Ok(plan) => plan,
        Err(e) => {
            report_error(cli.json, &anyhow::Error::from(e));
            return Ok(EXIT_USAGE);
        }
    };

    if cli.verbose && !cli.json {
        println!("Using pipeline: {} ({})", pipeline.name, pipeline.description);
    }
    tracing::info!(
        "running {} step(s) of pipeline {} in {}",
        plan.len(),
        pipeline.name,
        path.display()
    );

    let (mode, verbosity) = if cli.json {
        (OutputMode::Capture, Verbosity::Silent)
    } else if cli.quiet {
        (OutputMode::Capture, Verbosity::Quiet)
    } else {
        (OutputMode::Inherit, Verbosity::Normal)
    };

    let mut runner = CheckRunner::new(
        plan,
        path,
        ShellExecutor::new(mode),
        Console::new(verbosity),
    );
    let report = runner.run().await;
    tracing::debug!("run finished in state {:?}", runner.state());

    let record = RunRecord::from_report(path, &pipeline.name, &report);
    if let Err(e) = save_record(paths, &record) {
        tracing::warn!("could not save run record: {:#}", e);
    }

    if cli.json {
        println!("{}", report.to_json());
    } else if !cli.quiet {
        print_summary(&report);
    }

    Ok(report.exit_code())
}

/// Show pipeline, tool availability and last run
fn cmd_status(pipeline: &Pipeline, path: &Path, paths: &Paths, json: bool) -> Result<u8> {
    let last = load_record(paths, path);
    let tools: Vec<_> = pipeline
        .steps
        .iter()
        .map(|s| (s, resolve(&s.command)))
        .collect();

    if json {
        let steps: Vec<_> = tools
            .iter()
            .map(|(step, tool)| {
                serde_json::json!({
                    "name": step.name,
                    "gating": step.gating,
                    "command": step.command,
                    "tool": match tool {
                        ToolStatus::Found(p) => p.display().to_string(),
                        ToolStatus::Missing(_) => "missing".to_string(),
                        ToolStatus::Unknown => "unknown".to_string(),
                    },
                })
            })
            .collect();

        println!(
            "{}",
            serde_json::json!({
                "pipeline": pipeline.name,
                "description": pipeline.description,
                "last_run": last.as_ref().map(|r| &r.timestamp),
                "last_result": last.as_ref().map(|r| if r.passed { "passed" } else { "failed" }),
                "last_failed_step": last.as_ref().and_then(|r| r.failed_step.as_ref()),
                "steps": steps
            })
        );
        return Ok(0);
    }

    println!("Precheck Status");
    println!("----------------------------");
    println!("Pipeline: {} ({})", pipeline.name, pipeline.description);

    match last {
        Some(record) => {
            println!("Last run: {}", record.timestamp);
            match (record.passed, record.failed_step) {
                (true, _) => println!("Last result: {}", "passed".green()),
                (false, Some(step)) => {
                    println!("Last result: {} at {}", "failed".red(), step)
                }
                (false, None) => println!("Last result: {}", "failed".red()),
            }
        }
        None => {
            println!("Last run: never");
            println!("Last result: unknown");
        }
    }

    println!();
    println!("Tools:");
    for (step, tool) in &tools {
        match tool {
            ToolStatus::Found(p) => {
                println!("  {} {:<10} {}", "ok".green(), step.name, p.display().to_string().dimmed())
            }
            ToolStatus::Missing(program) => {
                println!("  {} {:<10} {} not found", "--".red(), step.name, program)
            }
            ToolStatus::Unknown => {
                println!("  {} {:<10} {}", " ?".dimmed(), step.name, step.command.dimmed())
            }
        }
    }

    Ok(0)
}

/// List steps
fn cmd_steps(pipeline: &Pipeline, json: bool) -> Result<u8> {
    if json {
        println!("{}", serde_json::to_string_pretty(&pipeline.steps)?);
        return Ok(0);
    }

    println!("Steps ({})", pipeline.name);
    println!("----------------------------");
    for (i, step) in pipeline.steps.iter().enumerate() {
        let kind = if step.gating {
            format!("{:<10}", "gating").normal()
        } else {
            format!("{:<10}", "non-gating").dimmed()
        };
        println!("  {}. {:<10} {} {}", i + 1, step.name, kind, step.command);
    }

    Ok(0)
}

/// Create project config
fn cmd_init(path: &Path) -> Result<u8> {
    match write_default(path) {
        Ok(config) => {
            println!("Created {}", config.display());
            println!("Edit this file to customize the checks for your project.");
            Ok(0)
        }
        Err(e) => {
            eprintln!("{} {:#}", "ERROR:".red(), e);
            Ok(EXIT_USAGE)
        }
    }
}

/// Install the pre-commit hook
fn cmd_install_hook(path: &Path, force: bool) -> Result<u8> {
    match install_hook(path, force) {
        Ok(hook) => {
            println!("Installed {}", hook.display());
            Ok(0)
        }
        Err(e) => {
            eprintln!("{} {:#}", "ERROR:".red(), e);
            Ok(EXIT_USAGE)
        }
    }
}

/// Print summary
fn print_summary(report: &RunReport) {
    println!("----------------------------");
    let duration_str = format_duration(report.duration_ms);
    match report.failed_step() {
        None => println!("Total: {} {}", duration_str, "All checks passed".green()),
        Some(step) => println!("Total: {} {} {}", duration_str, "failed at".red(), step),
    }
}
