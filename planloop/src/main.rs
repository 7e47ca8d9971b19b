//! Plan lifecycle engine for tool-using agents.
//!
//! Asks an external oracle for a plan, validates and simulates it, executes
//! it against a tool registry, and feeds reflection back into replanning
//! until the goal is met or limits trip.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jsonschema::Draft;
use serde_json::Value;

use planloop::core::extract::extract_plan_payload;
use planloop::core::types::AttemptDisposition;
use planloop::core::validator::validate_candidate;
use planloop::exit_codes;
use planloop::io::config::{EngineConfig, load_config, write_config};
use planloop::io::oracle::CommandOracle;
use planloop::io::prompt::PLAN_SCHEMA;
use planloop::io::run_dir::{new_run_id, write_attempt};
use planloop::io::tools::default_registry;
use planloop::lifecycle::{LifecycleStop, run_lifecycle};
use planloop::logging;

#[derive(Parser)]
#[command(
    name = "planloop",
    version,
    about = "Plan lifecycle engine for tool-using agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write `.planloop/config.toml` with defaults.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Run the plan lifecycle for a goal.
    Run {
        /// Natural-language objective for the run.
        #[arg(long)]
        goal: String,
        /// Workspace the tools operate on.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Validate a captured oracle reply without executing anything.
    Check {
        /// File holding raw oracle output.
        file: PathBuf,
    },
    /// List the builtin tool catalog.
    Tools,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(force),
        Command::Run { goal, root } => cmd_run(&goal, &root),
        Command::Check { file } => cmd_check(&file),
        Command::Tools => cmd_tools(),
    }
}

fn config_path(root: &Path) -> PathBuf {
    root.join(".planloop").join("config.toml")
}

fn cmd_init(force: bool) -> Result<i32> {
    let path = config_path(Path::new("."));
    if path.exists() && !force {
        println!("{} already exists (use --force to overwrite)", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(&path, &EngineConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_run(goal: &str, root: &Path) -> Result<i32> {
    let config = load_config(&config_path(root))?;
    let registry = default_registry(root)?;
    let oracle = CommandOracle::new(config.oracle.command.clone())?;
    let run_id = new_run_id(root)?;
    println!("run {run_id}: {goal}");

    let outcome = run_lifecycle(&oracle, goal, &registry, &config, |record| {
        if let Err(err) = write_attempt(root, &run_id, record) {
            eprintln!(
                "warning: could not persist attempt {}: {:#}",
                record.attempt, err
            );
        }
        println!(
            "attempt {}: {}",
            record.attempt,
            disposition_label(&record.disposition)
        );
    })?;

    match outcome.stop {
        LifecycleStop::Succeeded { attempt } => {
            println!("goal reached on attempt {attempt}");
            Ok(exit_codes::OK)
        }
        LifecycleStop::Exhausted { attempts } => {
            println!("gave up after {attempts} attempts");
            Ok(exit_codes::EXHAUSTED)
        }
        LifecycleStop::PlannerUnusable {
            attempts,
            consecutive_parse_failures,
        } => {
            println!(
                "planner unusable after {attempts} attempts \
                 ({consecutive_parse_failures} consecutive unparseable replies)"
            );
            Ok(exit_codes::PLANNER_UNUSABLE)
        }
    }
}

fn disposition_label(disposition: &AttemptDisposition) -> &'static str {
    match disposition {
        AttemptDisposition::ParseFailure { .. } => "no usable plan",
        AttemptDisposition::Rejected => "plan rejected",
        AttemptDisposition::Succeeded => "succeeded",
        AttemptDisposition::ExecutedWithFailures => "executed with failures",
    }
}

fn cmd_check(file: &Path) -> Result<i32> {
    let raw = fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    let payload = match extract_plan_payload(&raw) {
        Ok(payload) => payload,
        Err(failure) => {
            println!("{failure}");
            return Ok(exit_codes::INVALID);
        }
    };

    let schema: Value = serde_json::from_str(PLAN_SCHEMA).context("parse plan schema")?;
    let schema_errors = schema_violations(&payload, &schema)?;
    for message in &schema_errors {
        println!("schema: {message}");
    }

    let registry = default_registry(Path::new("."))?;
    let review = validate_candidate(&payload, &registry, 1);
    for diagnostic in &review.diagnostics {
        println!(
            "step {}: {} [{}]",
            diagnostic.step_index,
            diagnostic.message,
            diagnostic.kind.label()
        );
    }

    if !schema_errors.is_empty() || !review.diagnostics.is_empty() {
        return Ok(exit_codes::INVALID);
    }
    println!("plan ok: {} steps", review.plan.steps.len());
    Ok(exit_codes::OK)
}

fn cmd_tools() -> Result<i32> {
    let registry = default_registry(Path::new("."))?;
    for spec in registry.all() {
        let required: Vec<&str> = spec.required_inputs.iter().map(String::as_str).collect();
        if required.is_empty() {
            println!("{}", spec.name);
        } else {
            println!("{} (required inputs: {})", spec.name, required.join(", "));
        }
        if let Some(schema) = &spec.output_schema {
            println!("  output: {schema}");
        }
    }
    Ok(exit_codes::OK)
}

/// Collect schema conformance errors for a payload (Draft 2020-12).
fn schema_violations(instance: &Value, schema: &Value) -> Result<Vec<String>> {
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .context("compile json schema")?;
    Ok(compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect())
}
