use crate::args::RunInputs;
use crate::config::{load_config, synthesize, RunSpecification};
use crate::engine::WorkflowEngine;
use crate::errors::{PipelineError, Result};
use std::io::Write;
use std::num::NonZeroU32;
use std::path::Path;

/// Terminal state of one engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Dry-run succeeded; `summary` is the engine's execution plan.
    Planned { summary: String },
    Completed,
    /// The engine terminated unsuccessfully. The reason is passed through unchanged.
    Failed { reason: String },
}

impl RunOutcome {
    /// Turns `Failed` into an `EngineFailure` error.
    pub fn into_result(self) -> Result<RunOutcome> {
        match self {
            RunOutcome::Failed { reason } => Err(PipelineError::EngineFailure(reason)),
            other => Ok(other),
        }
    }
}

/// Runs the workflow described by an existing config file.
///
/// The file is loaded and validated first; it is handed to the engine as is
/// and never rewritten.
pub fn run_from_config<E: WorkflowEngine + ?Sized>(
    engine: &E,
    config_path: &Path,
    dry_run: bool,
    cores: NonZeroU32,
) -> Result<RunOutcome> {
    let spec = load_config(config_path)?;
    run_spec(engine, &spec, config_path, dry_run, cores)
}

/// Builds a specification from `inputs` and runs it without keeping a config file.
pub fn run_direct<E: WorkflowEngine + ?Sized>(
    engine: &E,
    dry_run: bool,
    cores: NonZeroU32,
    inputs: &RunInputs,
) -> Result<RunOutcome> {
    let spec = synthesize(inputs)?;
    let yaml = spec.to_yaml()?;

    // lives until the engine returns, then it is removed
    let mut config_file = tempfile::Builder::new()
        .prefix("diffpipe-")
        .suffix(".yaml")
        .tempfile()
        .map_err(|e| PipelineError::io(std::env::temp_dir(), e))?;
    config_file
        .write_all(yaml.as_bytes())
        .and_then(|_| config_file.flush())
        .map_err(|e| PipelineError::io(config_file.path().to_path_buf(), e))?;

    run_spec(engine, &spec, config_file.path(), dry_run, cores)
}

fn run_spec<E: WorkflowEngine + ?Sized>(
    engine: &E,
    spec: &RunSpecification,
    config_file: &Path,
    dry_run: bool,
    cores: NonZeroU32,
) -> Result<RunOutcome> {
    log::info!(
        "{} workflow for {} with {} core(s)",
        if dry_run { "planning" } else { "executing" },
        spec.output_dir().display(),
        cores
    );

    let report = engine.execute(spec, config_file, dry_run, cores)?;
    let outcome = if !report.success {
        RunOutcome::Failed {
            reason: report
                .error
                .unwrap_or_else(|| "engine reported failure".to_string()),
        }
    } else if dry_run {
        RunOutcome::Planned {
            summary: report.plan_summary.unwrap_or_default(),
        }
    } else {
        RunOutcome::Completed
    };
    Ok(outcome)
}
