use crate::config::RunSpecification;
use crate::errors::{PipelineError, Result};
use std::ffi::OsString;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Lines of engine stderr kept in a failure reason.
const STDERR_TAIL_LINES: usize = 20;

/// What the workflow engine reported for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReport {
    pub success: bool,
    /// Execution plan printed by a dry-run.
    pub plan_summary: Option<String>,
    pub error: Option<String>,
}

impl EngineReport {
    pub fn planned(summary: impl Into<String>) -> Self {
        Self {
            success: true,
            plan_summary: Some(summary.into()),
            error: None,
        }
    }

    pub fn completed() -> Self {
        Self {
            success: true,
            plan_summary: None,
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            plan_summary: None,
            error: Some(reason.into()),
        }
    }
}

/// The external DAG executor running the differential-analysis rules.
///
/// `config_file` is the on-disk form of `spec`; the engine reads its
/// parameters from there. Implementations block until the engine terminates.
pub trait WorkflowEngine {
    fn execute(
        &self,
        spec: &RunSpecification,
        config_file: &Path,
        dry_run: bool,
        cores: NonZeroU32,
    ) -> Result<EngineReport>;
}

/// Runs the workflow through a `snakemake` process.
#[derive(Debug, Clone)]
pub struct SnakemakeEngine {
    executable: PathBuf,
    snakefile: PathBuf,
    extra_args: Vec<String>,
}

impl SnakemakeEngine {
    pub fn new(executable: impl Into<PathBuf>, snakefile: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            snakefile: snakefile.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// Builds the snakemake command line for one invocation.
    pub fn command(&self, config_file: &Path, dry_run: bool, cores: NonZeroU32) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("--snakefile")
            .arg(&self.snakefile)
            .arg("--configfile")
            .arg(config_file)
            .arg("--cores")
            .arg(cores.to_string());
        if dry_run {
            cmd.arg("--dry-run");
        }
        cmd.args(&self.extra_args);
        cmd
    }

    fn describe(&self) -> String {
        self.executable.display().to_string()
    }
}

impl WorkflowEngine for SnakemakeEngine {
    fn execute(
        &self,
        spec: &RunSpecification,
        config_file: &Path,
        dry_run: bool,
        cores: NonZeroU32,
    ) -> Result<EngineReport> {
        let mut cmd = self.command(config_file, dry_run, cores);
        log::info!("running: {}", render_command(&cmd));
        log::debug!(
            "{} vs {} samples, {} core(s) per job, {}",
            spec.group1().len(),
            spec.group2().len(),
            spec.cores_per_job(),
            spec.genome_build()
        );

        let spawn_error = |e: std::io::Error| {
            PipelineError::EngineFailure(format!("failed to start '{}': {}", self.describe(), e))
        };

        if dry_run {
            // the plan is the product of a dry-run, so capture it
            let output = cmd
                .stdin(Stdio::null())
                .output()
                .map_err(spawn_error)?;
            Ok(report_from_output(&self.describe(), &output))
        } else {
            let status = cmd.status().map_err(spawn_error)?;
            if status.success() {
                Ok(EngineReport::completed())
            } else {
                Ok(EngineReport::failed(format!(
                    "{} exited with {}",
                    self.describe(),
                    status
                )))
            }
        }
    }
}

fn report_from_output(label: &str, output: &Output) -> EngineReport {
    if output.status.success() {
        return EngineReport::planned(String::from_utf8_lossy(&output.stdout).trim_end());
    }

    let mut msg = format!("{} exited with {}", label, output.status);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().collect();
    if !lines.is_empty() {
        let tail = &lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..];
        msg.push_str("\n---- stderr ----\n");
        msg.push_str(&tail.join("\n"));
    }
    EngineReport::failed(msg)
}

/// Renders a command roughly the way a shell user would type it.
pub fn render_command(cmd: &Command) -> String {
    std::iter::once(cmd.get_program().to_os_string())
        .chain(cmd.get_args().map(OsString::from))
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
