use crate::errors::{PipelineError, Result};
use crate::utils::absolute_path;
use std::path::PathBuf;
use std::process::Command;

/// Environment variable the review app reads its project directories from.
pub const PROJECT_DIRS_ENV: &str = "DIFFPIPE_PROJECT_DIRS";

/// The interactive visualization server.
///
/// `serve` blocks for the life of the server.
pub trait ReviewServer {
    fn serve(&self, project_dirs: &[PathBuf], host: &str, port: u16) -> Result<()>;
}

/// Serves the review app with `Rscript -e "shiny::runApp(...)"`.
#[derive(Debug, Clone)]
pub struct ShinyServer {
    rscript: PathBuf,
    app_dir: PathBuf,
}

impl ShinyServer {
    pub fn new(rscript: impl Into<PathBuf>, app_dir: impl Into<PathBuf>) -> Self {
        Self {
            rscript: rscript.into(),
            app_dir: app_dir.into(),
        }
    }

    pub fn command(&self, project_dirs: &[PathBuf], host: &str, port: u16) -> Result<Command> {
        let dirs = std::env::join_paths(project_dirs).map_err(|e| {
            PipelineError::ServerFailure(format!("cannot pass project directories: {}", e))
        })?;
        let expr = format!(
            "shiny::runApp({}, host={}, port={}, launch.browser=FALSE)",
            r_string(&self.app_dir.to_string_lossy()),
            r_string(host),
            port
        );

        let mut cmd = Command::new(&self.rscript);
        cmd.arg("-e").arg(expr).env(PROJECT_DIRS_ENV, dirs);
        Ok(cmd)
    }
}

impl ReviewServer for ShinyServer {
    fn serve(&self, project_dirs: &[PathBuf], host: &str, port: u16) -> Result<()> {
        let mut cmd = self.command(project_dirs, host, port)?;
        log::info!("serving {} project(s) on http://{}:{}", project_dirs.len(), host, port);

        let status = cmd.status().map_err(|e| {
            let exe = self.rscript.display();
            PipelineError::ServerFailure(format!("failed to start '{}': {}", exe, e))
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(PipelineError::ServerFailure(format!(
                "{} exited with {}",
                self.rscript.display(),
                status
            )))
        }
    }
}

/// Checks that every project directory exists and starts the review server on them.
///
/// All missing directories are reported together.
pub fn start_review<S: ReviewServer + ?Sized>(
    server: &S,
    project_dirs: &[PathBuf],
    host: &str,
    port: u16,
) -> Result<()> {
    let missing: Vec<PathBuf> = project_dirs
        .iter()
        .filter(|p| !p.is_dir())
        .cloned()
        .collect();
    if project_dirs.is_empty() || !missing.is_empty() {
        return Err(PipelineError::ProjectDirNotFound(missing));
    }

    let dirs: Vec<PathBuf> = project_dirs.iter().map(|p| absolute_path(p)).collect();
    server.serve(&dirs, host, port)
}

/// Quotes `s` as an R string literal.
fn r_string(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}
