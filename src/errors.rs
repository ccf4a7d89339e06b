use std::path::PathBuf;
use thiserror::Error;

/// Every way a diffpipe operation can fail.
///
/// The first six variants are validation errors and are always raised before
/// the workflow engine or the review server is started.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("sample group {0} is empty")]
    EmptyGroup(String),

    #[error("samples listed in both groups: {}", .0.join(", "))]
    OverlappingGroups(Vec<String>),

    #[error("cannot use '{}' as output directory: {reason}", path.display())]
    OutputPathError { path: PathBuf, reason: String },

    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("failed to parse config file '{}': {reason}", path.display())]
    ConfigParseError { path: PathBuf, reason: String },

    #[error("project directories not found: {}", display_paths(.0))]
    ProjectDirNotFound(Vec<PathBuf>),

    #[error("workflow engine failed: {0}")]
    EngineFailure(String),

    #[error("review server failed: {0}")]
    ServerFailure(String),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "none given".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
