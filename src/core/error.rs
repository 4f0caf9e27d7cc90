use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScribeError>;

/// Errors that can occur while driving an external forensic tool
#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("Tool not found: {0} (is it installed and on PATH?)")]
    ToolNotFound(String),

    #[error("{program} failed: {stderr}")]
    ExternalToolFailure {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Expected a {expected}: {}", path.display())]
    WrongPathType {
        path: PathBuf,
        expected: &'static str,
    },

    #[error("Invalid size format: {0:?}")]
    InvalidSizeFormat(String),

    #[error("Mount point is not empty: {}", .0.display())]
    MountPointNotEmpty(PathBuf),

    #[error("Loop device setup failed for {}: {message}", image.display())]
    LoopSetupFailure { image: PathBuf, message: String },

    #[error("Unmount of {} failed: {message}", target.display())]
    UnmountFailure { target: PathBuf, message: String },

    #[error("No GPS metadata found in {}", .0.display())]
    NoGpsMetadata(PathBuf),

    #[error("Invalid selection {choice}: expected a number between 1 and {count}")]
    InvalidSelection { choice: usize, count: usize },

    #[error("Unexpected {tool} output: {detail}")]
    UnexpectedOutput { tool: &'static str, detail: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ScribeError {
    /// Captured standard error of the failing tool, if this error came from one.
    pub fn tool_stderr(&self) -> Option<&str> {
        match self {
            ScribeError::ExternalToolFailure { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    pub(crate) fn unexpected(tool: &'static str, detail: impl Into<String>) -> Self {
        ScribeError::UnexpectedOutput {
            tool,
            detail: detail.into(),
        }
    }
}
