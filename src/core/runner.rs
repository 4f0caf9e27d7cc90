//! External process execution
//!
//! Every capability of the tool ends up here: an argument vector is handed to
//! the OS verbatim (never through a shell) and both output streams are
//! captured as text.

use super::error::{Result, ScribeError};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::process::{Command, Stdio};
use tracing::debug;

/// Program plus arguments, passed to the OS without shell interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    program: OsString,
    args: Vec<OsString>,
}

impl ExecutionRequest {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Program and arguments as lossy UTF-8 strings, for logging and assertions.
    pub fn tokens(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|t| t.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for ExecutionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens().join(" "))
    }
}

/// Outcome of a finished process. Standard output is trimmed on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    status: Option<i32>,
    stdout: String,
    stderr: String,
}

impl ExecutionResult {
    pub fn new(status: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        let stdout = stdout.into();
        Self {
            status,
            stdout: stdout.trim().to_string(),
            stderr: stderr.into(),
        }
    }

    /// Exit code, or `None` when the process was killed by a signal.
    pub fn status(&self) -> Option<i32> {
        self.status
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}

pub trait ToolRunner {
    /// Runs the process to completion and reports whatever it produced.
    ///
    /// Implementations only fail when the process could not be started at
    /// all; a non-zero exit is still an `Ok` here.
    fn spawn(&self, request: &ExecutionRequest) -> Result<ExecutionResult>;

    /// Runs the process and turns a non-zero exit into
    /// [`ScribeError::ExternalToolFailure`], keeping the tool's stderr verbatim.
    fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let result = self.spawn(request)?;
        if result.success() {
            Ok(result)
        } else {
            Err(ScribeError::ExternalToolFailure {
                program: request.program_name(),
                status: result.status(),
                stderr: result.stderr().trim_end().to_string(),
            })
        }
    }

    /// Convenience wrapper returning only the trimmed standard output.
    fn output(&self, request: &ExecutionRequest) -> Result<String> {
        Ok(self.execute(request)?.stdout)
    }
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn spawn(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        (**self).spawn(request)
    }
}

/// Runs requests as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn spawn(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        debug!(command = %request, "spawning external tool");

        let output = Command::new(request.program())
            .args(request.arguments())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    ScribeError::ToolNotFound(request.program_name())
                } else {
                    ScribeError::Io(e)
                }
            })?;

        let result = ExecutionResult::new(
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );

        debug!(
            program = %request.program_name(),
            status = ?result.status(),
            stdout_len = result.stdout().len(),
            "external tool finished"
        );

        Ok(result)
    }
}
