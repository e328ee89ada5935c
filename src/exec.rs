//! External tool invocation.
//!
//! Every packaging step that leaves this process goes through [`run_tool`]:
//! the subprocess runs to completion, stdout and stderr are captured, and a
//! nonzero exit becomes a [`ToolError`] carrying both streams so the caller
//! can surface the tool's own diagnostics. Nothing is retried.

use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::process::Command;
use thiserror::Error;

/// Captured output of a successful tool run.
#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A tool exited nonzero.
#[derive(Debug, Error)]
#[error("'{command}' exited with code {code}")]
pub struct ToolError {
    /// The command line that was run, for diagnostics.
    pub command: String,
    /// Exit code, or -1 when the process was killed by a signal.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Run a tool to completion, capturing stdout and stderr.
///
/// Spawn failures (tool not found, not executable) propagate as plain I/O
/// errors; a nonzero exit becomes a [`ToolError`].
pub fn run_tool<I, S>(program: impl AsRef<OsStr>, args: I, verbose: bool) -> Result<ToolOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref().to_os_string();
    let args: Vec<OsString> = args
        .into_iter()
        .map(|arg| arg.as_ref().to_os_string())
        .collect();

    let command_line = render_command_line(&program, &args);
    if verbose {
        println!("exec: {}", command_line);
    }

    let output = Command::new(&program)
        .args(&args)
        .output()
        .with_context(|| format!("running '{}'", command_line))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if output.status.success() {
        Ok(ToolOutput { stdout, stderr })
    } else {
        Err(ToolError {
            command: command_line,
            code: output.status.code().unwrap_or(-1),
            stdout,
            stderr,
        }
        .into())
    }
}

fn render_command_line(program: &OsStr, args: &[OsString]) -> String {
    let mut parts = vec![program.to_string_lossy().into_owned()];
    parts.extend(args.iter().map(|arg| arg.to_string_lossy().into_owned()));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_tool_captures_stdout() {
        let output = run_tool("sh", ["-c", "echo hello"], false).unwrap();
        assert_eq!(output.stdout.trim(), "hello");
        assert!(output.stderr.is_empty());
    }

    #[test]
    fn test_run_tool_nonzero_exit_is_a_structured_error() {
        let err = run_tool("sh", ["-c", "echo oops >&2; exit 3"], false).unwrap_err();
        let tool_err = err.downcast_ref::<ToolError>().expect("ToolError");
        assert_eq!(tool_err.code, 3);
        assert_eq!(tool_err.stderr.trim(), "oops");
    }

    #[test]
    fn test_run_tool_spawn_failure_is_not_a_tool_error() {
        let err = run_tool("definitely-not-a-real-tool-709", ["x"], false).unwrap_err();
        assert!(err.downcast_ref::<ToolError>().is_none());
    }
}
