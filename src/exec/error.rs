//! Failure kinds produced by the executor and their user-facing rendering.

use std::time::Duration;
use thiserror::Error;

use crate::parse::strip_control_sequences;

/// Terminal failure of a single `mloop` invocation.
///
/// Exactly one variant is produced per failed call: a timeout kills the
/// process before its exit status is observed.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The process could not be started (exit code -1) or exited non-zero.
    #[error("{message}")]
    Execution {
        message: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// The deadline elapsed before the process terminated.
    #[error("{message}")]
    Timeout { message: String, timeout: Duration },
}

impl ExecError {
    pub fn spawn_failed(cause: impl std::fmt::Display) -> Self {
        ExecError::Execution {
            message: format!("Failed to execute mloop: {cause}"),
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn exited(exit_code: i32, stdout: String, stderr: String) -> Self {
        ExecError::Execution {
            message: format!("mloop exited with code {exit_code}"),
            exit_code,
            stdout,
            stderr,
        }
    }

    pub fn timed_out(timeout: Duration) -> Self {
        ExecError::Timeout {
            message: format!("Command timed out after {}ms", timeout.as_millis()),
            timeout,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecError::Timeout { .. })
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::Execution { exit_code, .. } => Some(*exit_code),
            ExecError::Timeout { .. } => None,
        }
    }

    /// Human-readable text for an error response.
    pub fn format_for_user(&self) -> String {
        match self {
            ExecError::Execution {
                exit_code,
                stdout,
                stderr,
                ..
            } => {
                let mut text = format!("CLI Error (exit code {exit_code})");
                if !stderr.is_empty() {
                    text.push_str("\nStderr: ");
                    text.push_str(&strip_control_sequences(stderr));
                }
                if !stdout.is_empty() {
                    text.push_str("\nStdout: ");
                    text.push_str(&strip_control_sequences(stdout));
                }
                text
            }
            ExecError::Timeout { timeout, .. } => format!(
                "Timeout: Command did not complete within {}ms",
                timeout.as_millis()
            ),
        }
    }
}

/// Render any handler failure: executor errors get the detailed form,
/// everything else its message.
pub fn format_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ExecError>() {
        Some(exec) => exec.format_for_user(),
        None => format!("{err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_failure_lists_streams() {
        let err = ExecError::exited(2, "partial\x1b[0m".into(), "\x1b[31mbad label\x1b[0m".into());
        let text = err.format_for_user();
        assert_eq!(text, "CLI Error (exit code 2)\nStderr: bad label\nStdout: partial");
        assert_eq!(err.exit_code(), Some(2));
        assert_eq!(err.to_string(), "mloop exited with code 2");
    }

    #[test]
    fn empty_streams_are_skipped() {
        let err = ExecError::exited(1, String::new(), String::new());
        assert_eq!(err.format_for_user(), "CLI Error (exit code 1)");
    }

    #[test]
    fn spawn_failure_uses_minus_one() {
        let err = ExecError::spawn_failed("No such file or directory");
        assert_eq!(err.exit_code(), Some(-1));
        assert!(err.to_string().starts_with("Failed to execute mloop:"));
    }

    #[test]
    fn timeout_names_duration() {
        let err = ExecError::timed_out(Duration::from_millis(5000));
        assert!(err.is_timeout());
        assert_eq!(
            err.format_for_user(),
            "Timeout: Command did not complete within 5000ms"
        );
        assert_eq!(err.to_string(), "Command timed out after 5000ms");
    }

    #[test]
    fn format_error_downcasts() {
        let wrapped = anyhow::Error::new(ExecError::exited(3, String::new(), "boom".into()));
        assert!(format_error(&wrapped).contains("exit code 3"));

        let other = anyhow::anyhow!("At least 2 experiments are required");
        assert_eq!(format_error(&other), "At least 2 experiments are required");

        let chained = anyhow::anyhow!("missing").context("failed to read config file");
        assert_eq!(format_error(&chained), "failed to read config file: missing");
    }
}
