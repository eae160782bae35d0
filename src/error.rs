//! Error taxonomy for a single `httpx` tool invocation.

use std::io;

use thiserror::Error;

/// Everything that can go wrong between receiving a request and returning text.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Malformed request. Raised before any process is spawned.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The executable could not be started at all.
    #[error("failed to start {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The executable ran and exited with a non-zero code.
    #[error("{program} exited with code {code}. stderr: {stderr}")]
    ProcessExit {
        program: String,
        code: i32,
        stderr: String,
    },

    /// The executable ended without an exit code, usually killed by a signal.
    #[error("{program} terminated abnormally ({}). stderr: {stderr}", signal_label(.signal))]
    AbnormalTermination {
        program: String,
        signal: Option<i32>,
        stderr: String,
    },

    /// Reading the pipes or waiting on the child failed after a successful spawn.
    #[error("failed to collect output from {program}: {source}")]
    Capture {
        program: String,
        #[source]
        source: io::Error,
    },
}

pub type ToolResult<T> = Result<T, ToolError>;

impl ToolError {
    /// Stable snake_case tag for structured error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Validation(_) => "validation",
            ToolError::Launch { .. } => "launch",
            ToolError::ProcessExit { .. } => "process_exit",
            ToolError::AbnormalTermination { .. } => "abnormal_termination",
            ToolError::Capture { .. } => "capture",
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ToolError::ProcessExit { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn signal(&self) -> Option<i32> {
        match self {
            ToolError::AbnormalTermination { signal, .. } => *signal,
            _ => None,
        }
    }

    /// Captured standard error, when the process got far enough to produce one.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ToolError::ProcessExit { stderr, .. } | ToolError::AbnormalTermination { stderr, .. } => {
                Some(stderr.as_str())
            }
            _ => None,
        }
    }
}

fn signal_label(signal: &Option<i32>) -> String {
    match signal {
        Some(sig) => format!("killed by signal {sig}"),
        None => "no exit code".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_message_carries_code_and_stderr() {
        let err = ToolError::ProcessExit {
            program: "httpx".into(),
            code: 2,
            stderr: "boom".into(),
        };
        assert_eq!(err.to_string(), "httpx exited with code 2. stderr: boom");
        assert_eq!(err.kind(), "process_exit");
        assert_eq!(err.exit_code(), Some(2));
    }

    #[test]
    fn abnormal_message_names_signal() {
        let err = ToolError::AbnormalTermination {
            program: "httpx".into(),
            signal: Some(9),
            stderr: String::new(),
        };
        assert!(err.to_string().contains("killed by signal 9"));
        assert_eq!(err.signal(), Some(9));
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn launch_error_is_not_an_exit() {
        let err = ToolError::Launch {
            program: "httpx".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };
        assert!(err.to_string().starts_with("failed to start httpx"));
        assert_eq!(err.kind(), "launch");
        assert!(err.stderr().is_none());
    }
}
