use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::ansi;
use crate::error::{ToolError, ToolResult};
use crate::types::{Captured, ProcessOutput};

/// Binary looked up through `PATH` when no explicit path is configured.
pub const DEFAULT_BINARY: &str = "httpx";
/// Environment variable that overrides the binary location.
pub const BINARY_ENV: &str = "HTTPX_PATH";
/// Per-stream capture cap used unless configured otherwise.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

const READ_CHUNK: usize = 8 * 1024;

/// Launches the scanner binary and turns its exit into text or a `ToolError`.
///
/// - The child inherits the full environment of this process; stdin is null.
/// - stdout and stderr are drained concurrently so neither pipe can fill up and stall the child.
/// - Each stream keeps at most `max_output_bytes`; the rest is read and dropped.
/// - No timeout and no kill: once spawned, the child runs to completion.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    binary: PathBuf,
    max_output_bytes: Option<usize>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

impl ProcessRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            max_output_bytes: Some(DEFAULT_MAX_OUTPUT_BYTES),
        }
    }

    /// `None` disables the cap.
    pub fn with_max_output_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_output_bytes = limit;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn max_output_bytes(&self) -> Option<usize> {
        self.max_output_bytes
    }

    /// Run the binary with `args` and return its SGR-stripped stdout.
    pub async fn run(&self, args: &[String]) -> ToolResult<String> {
        let output = self.execute(args).await?;
        classify(&self.program_name(), output)
    }

    /// Spawn, drain both pipes, wait. No classification.
    pub async fn execute(&self, args: &[String]) -> ToolResult<ProcessOutput> {
        let program = self.program_name();
        debug!(program = %self.binary.display(), ?args, "spawning scanner");

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Launch {
                program: program.clone(),
                source,
            })?;

        let capture_err = |source: io::Error| ToolError::Capture {
            program: program.clone(),
            source,
        };

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| capture_err(io::Error::other("stdout not piped")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| capture_err(io::Error::other("stderr not piped")))?;

        let (stdout, stderr, status) = tokio::join!(
            drain(stdout, self.max_output_bytes),
            drain(stderr, self.max_output_bytes),
            child.wait(),
        );
        let stdout = stdout.map_err(capture_err)?;
        let stderr = stderr.map_err(capture_err)?;
        let status = status.map_err(capture_err)?;

        info!(
            program = %program,
            exit_code = ?status.code(),
            stdout_bytes = stdout.total,
            stderr_bytes = stderr.total,
            "scanner finished"
        );

        Ok(ProcessOutput {
            exit_code: status.code(),
            signal: termination_signal(&status),
            stdout,
            stderr,
        })
    }

    fn program_name(&self) -> String {
        self.binary
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.binary.display().to_string())
    }
}

/// Map a finished process to cleaned stdout or an error.
///
/// - exit 0: stdout with SGR sequences removed; a capped stdout keeps whole lines only
/// - exit n != 0: `ProcessExit` with code and full stderr
/// - no exit code: `AbnormalTermination`
pub fn classify(program: &str, output: ProcessOutput) -> ToolResult<String> {
    match output.exit_code {
        Some(0) if output.stdout.truncated() => {
            let kept = output.stdout.complete_lines();
            warn!(
                program = %program,
                kept = kept.len(),
                total = output.stdout.total,
                "scanner output exceeded capture limit"
            );
            let mut text = ansi::strip_sgr(&String::from_utf8_lossy(kept));
            text.push_str(&format!(
                "\n[output truncated: {} of {} bytes kept]",
                kept.len(),
                output.stdout.total
            ));
            Ok(text)
        }
        Some(0) => Ok(ansi::strip_sgr(&output.stdout.to_text())),
        Some(code) => Err(ToolError::ProcessExit {
            program: program.to_string(),
            code,
            stderr: output.stderr.to_text(),
        }),
        None => Err(ToolError::AbnormalTermination {
            program: program.to_string(),
            signal: output.signal,
            stderr: output.stderr.to_text(),
        }),
    }
}

async fn drain<R>(mut reader: R, limit: Option<usize>) -> io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Captured::default();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        captured.total += n as u64;
        let keep = match limit {
            Some(limit) => limit.saturating_sub(captured.bytes.len()).min(n),
            None => n,
        };
        captured.bytes.extend_from_slice(&chunk[..keep]);
    }
    Ok(captured)
}

#[cfg(unix)]
fn termination_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
