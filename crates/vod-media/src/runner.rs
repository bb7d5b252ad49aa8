//! Bounded external process runner.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};

/// Maximum bytes of stdout/stderr retained per invocation.
const MAX_CAPTURED_BYTES: usize = 64 * 1024;

/// Captured output of a finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runner for external binaries with a wall-clock deadline.
///
/// The runner enforces the timeout and surfaces a uniform error; it never
/// retries. Retry policy belongs to the calling pipeline's fallback loop.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    /// Create a runner with the given per-invocation timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run a binary to completion, capturing bounded output.
    ///
    /// Non-zero exit becomes [`MediaError::CommandFailed`] carrying
    /// truncated stderr; exceeding the deadline kills the child and
    /// returns [`MediaError::Timeout`].
    pub async fn run(&self, program: &str, args: &[String]) -> MediaResult<CommandOutput> {
        debug!("Running {} {}", program, args.join(" "));

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "{} timed out after {} seconds, killing process",
                    program,
                    self.timeout.as_secs()
                );
                return Err(MediaError::Timeout {
                    program: program.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let stdout = bounded_lossy(&output.stdout);
        let stderr = bounded_lossy(&output.stderr);

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            Err(MediaError::command_failed(
                program,
                "exited with non-zero status",
                Some(stderr),
                output.status.code(),
            ))
        }
    }

    /// Run an FFmpeg command built with [`FfmpegCommand`].
    pub async fn run_ffmpeg(&self, cmd: &FfmpegCommand) -> MediaResult<CommandOutput> {
        crate::command::check_ffmpeg()?;
        self.run("ffmpeg", &cmd.build_args()).await
    }
}

/// Decode bytes lossily, keeping at most the trailing [`MAX_CAPTURED_BYTES`].
///
/// The tail is kept rather than the head: encoders print the fatal message
/// last, after pages of progress noise.
fn bounded_lossy(bytes: &[u8]) -> String {
    let slice = if bytes.len() > MAX_CAPTURED_BYTES {
        &bytes[bytes.len() - MAX_CAPTURED_BYTES..]
    } else {
        bytes
    };
    String::from_utf8_lossy(slice).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_lossy_keeps_tail() {
        let mut data = vec![b'a'; MAX_CAPTURED_BYTES];
        let mut prefix = vec![b'x'; 100];
        prefix.append(&mut data);

        let out = bounded_lossy(&prefix);
        assert_eq!(out.len(), MAX_CAPTURED_BYTES);
        assert!(!out.contains('x'));
    }

    #[tokio::test]
    async fn test_run_missing_binary_is_io_error() {
        let runner = ProcessRunner::new(Duration::from_secs(5));
        let result = runner.run("definitely-not-a-real-binary-xyz", &[]).await;
        assert!(matches!(result, Err(MediaError::Io(_))));
    }

    #[tokio::test]
    async fn test_run_nonzero_exit() {
        let runner = ProcessRunner::new(Duration::from_secs(5));
        let result = runner.run("false", &[]).await;
        match result {
            Err(MediaError::CommandFailed { program, exit_code, .. }) => {
                assert_eq!(program, "false");
                assert_eq!(exit_code, Some(1));
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let runner = ProcessRunner::new(Duration::from_secs(5));
        let output = runner
            .run("echo", &["hello".to_string()])
            .await
            .expect("echo should succeed");
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_timeout_kills_process() {
        let runner = ProcessRunner::new(Duration::from_millis(200));
        let result = runner.run("sleep", &["5".to_string()]).await;
        assert!(matches!(result, Err(MediaError::Timeout { .. })));
    }
}
