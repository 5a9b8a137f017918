//! Sandbox adapter that runs a candidate file under an interpreter.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::core::types::ExecutionOutcome;
use crate::io::process::run_command_with_timeout;

pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(30);

/// Abstraction over candidate execution backends.
///
/// Implementations never fail: launch problems surface as
/// [`ExecutionOutcome::Failure`] and overruns as [`ExecutionOutcome::Timeout`].
pub trait Sandbox {
    fn execute(&self, source_path: &Path, timeout: Duration) -> ExecutionOutcome;
}

/// Sandbox that runs `argv + [source_path]` in the source's directory.
pub struct CommandSandbox {
    argv: Vec<String>,
    output_limit_bytes: usize,
}

impl CommandSandbox {
    pub fn new(argv: Vec<String>, output_limit_bytes: usize) -> Self {
        Self {
            argv,
            output_limit_bytes,
        }
    }
}

impl Sandbox for CommandSandbox {
    #[instrument(skip_all, fields(source = %source_path.display(), timeout_secs = timeout.as_secs()))]
    fn execute(&self, source_path: &Path, timeout: Duration) -> ExecutionOutcome {
        let Some((program, args)) = self.argv.split_first() else {
            return ExecutionOutcome::Failure {
                stderr: "sandbox command is empty".to_string(),
            };
        };
        info!(%program, "running candidate");

        let mut cmd = Command::new(program);
        cmd.args(args);
        // The child runs in the source's directory, so it gets the bare file name.
        match (
            source_path.parent().filter(|dir| !dir.as_os_str().is_empty()),
            source_path.file_name(),
        ) {
            (Some(dir), Some(name)) => {
                cmd.arg(name).current_dir(dir);
            }
            _ => {
                cmd.arg(source_path);
            }
        }

        let output = match run_command_with_timeout(cmd, None, timeout, self.output_limit_bytes)
        {
            Ok(output) => output,
            Err(err) => {
                warn!(err = %err, "sandbox could not launch candidate");
                return ExecutionOutcome::Failure {
                    stderr: format!("sandbox error: {err:#}"),
                };
            }
        };

        if output.timed_out {
            return ExecutionOutcome::Timeout { after: timeout };
        }
        if output.status.success() {
            debug!(elapsed_ms = output.elapsed.as_millis() as u64, "candidate succeeded");
            return ExecutionOutcome::Success {
                stdout: output.stdout_text(),
                elapsed: output.elapsed,
            };
        }

        let mut stderr = output.stderr_text();
        if stderr.trim().is_empty() {
            stderr = format!(
                "process exited with status {:?}\n{}",
                output.status.code(),
                output.stdout_text()
            );
        }
        debug!(exit_code = ?output.status.code(), "candidate failed");
        ExecutionOutcome::Failure { stderr }
    }
}
