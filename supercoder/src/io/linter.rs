//! Static-analysis adapter.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument};

use crate::core::lint_report::parse_lint_report;
use crate::core::types::LintOutcome;
use crate::io::process::run_command_with_timeout;

/// Linters get a generous fixed bound; a hung linter is reported as unavailable.
pub const LINT_TIMEOUT: Duration = Duration::from_secs(120);

/// Abstraction over static-analysis backends.
///
/// `Err` means the tool itself could not produce a report. An unclean report is
/// a normal `Ok` value.
pub trait Linter {
    fn check(&self, source_path: &Path) -> Result<LintOutcome>;
}

/// Linter that runs `argv + [source_path]` and parses its text report.
pub struct CommandLinter {
    argv: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandLinter {
    pub fn new(argv: Vec<String>, output_limit_bytes: usize) -> Self {
        Self {
            argv,
            timeout: LINT_TIMEOUT,
            output_limit_bytes,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Linter for CommandLinter {
    #[instrument(skip_all, fields(source = %source_path.display()))]
    fn check(&self, source_path: &Path) -> Result<LintOutcome> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| anyhow!("linter command is empty"))?;

        let mut cmd = Command::new(program);
        cmd.args(args).arg(source_path);
        let output = run_command_with_timeout(cmd, None, self.timeout, self.output_limit_bytes)?;
        if output.timed_out {
            return Err(anyhow!(
                "linter {program} timed out after {}s",
                self.timeout.as_secs()
            ));
        }

        // Linters signal findings through non-zero exit codes, so the status is
        // not an error by itself.
        let mut report = output.stdout_text();
        let stderr = output.stderr_text();
        if !stderr.trim().is_empty() {
            report.push_str(&stderr);
        }
        let outcome = parse_lint_report(&report);
        debug!(
            exit_code = ?output.status.code(),
            findings = outcome.findings,
            score = ?outcome.score,
            is_clean = outcome.is_clean,
            "lint finished"
        );
        Ok(outcome)
    }
}
