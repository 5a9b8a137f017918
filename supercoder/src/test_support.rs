//! Test-only scripted collaborators and scratch workspaces.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::lint_report::parse_lint_report;
use crate::core::types::{ExecutionOutcome, LintOutcome};
use crate::io::artifact::ArtifactPaths;
use crate::io::linter::Linter;
use crate::io::oracle::{Oracle, OracleUnavailable};
use crate::io::sandbox::Sandbox;

pub const CLEAN_REPORT: &str =
    "\n------------------------------------\nYour code has been rated at 10.00/10\n";

/// A pylint-style report with `findings` missing-docstring findings.
pub fn unclean_report(findings: usize) -> String {
    let mut report = String::from("************* Module generated_code\n");
    for line in 1..=findings {
        report.push_str(&format!(
            "generated_code.py:{line}:0: C0114: Missing module docstring (missing-module-docstring)\n"
        ));
    }
    report.push_str("\nYour code has been rated at 7.50/10\n");
    report
}

pub fn success(stdout: &str, elapsed_ms: u64) -> ExecutionOutcome {
    ExecutionOutcome::Success {
        stdout: stdout.to_string(),
        elapsed: Duration::from_millis(elapsed_ms),
    }
}

pub fn failure(stderr: &str) -> ExecutionOutcome {
    ExecutionOutcome::Failure {
        stderr: stderr.to_string(),
    }
}

/// Oracle that replays a fixed queue of responses and records every prompt.
pub struct ScriptedOracle {
    responses: RefCell<VecDeque<Result<String, OracleUnavailable>>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<Result<String, OracleUnavailable>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn replying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|text| Ok(text.to_string())).collect())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl Oracle for ScriptedOracle {
    fn generate(&self, prompt: &str) -> Result<String, OracleUnavailable> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(OracleUnavailable::new("scripted oracle has no responses left")))
    }
}

/// Sandbox that replays a fixed queue of outcomes and records the file text it ran.
pub struct ScriptedSandbox {
    outcomes: RefCell<VecDeque<ExecutionOutcome>>,
    executed: RefCell<Vec<String>>,
}

impl ScriptedSandbox {
    pub fn new(outcomes: Vec<ExecutionOutcome>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into()),
            executed: RefCell::new(Vec::new()),
        }
    }

    /// File contents seen at each execution, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }
}

impl Sandbox for ScriptedSandbox {
    fn execute(&self, source_path: &Path, _timeout: Duration) -> ExecutionOutcome {
        let source = fs::read_to_string(source_path).unwrap_or_default();
        self.executed.borrow_mut().push(source);
        self.outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| failure("scripted sandbox has no outcomes left"))
    }
}

/// Linter that replays reports; the last report repeats once the queue runs dry.
pub struct ScriptedLinter {
    reports: RefCell<VecDeque<String>>,
    last: RefCell<Option<String>>,
    checked: RefCell<Vec<String>>,
    unavailable: bool,
}

impl ScriptedLinter {
    pub fn new<I, S>(reports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reports: RefCell::new(reports.into_iter().map(Into::into).collect()),
            last: RefCell::new(None),
            checked: RefCell::new(Vec::new()),
            unavailable: false,
        }
    }

    /// A linter whose tool cannot be launched.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new(Vec::<String>::new())
        }
    }

    /// File contents seen at each check, in order.
    pub fn checked(&self) -> Vec<String> {
        self.checked.borrow().clone()
    }
}

impl Linter for ScriptedLinter {
    fn check(&self, source_path: &Path) -> Result<LintOutcome> {
        if self.unavailable {
            return Err(anyhow!("scripted linter is unavailable"));
        }
        let source = fs::read_to_string(source_path)?;
        self.checked.borrow_mut().push(source);

        let next = self.reports.borrow_mut().pop_front();
        let report = match next {
            Some(report) => {
                *self.last.borrow_mut() = Some(report.clone());
                report
            }
            None => self
                .last
                .borrow()
                .clone()
                .ok_or_else(|| anyhow!("scripted linter has no reports"))?,
        };
        Ok(parse_lint_report(&report))
    }
}

/// Temporary directory with the standard artifact layout.
pub struct TestWorkspace {
    // Held to keep the directory alive.
    _temp: TempDir,
    paths: ArtifactPaths,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let paths = ArtifactPaths::new(temp.path(), Path::new("generated_code.py"));
        Ok(Self { _temp: temp, paths })
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn candidate_path(&self) -> &Path {
        &self.paths.candidate_path
    }

    pub fn read_candidate(&self) -> String {
        fs::read_to_string(&self.paths.candidate_path).unwrap_or_default()
    }
}
