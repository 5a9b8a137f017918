//! Shared deterministic types for the repair loops.
//!
//! These types define stable contracts between the loops and their
//! collaborators. They carry no I/O and serialize deterministically so they can
//! be recorded in the run summary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result of running a candidate in the sandbox.
///
/// Only sandbox adapters construct these; the loops merely inspect them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The candidate exited successfully.
    Success { stdout: String, elapsed: Duration },
    /// The candidate exited non-zero or could not be launched.
    Failure { stderr: String },
    /// The candidate was killed after exceeding its wall-clock bound.
    Timeout { after: Duration },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }

    /// Elapsed time of a successful run.
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            ExecutionOutcome::Success { elapsed, .. } => Some(*elapsed),
            _ => None,
        }
    }

    /// Classify a non-successful outcome as a retryable candidate failure.
    pub fn failure(&self) -> Option<CandidateFailure> {
        match self {
            ExecutionOutcome::Success { .. } => None,
            ExecutionOutcome::Failure { stderr } => Some(CandidateFailure::ExecutionFailed {
                stderr: stderr.clone(),
            }),
            ExecutionOutcome::Timeout { after } => {
                Some(CandidateFailure::TimedOut { after: *after })
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionOutcome::Success { .. } => "success",
            ExecutionOutcome::Failure { .. } => "failure",
            ExecutionOutcome::Timeout { .. } => "timeout",
        }
    }
}

/// Retryable reason a candidate did not pass; drives the next repair prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateFailure {
    ExecutionFailed { stderr: String },
    TimedOut { after: Duration },
}

impl CandidateFailure {
    /// Diagnostic text handed back to the oracle and shown to the user.
    pub fn diagnostic(&self) -> String {
        match self {
            CandidateFailure::ExecutionFailed { stderr } => stderr.trim().to_string(),
            CandidateFailure::TimedOut { after } => format!(
                "execution timed out after {}s: the program is too slow or hung",
                after.as_secs()
            ),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CandidateFailure::TimedOut { .. })
    }
}

/// Static-analysis result for a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintOutcome {
    pub report: String,
    /// Number of findings parsed from the report.
    pub findings: usize,
    /// Composite score out of 10, when the tool printed one.
    pub score: Option<f64>,
    /// Zero findings and a perfect score.
    pub is_clean: bool,
}

/// One recorded round of the Generation-Repair Loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    /// 1-indexed attempt number.
    pub number: u32,
    pub prompt: String,
    pub raw_response: String,
    pub candidate: String,
    /// Whether the noise injector corrupted this candidate.
    pub noised: bool,
    pub outcome: ExecutionOutcome,
}
