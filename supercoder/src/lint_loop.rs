//! Lint-Repair Loop: check, normalize, escalate until the report is clean.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::core::budget::RepairBudget;
use crate::core::extract::extract_source;
use crate::core::normalize::normalize;
use crate::io::artifact::{write_candidate, write_lint_log};
use crate::io::linter::Linter;
use crate::io::oracle::Oracle;
use crate::io::prompt::render_lint;

#[derive(Debug, Clone)]
pub struct LintRequest<'a> {
    pub candidate: &'a str,
    pub candidate_path: &'a Path,
    /// Written only when the loop gives up with findings left.
    pub lint_log_path: &'a Path,
    /// Maximum number of oracle escalations.
    pub max_attempts: u32,
}

/// Reason why `run_lint_loop` stopped. None of these fail the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LintStop {
    Clean,
    /// Escalation budget spent; the last report was written to the lint log.
    Exhausted,
    OracleUnavailable { detail: String },
    LinterUnavailable { detail: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LintLoopOutcome {
    /// Last generated text; always equal to the file on disk.
    pub candidate: String,
    pub is_clean: bool,
    pub escalations: u32,
    pub last_report: Option<String>,
    pub stop: LintStop,
}

/// Best-effort lint repair of a working candidate.
///
/// Each round checks the file, normalizes the text locally and asks the oracle
/// to resolve the remaining findings. A final check follows the last
/// escalation so the returned verdict describes the returned text.
#[instrument(skip_all, fields(max_attempts = request.max_attempts))]
pub fn run_lint_loop<O, L>(
    oracle: &O,
    linter: &L,
    request: &LintRequest<'_>,
) -> Result<LintLoopOutcome>
where
    O: Oracle + ?Sized,
    L: Linter + ?Sized,
{
    let mut budget = RepairBudget::new(request.max_attempts);
    let mut candidate = request.candidate.to_string();
    let mut last_report = None;
    write_candidate(request.candidate_path, &candidate)?;

    let stop = loop {
        let lint = match linter.check(request.candidate_path) {
            Ok(lint) => lint,
            Err(err) => {
                warn!(err = %err, "linter unavailable, keeping candidate");
                break LintStop::LinterUnavailable {
                    detail: format!("{err:#}"),
                };
            }
        };
        info!(
            round = budget.used(),
            max_attempts = budget.max(),
            findings = lint.findings,
            score = ?lint.score,
            is_clean = lint.is_clean,
            "lint checked"
        );
        let is_clean = lint.is_clean;
        let report = lint.report;
        last_report = Some(report.clone());
        if is_clean {
            break LintStop::Clean;
        }

        let Some(round) = budget.try_spend() else {
            write_lint_log(request.lint_log_path, &report)?;
            warn!(escalations = budget.used(), "lint findings unresolved");
            break LintStop::Exhausted;
        };

        let normalized = normalize(&candidate);
        let prompt = render_lint(&normalized, &report)?;
        match oracle.generate(&prompt) {
            Ok(raw) => {
                let fixed = extract_source(&raw);
                if fixed.trim().is_empty() {
                    warn!(round, "oracle returned no code, keeping normalized candidate");
                    candidate = normalized;
                } else {
                    candidate = fixed;
                }
            }
            Err(err) => {
                warn!(round, err = %err, "oracle unavailable during lint repair");
                candidate = normalized;
                write_candidate(request.candidate_path, &candidate)?;
                break LintStop::OracleUnavailable {
                    detail: err.to_string(),
                };
            }
        }
        write_candidate(request.candidate_path, &candidate)?;
        info!(round, max_attempts = budget.max(), "lint escalation applied");
    };

    Ok(LintLoopOutcome {
        is_clean: stop == LintStop::Clean,
        candidate,
        escalations: budget.used(),
        last_report,
        stop,
    })
}
