//! Optimization Comparator: one-shot accept/reject of a faster variant.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::core::extract::extract_source;
use crate::core::types::ExecutionOutcome;
use crate::io::artifact::write_candidate;
use crate::io::oracle::Oracle;
use crate::io::prompt::render_optimize;
use crate::io::sandbox::Sandbox;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum OptimizationDecision {
    /// The variant passed and ran strictly faster.
    Adopted { baseline: Duration, variant: Duration },
    /// The variant passed but was not faster (ties included).
    NotImproved { baseline: Duration, variant: Duration },
    VariantFailed { detail: String },
    /// The original no longer passes, so there is nothing to compare against.
    BaselineFailed { detail: String },
    OracleUnavailable { detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizationOutcome {
    /// Winning candidate; also the content of the file on disk.
    pub candidate: String,
    /// Output of the run that vouches for `candidate`.
    pub stdout: Option<String>,
    pub decision: OptimizationDecision,
}

impl OptimizationOutcome {
    pub fn adopted(&self) -> bool {
        matches!(self.decision, OptimizationDecision::Adopted { .. })
    }
}

/// Benchmark `candidate`, request a faster variant, keep whichever wins.
///
/// The variant is adopted only if it executes successfully and its elapsed
/// time is strictly lower. Any other result restores the original on disk.
#[instrument(skip_all, fields(timeout_secs = exec_timeout.as_secs()))]
pub fn run_optimization<O, S>(
    oracle: &O,
    sandbox: &S,
    candidate: &str,
    candidate_path: &Path,
    exec_timeout: Duration,
) -> Result<OptimizationOutcome>
where
    O: Oracle + ?Sized,
    S: Sandbox + ?Sized,
{
    write_candidate(candidate_path, candidate)?;
    let (baseline, baseline_stdout) = match sandbox.execute(candidate_path, exec_timeout) {
        ExecutionOutcome::Success { elapsed, stdout } => (elapsed, stdout),
        other => {
            let detail = other.failure().map(|f| f.diagnostic()).unwrap_or_default();
            warn!(outcome = other.kind(), "baseline run failed, skipping optimization");
            return Ok(OptimizationOutcome {
                candidate: candidate.to_string(),
                stdout: None,
                decision: OptimizationDecision::BaselineFailed { detail },
            });
        }
    };
    let keep = |decision: OptimizationDecision| OptimizationOutcome {
        candidate: candidate.to_string(),
        stdout: Some(baseline_stdout.clone()),
        decision,
    };

    let prompt = render_optimize(candidate)?;
    let variant_source = match oracle.generate(&prompt) {
        Ok(raw) => extract_source(&raw),
        Err(err) => {
            warn!(err = %err, "oracle unavailable, keeping original");
            return Ok(keep(OptimizationDecision::OracleUnavailable {
                detail: err.to_string(),
            }));
        }
    };

    write_candidate(candidate_path, &variant_source)?;
    let variant_outcome = sandbox.execute(candidate_path, exec_timeout);
    let decision = match variant_outcome {
        ExecutionOutcome::Success { elapsed, stdout } if elapsed < baseline => {
            info!(
                baseline_ms = baseline.as_millis() as u64,
                variant_ms = elapsed.as_millis() as u64,
                "variant adopted"
            );
            return Ok(OptimizationOutcome {
                candidate: variant_source,
                stdout: Some(stdout),
                decision: OptimizationDecision::Adopted {
                    baseline,
                    variant: elapsed,
                },
            });
        }
        ExecutionOutcome::Success { elapsed, .. } => OptimizationDecision::NotImproved {
            baseline,
            variant: elapsed,
        },
        other => OptimizationDecision::VariantFailed {
            detail: other.failure().map(|f| f.diagnostic()).unwrap_or_default(),
        },
    };

    info!(decision = ?decision, "variant rejected, restoring original");
    write_candidate(candidate_path, candidate)?;
    Ok(keep(decision))
}
