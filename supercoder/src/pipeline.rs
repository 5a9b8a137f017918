//! Full run: generate, optimize, lint, then record a summary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::core::types::{Attempt, ExecutionOutcome};
use crate::generate::{GenerationOutcome, GenerationRequest, GenerationStop, run_generation};
use crate::io::artifact::{ArtifactPaths, write_candidate, write_summary};
use crate::io::config::SupercoderConfig;
use crate::io::linter::Linter;
use crate::io::oracle::Oracle;
use crate::io::sandbox::Sandbox;
use crate::lint_loop::{LintLoopOutcome, LintRequest, LintStop, run_lint_loop};
use crate::optimize::{OptimizationDecision, OptimizationOutcome, run_optimization};

/// Per-run knobs, usually derived from [`SupercoderConfig`] plus CLI overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub max_attempts: u32,
    pub exec_timeout: Duration,
    pub lint_max_attempts: u32,
    pub optimize: bool,
    pub lint: bool,
    pub noise_seed: Option<u64>,
}

impl PipelineOptions {
    pub fn from_config(cfg: &SupercoderConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            exec_timeout: cfg.exec_timeout(),
            lint_max_attempts: cfg.lint_max_attempts,
            optimize: cfg.optimize,
            lint: cfg.lint,
            noise_seed: cfg.noise_seed,
        }
    }
}

/// Record written to `.supercoder/summary.json` after every run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub task: String,
    pub success: bool,
    pub candidate_path: PathBuf,
    pub attempts_used: u32,
    pub max_attempts: u32,
    pub generation: GenerationStop,
    pub last_diagnostic: Option<String>,
    pub optimization: Option<OptimizationDecision>,
    pub lint: Option<LintStop>,
    pub lint_escalations: Option<u32>,
    /// Whether the lint-repaired text still ran; `None` when lint left the text unchanged.
    pub lint_verified: Option<bool>,
    pub final_stdout: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Final artifact text, identical to the file on disk.
    pub candidate: String,
    pub success: bool,
    pub generation: GenerationOutcome,
    pub optimization: Option<OptimizationOutcome>,
    pub lint: Option<LintLoopOutcome>,
    pub summary: RunSummary,
}

/// Run every stage for `task` and persist the artifacts under `paths`.
///
/// Optimization and lint only run after a successful generation. A candidate
/// whose re-run during optimization fails ends the run as a failure. Lint output
/// is executed once more before it is accepted; if it no longer runs, the
/// previously passing text is restored.
#[instrument(skip_all, fields(task_bytes = task.len()))]
pub fn run_pipeline<O, S, L, F>(
    oracle: &O,
    sandbox: &S,
    linter: &L,
    paths: &ArtifactPaths,
    task: &str,
    options: &PipelineOptions,
    on_attempt: F,
) -> Result<PipelineOutcome>
where
    O: Oracle + ?Sized,
    S: Sandbox + ?Sized,
    L: Linter + ?Sized,
    F: FnMut(&Attempt),
{
    let generation = run_generation(
        oracle,
        sandbox,
        &GenerationRequest {
            task,
            candidate_path: &paths.candidate_path,
            max_attempts: options.max_attempts,
            exec_timeout: options.exec_timeout,
            noise_seed: options.noise_seed,
        },
        on_attempt,
    )?;

    let mut summary = RunSummary {
        task: task.to_string(),
        success: generation.success,
        candidate_path: paths.candidate_path.clone(),
        attempts_used: generation.attempts_used(),
        max_attempts: options.max_attempts,
        generation: generation.stop.clone(),
        last_diagnostic: generation.last_diagnostic(),
        optimization: None,
        lint: None,
        lint_escalations: None,
        lint_verified: None,
        final_stdout: None,
    };

    if !generation.success {
        warn!(stop = ?generation.stop, "generation did not produce a passing candidate");
        write_summary(&paths.summary_path, &summary)?;
        return Ok(PipelineOutcome {
            candidate: generation.candidate.clone(),
            success: false,
            generation,
            optimization: None,
            lint: None,
            summary,
        });
    }

    let mut candidate = generation.candidate.clone();
    let mut final_stdout = generation.attempts.last().and_then(|attempt| match &attempt.outcome {
        ExecutionOutcome::Success { stdout, .. } => Some(stdout.clone()),
        _ => None,
    });

    let optimization = if options.optimize {
        let outcome = run_optimization(
            oracle,
            sandbox,
            &candidate,
            &paths.candidate_path,
            options.exec_timeout,
        )?;
        if outcome.stdout.is_some() {
            final_stdout = outcome.stdout.clone();
        }
        candidate = outcome.candidate.clone();
        summary.optimization = Some(outcome.decision.clone());
        if let OptimizationDecision::BaselineFailed { detail } = &outcome.decision {
            warn!("candidate failed its re-run, reporting failure");
            summary.success = false;
            summary.last_diagnostic = Some(detail.clone());
            write_summary(&paths.summary_path, &summary)?;
            return Ok(PipelineOutcome {
                candidate,
                success: false,
                generation,
                optimization: Some(outcome),
                lint: None,
                summary,
            });
        }
        Some(outcome)
    } else {
        None
    };

    let lint = if options.lint {
        let outcome = run_lint_loop(
            oracle,
            linter,
            &LintRequest {
                candidate: &candidate,
                candidate_path: &paths.candidate_path,
                lint_log_path: &paths.lint_log_path,
                max_attempts: options.lint_max_attempts,
            },
        )?;
        summary.lint = Some(outcome.stop.clone());
        summary.lint_escalations = Some(outcome.escalations);

        if outcome.candidate != candidate {
            match sandbox.execute(&paths.candidate_path, options.exec_timeout) {
                ExecutionOutcome::Success { stdout, .. } => {
                    info!("lint-repaired candidate verified");
                    summary.lint_verified = Some(true);
                    final_stdout = Some(stdout);
                    candidate = outcome.candidate.clone();
                }
                other => {
                    warn!(outcome = other.kind(), "lint-repaired candidate broke, restoring");
                    summary.lint_verified = Some(false);
                    write_candidate(&paths.candidate_path, &candidate)?;
                }
            }
        }
        Some(outcome)
    } else {
        None
    };

    summary.final_stdout = final_stdout;
    write_summary(&paths.summary_path, &summary)?;
    Ok(PipelineOutcome {
        candidate,
        success: true,
        generation,
        optimization,
        lint,
        summary,
    })
}
