//! Generation-Repair Loop: generate, execute, repair until the candidate runs.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::core::budget::RepairBudget;
use crate::core::extract::extract_source;
use crate::core::noise::NoiseInjector;
use crate::core::types::Attempt;
use crate::io::artifact::write_candidate;
use crate::io::oracle::Oracle;
use crate::io::prompt::{render_generate, render_repair};
use crate::io::sandbox::Sandbox;

/// Inputs for one Generation-Repair run.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub task: &'a str,
    pub candidate_path: &'a Path,
    /// Maximum number of sandbox executions.
    pub max_attempts: u32,
    pub exec_timeout: Duration,
    /// Corrupt the first response with this seed.
    pub noise_seed: Option<u64>,
}

/// Reason why `run_generation` stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum GenerationStop {
    /// The last candidate executed successfully.
    Succeeded,
    /// Every attempt in the budget was spent without a passing candidate.
    Exhausted,
    /// The oracle failed; the loop ended without retrying.
    OracleUnavailable { detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Last candidate written to disk (empty if no response was ever received).
    pub candidate: String,
    pub success: bool,
    pub attempts: Vec<Attempt>,
    pub stop: GenerationStop,
}

impl GenerationOutcome {
    pub fn attempts_used(&self) -> u32 {
        self.attempts.len() as u32
    }

    /// Last diagnostic worth showing the user, if the run did not succeed.
    pub fn last_diagnostic(&self) -> Option<String> {
        match &self.stop {
            GenerationStop::Succeeded => None,
            GenerationStop::OracleUnavailable { detail } => Some(detail.clone()),
            GenerationStop::Exhausted => self
                .attempts
                .last()
                .and_then(|attempt| attempt.outcome.failure())
                .map(|failure| failure.diagnostic()),
        }
    }
}

/// Drive generate → execute → repair until a candidate passes or the budget is spent.
///
/// Expected failures (candidate errors, timeouts, oracle outages) are reported
/// through the returned outcome. `Err` is reserved for infrastructure faults
/// such as failing to write the candidate file. `on_attempt` is called after
/// every execution.
#[instrument(skip_all, fields(max_attempts = request.max_attempts, noise = request.noise_seed.is_some()))]
pub fn run_generation<O, S, F>(
    oracle: &O,
    sandbox: &S,
    request: &GenerationRequest<'_>,
    mut on_attempt: F,
) -> Result<GenerationOutcome>
where
    O: Oracle + ?Sized,
    S: Sandbox + ?Sized,
    F: FnMut(&Attempt),
{
    let mut budget = RepairBudget::new(request.max_attempts);
    let mut noise = request.noise_seed.map(NoiseInjector::from_seed);
    let mut attempts: Vec<Attempt> = Vec::new();
    let mut candidate = String::new();
    let mut prompt = render_generate(request.task)?;

    while let Some(number) = budget.try_spend() {
        let raw_response = match oracle.generate(&prompt) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(attempt = number, max_attempts = budget.max(), err = %err, "oracle unavailable, stopping");
                return Ok(GenerationOutcome {
                    candidate,
                    success: false,
                    attempts,
                    stop: GenerationStop::OracleUnavailable {
                        detail: err.to_string(),
                    },
                });
            }
        };

        let mut source = extract_source(&raw_response);
        let mut noised = false;
        if number == 1
            && let Some(corrupted) = noise.as_mut().and_then(|injector| injector.inject(&source))
        {
            info!(attempt = number, "noise injected into first candidate");
            source = corrupted;
            noised = true;
        }

        write_candidate(request.candidate_path, &source)?;
        let outcome = sandbox.execute(request.candidate_path, request.exec_timeout);
        info!(
            attempt = number,
            max_attempts = budget.max(),
            outcome = outcome.kind(),
            "attempt executed"
        );

        let failure = outcome.failure();
        let attempt = Attempt {
            number,
            prompt,
            raw_response,
            candidate: source.clone(),
            noised,
            outcome,
        };
        on_attempt(&attempt);
        attempts.push(attempt);
        candidate = source;

        let Some(failure) = failure else {
            return Ok(GenerationOutcome {
                candidate,
                success: true,
                attempts,
                stop: GenerationStop::Succeeded,
            });
        };
        if budget.is_exhausted() {
            break;
        }
        prompt = render_repair(request.task, &candidate, &failure)?;
    }

    warn!(attempts = budget.used(), "attempt budget exhausted without a passing candidate");
    Ok(GenerationOutcome {
        candidate,
        success: false,
        attempts,
        stop: GenerationStop::Exhausted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ExecutionOutcome;
    use crate::io::oracle::OracleUnavailable;
    use crate::test_support::{ScriptedOracle, ScriptedSandbox, TestWorkspace, failure, success};

    fn request<'a>(task: &'a str, path: &'a Path, max_attempts: u32) -> GenerationRequest<'a> {
        GenerationRequest {
            task,
            candidate_path: path,
            max_attempts,
            exec_timeout: Duration::from_secs(30),
            noise_seed: None,
        }
    }

    #[test]
    fn stops_at_first_success_without_more_oracle_calls() {
        let ws = TestWorkspace::new().expect("workspace");
        let oracle = ScriptedOracle::replying(&["```python\nprint('ok')\n```", "unused"]);
        let sandbox = ScriptedSandbox::new(vec![success("ok\n", 10)]);

        let outcome = run_generation(
            &oracle,
            &sandbox,
            &request("prime", ws.candidate_path(), 5),
            |_| {},
        )
        .expect("run");

        assert!(outcome.success);
        assert_eq!(outcome.stop, GenerationStop::Succeeded);
        assert_eq!(outcome.candidate, "print('ok')");
        assert_eq!(outcome.attempts_used(), 1);
        assert_eq!(oracle.calls(), 1);
        assert_eq!(ws.read_candidate(), "print('ok')\n");
    }

    #[test]
    fn repair_prompt_carries_previous_candidate_and_stderr() {
        let ws = TestWorkspace::new().expect("workspace");
        let oracle = ScriptedOracle::replying(&["print(1/0)", "print(1)"]);
        let sandbox = ScriptedSandbox::new(vec![
            failure("ZeroDivisionError: division by zero"),
            success("1\n", 5),
        ]);

        let mut seen = Vec::new();
        let outcome = run_generation(
            &oracle,
            &sandbox,
            &request("divide", ws.candidate_path(), 5),
            |attempt| seen.push(attempt.number),
        )
        .expect("run");

        assert!(outcome.success);
        assert_eq!(seen, vec![1, 2]);
        let prompts = oracle.prompts();
        assert!(prompts[1].contains("print(1/0)"));
        assert!(prompts[1].contains("ZeroDivisionError"));
        assert_eq!(sandbox.executed(), vec!["print(1/0)\n", "print(1)\n"]);
    }

    #[test]
    fn never_executes_more_than_max_attempts() {
        let ws = TestWorkspace::new().expect("workspace");
        let oracle = ScriptedOracle::replying(&["a", "b", "c", "d"]);
        let sandbox = ScriptedSandbox::new(vec![
            failure("e1"),
            failure("e2"),
            failure("e3"),
            success("late", 1),
        ]);

        let outcome = run_generation(
            &oracle,
            &sandbox,
            &request("task", ws.candidate_path(), 3),
            |_| {},
        )
        .expect("run");

        assert!(!outcome.success);
        assert_eq!(outcome.stop, GenerationStop::Exhausted);
        assert_eq!(sandbox.executed().len(), 3);
        assert_eq!(oracle.calls(), 3);
        assert_eq!(outcome.candidate, "c");
        assert_eq!(outcome.last_diagnostic().as_deref(), Some("e3"));
    }

    #[test]
    fn timeout_drives_repair_with_hint() {
        let ws = TestWorkspace::new().expect("workspace");
        let oracle = ScriptedOracle::replying(&["while True: pass", "print(2)"]);
        let sandbox = ScriptedSandbox::new(vec![
            ExecutionOutcome::Timeout {
                after: Duration::from_secs(30),
            },
            success("2\n", 3),
        ]);

        let outcome = run_generation(
            &oracle,
            &sandbox,
            &request("loop", ws.candidate_path(), 2),
            |_| {},
        )
        .expect("run");

        assert!(outcome.success);
        assert!(oracle.prompts()[1].contains("too slow or hangs"));
    }

    #[test]
    fn oracle_outage_aborts_without_retry() {
        let ws = TestWorkspace::new().expect("workspace");
        let oracle = ScriptedOracle::new(vec![
            Ok("print(1/0)".to_string()),
            Err(OracleUnavailable::new("503 overloaded")),
            Ok("print(1)".to_string()),
        ]);
        let sandbox = ScriptedSandbox::new(vec![failure("boom"), success("", 1)]);

        let outcome = run_generation(
            &oracle,
            &sandbox,
            &request("task", ws.candidate_path(), 5),
            |_| {},
        )
        .expect("run");

        assert!(!outcome.success);
        assert!(matches!(outcome.stop, GenerationStop::OracleUnavailable { .. }));
        assert_eq!(oracle.calls(), 2);
        assert_eq!(outcome.attempts_used(), 1);
        assert_eq!(outcome.candidate, "print(1/0)");
        assert!(outcome.last_diagnostic().expect("diag").contains("503"));
    }

    #[test]
    fn noise_touches_only_the_first_attempt() {
        let ws = TestWorkspace::new().expect("workspace");
        let code = "def is_prime(n):\n    return n > 1\n\nassert is_prime(7)";
        let oracle = ScriptedOracle::replying(&[code, code]);
        let sandbox = ScriptedSandbox::new(vec![failure("SyntaxError"), success("", 2)]);

        let outcome = run_generation(
            &oracle,
            &sandbox,
            &GenerationRequest {
                noise_seed: Some(11),
                ..request("prime", ws.candidate_path(), 5)
            },
            |_| {},
        )
        .expect("run");

        assert!(outcome.success);
        assert!(outcome.attempts[0].noised);
        assert_ne!(outcome.attempts[0].candidate, code);
        assert!(!outcome.attempts[1].noised);
        assert_eq!(outcome.attempts[1].candidate, code);
    }

    #[test]
    fn zero_budget_makes_no_calls() {
        let ws = TestWorkspace::new().expect("workspace");
        let oracle = ScriptedOracle::replying(&["print(1)"]);
        let sandbox = ScriptedSandbox::new(vec![success("", 1)]);

        let outcome = run_generation(
            &oracle,
            &sandbox,
            &request("task", ws.candidate_path(), 0),
            |_| {},
        )
        .expect("run");

        assert!(!outcome.success);
        assert_eq!(outcome.stop, GenerationStop::Exhausted);
        assert_eq!(oracle.calls(), 0);
        assert!(outcome.attempts.is_empty());
    }
}
