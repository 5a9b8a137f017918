//! Prompt rendering for every oracle round trip.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::types::CandidateFailure;

const GENERATE_TEMPLATE: &str = include_str!("prompts/generate.md");
const REPAIR_TEMPLATE: &str = include_str!("prompts/repair.md");
const LINT_TEMPLATE: &str = include_str!("prompts/lint.md");
const OPTIMIZE_TEMPLATE: &str = include_str!("prompts/optimize.md");

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("generate", GENERATE_TEMPLATE)
            .expect("generate template should be valid");
        env.add_template("repair", REPAIR_TEMPLATE)
            .expect("repair template should be valid");
        env.add_template("lint", LINT_TEMPLATE)
            .expect("lint template should be valid");
        env.add_template("optimize", OPTIMIZE_TEMPLATE)
            .expect("optimize template should be valid");
        Self { env }
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let template = self.env.get_template(name)?;
        template
            .render(ctx)
            .with_context(|| format!("render {name} prompt"))
    }
}

static ENGINE: LazyLock<PromptEngine> = LazyLock::new(PromptEngine::new);

/// Initial request: the task plus the self-check requirement.
pub fn render_generate(task: &str) -> Result<String> {
    ENGINE.render("generate", context! { task => task.trim() })
}

/// Corrective follow-up carrying the previous candidate verbatim and its failure.
pub fn render_repair(task: &str, previous: &str, failure: &CandidateFailure) -> Result<String> {
    ENGINE.render(
        "repair",
        context! {
            task => task.trim(),
            previous => previous.trim_end(),
            failure => failure.diagnostic(),
            timed_out => failure.is_timeout(),
        },
    )
}

pub fn render_lint(candidate: &str, report: &str) -> Result<String> {
    ENGINE.render(
        "lint",
        context! {
            candidate => candidate.trim_end(),
            report => report.trim(),
        },
    )
}

pub fn render_optimize(candidate: &str) -> Result<String> {
    ENGINE.render("optimize", context! { candidate => candidate.trim_end() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn generate_prompt_includes_task_and_self_checks() {
        let prompt = render_generate("  check if a number is prime \n").expect("render");
        assert!(prompt.contains("check if a number is prime"));
        assert!(prompt.contains("assert"));
        assert!(prompt.contains("Output only the code"));
    }

    #[test]
    fn repair_prompt_carries_previous_code_and_failure() {
        let failure = CandidateFailure::ExecutionFailed {
            stderr: "AssertionError: is_prime(2)\n".to_string(),
        };
        let prompt =
            render_repair("prime check", "def is_prime(n):\n    return False\n", &failure)
                .expect("render");
        assert!(prompt.contains("prime check"));
        assert!(prompt.contains("def is_prime(n):\n    return False"));
        assert!(prompt.contains("AssertionError: is_prime(2)"));
        assert!(prompt.contains("Keep every embedded self-check"));
        assert!(!prompt.contains("too slow"));
    }

    #[test]
    fn repair_prompt_adds_timeout_hint() {
        let failure = CandidateFailure::TimedOut {
            after: Duration::from_secs(30),
        };
        let prompt = render_repair("sort", "while True: pass", &failure).expect("render");
        assert!(prompt.contains("timed out after 30s"));
        assert!(prompt.contains("too slow or hangs"));
    }

    #[test]
    fn lint_prompt_carries_report() {
        let prompt = render_lint("x = 1\n", "code.py:1:0: C0114: Missing module docstring")
            .expect("render");
        assert!(prompt.contains("x = 1"));
        assert!(prompt.contains("C0114"));
        assert!(prompt.contains("Preserve the program's behavior"));
    }

    #[test]
    fn optimize_prompt_preserves_checks() {
        let prompt = render_optimize("assert f(1) == 1\n").expect("render");
        assert!(prompt.contains("assert f(1) == 1"));
        assert!(prompt.contains("runs faster"));
    }
}
