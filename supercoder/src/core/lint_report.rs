//! Parsing of static-analysis reports into a [`LintOutcome`].

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::LintOutcome;

/// `path:line:col: C0114: message (symbol)`
static FINDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^.+?:\d+:\d+: [A-Z]\d{4}: ").expect("finding regex should be valid")
});

static SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"rated at (-?\d+(?:\.\d+)?)/10").expect("score regex should be valid")
});

const PERFECT_SCORE: f64 = 10.0;

/// Parse a linter report.
///
/// The report is clean only when it lists no findings and states a perfect
/// score. A report without a score (e.g. the tool crashed) is never clean.
pub fn parse_lint_report(report: &str) -> LintOutcome {
    let findings = FINDING_RE.find_iter(report).count();
    let score = SCORE_RE
        .captures_iter(report)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok());
    let is_clean = findings == 0 && score.is_some_and(|s| s >= PERFECT_SCORE);
    LintOutcome {
        report: report.to_string(),
        findings,
        score,
        is_clean,
    }
}
