//! Generate, execute, validate and repair source code with an LLM oracle.
//!
//! A task description goes through three stages, each a bounded loop that
//! reports its result as a value rather than an error:
//!
//! - [`generate`]: generation-repair until the candidate runs with its self-checks.
//! - [`optimize`]: one-shot comparison against a faster variant.
//! - [`lint_loop`]: static-analysis repair, best effort.
//!
//! The crate keeps the usual split:
//!
//! - **[`core`]**: Pure, deterministic logic (extraction, normalization, budgets).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting adapters (oracle, sandbox, linter, files).
//!   Behind traits so tests can script them.
//!
//! [`pipeline`] composes the stages for the CLI.

pub mod core;
pub mod exit_codes;
pub mod generate;
pub mod io;
pub mod lint_loop;
pub mod logging;
pub mod optimize;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
