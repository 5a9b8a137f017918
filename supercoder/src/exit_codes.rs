//! Stable exit codes for supercoder CLI commands.

/// Command succeeded; for `run`, the final candidate passed its self-checks.
pub const OK: i32 = 0;
/// Command failed due to invalid config, arguments, or an infrastructure error.
pub const INVALID: i32 = 1;
/// `supercoder run` finished without a passing candidate (budget spent or oracle unavailable).
pub const GENERATION_FAILED: i32 = 2;
