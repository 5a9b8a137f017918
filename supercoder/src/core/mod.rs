//! Deterministic, pure logic shared by the repair loops.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod budget;
pub mod extract;
pub mod lint_report;
pub mod noise;
pub mod normalize;
pub mod types;
