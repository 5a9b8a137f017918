//! Side-effecting adapters used by the repair loops and the CLI.

pub mod artifact;
pub mod config;
pub mod console;
pub mod editor;
pub mod linter;
pub mod oracle;
pub mod process;
pub mod prompt;
pub mod sandbox;
