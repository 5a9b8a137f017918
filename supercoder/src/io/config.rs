//! Configuration stored under `.supercoder/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::artifact::write_atomic;

/// Pipeline configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to the
/// values below; CLI flags override individual keys for a single run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SupercoderConfig {
    /// Generation-Repair attempt budget (number of sandbox executions).
    pub max_attempts: u32,

    /// Wall-clock bound for each sandbox execution, in seconds.
    pub exec_timeout_secs: u64,

    /// Lint-Repair escalation budget.
    pub lint_max_attempts: u32,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Run the Optimization Comparator after a successful generation.
    pub optimize: bool,

    /// Run the Lint-Repair Loop on the winning candidate.
    pub lint: bool,

    /// Corrupt the first generated candidate with this seed.
    pub noise_seed: Option<u64>,

    /// Where the candidate artifact is written.
    pub output_path: PathBuf,

    pub oracle: OracleConfig,
    pub sandbox: SandboxConfig,
    pub linter: LinterConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OracleBackend {
    /// Chat-completions HTTP API.
    #[serde(rename = "openai")]
    OpenAi,
    /// External command reading the prompt on stdin.
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OracleConfig {
    pub backend: OracleBackend,
    pub model: String,
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Argv for the `command` backend (e.g. `["llm", "-m", "gpt-4o-mini"]`).
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SandboxConfig {
    /// Interpreter argv; the candidate path is appended.
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LinterConfig {
    /// Linter argv; the candidate path is appended.
    pub command: Vec<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            backend: OracleBackend::OpenAi,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 120,
            command: Vec::new(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            command: vec!["python3".to_string()],
        }
    }
}

impl Default for LinterConfig {
    fn default() -> Self {
        Self {
            command: vec!["pylint".to_string()],
        }
    }
}

impl Default for SupercoderConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            exec_timeout_secs: 30,
            lint_max_attempts: 3,
            output_limit_bytes: 100_000,
            optimize: true,
            lint: true,
            noise_seed: None,
            output_path: PathBuf::from("generated_code.py"),
            oracle: OracleConfig::default(),
            sandbox: SandboxConfig::default(),
            linter: LinterConfig::default(),
        }
    }
}

impl SupercoderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be > 0"));
        }
        if self.lint_max_attempts == 0 {
            return Err(anyhow!("lint_max_attempts must be > 0"));
        }
        if self.exec_timeout_secs == 0 {
            return Err(anyhow!("exec_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(anyhow!("oracle.timeout_secs must be > 0"));
        }
        if !is_valid_argv(&self.sandbox.command) {
            return Err(anyhow!("sandbox.command must be a non-empty array"));
        }
        if !is_valid_argv(&self.linter.command) {
            return Err(anyhow!("linter.command must be a non-empty array"));
        }
        if self.oracle.backend == OracleBackend::Command && !is_valid_argv(&self.oracle.command) {
            return Err(anyhow!(
                "oracle.command must be a non-empty array when backend = \"command\""
            ));
        }
        Ok(())
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }
}

fn is_valid_argv(argv: &[String]) -> bool {
    argv.first().is_some_and(|program| !program.trim().is_empty())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SupercoderConfig::default()`.
pub fn load_config(path: &Path) -> Result<SupercoderConfig> {
    if !path.exists() {
        let cfg = SupercoderConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SupercoderConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SupercoderConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, SupercoderConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".supercoder/config.toml");
        let cfg = SupercoderConfig {
            noise_seed: Some(9),
            ..SupercoderConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "max_attempts = 2\n\n[oracle]\nbackend = \"command\"\ncommand = [\"llm\"]\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_attempts, 2);
        assert_eq!(cfg.exec_timeout_secs, 30);
        assert_eq!(cfg.oracle.backend, OracleBackend::Command);
        assert_eq!(cfg.oracle.model, "gpt-4o-mini");
        assert_eq!(cfg.sandbox.command, vec!["python3"]);
    }

    #[test]
    fn rejects_zero_attempts() {
        let cfg = SupercoderConfig {
            max_attempts: 0,
            ..SupercoderConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn command_backend_requires_command() {
        let mut cfg = SupercoderConfig::default();
        cfg.oracle.backend = OracleBackend::Command;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("oracle.command"));
    }
}
