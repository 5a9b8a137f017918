//! Oracle abstraction for code generation.
//!
//! The [`Oracle`] trait decouples the repair loops from the generation
//! backend. The binary constructs one adapter and passes it by reference into
//! every loop; tests use scripted oracles that return predetermined responses.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::io::config::{OracleBackend, OracleConfig};
use crate::io::process::run_command_with_timeout;

/// The oracle could not produce a response (transport, service or protocol fault).
///
/// Loops never retry this: it ends the current loop immediately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("oracle unavailable: {reason}")]
pub struct OracleUnavailable {
    pub reason: String,
}

impl OracleUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Abstraction over text-generation backends.
pub trait Oracle {
    /// Return the raw response text for `prompt`.
    fn generate(&self, prompt: &str) -> Result<String, OracleUnavailable>;
}

/// Build the oracle adapter selected by configuration.
pub fn build_oracle(cfg: &OracleConfig, output_limit_bytes: usize) -> Result<Box<dyn Oracle>> {
    match cfg.backend {
        OracleBackend::OpenAi => Ok(Box::new(OpenAiOracle::from_config(cfg)?)),
        OracleBackend::Command => Ok(Box::new(CommandOracle::new(
            cfg.command.clone(),
            Duration::from_secs(cfg.timeout_secs),
            output_limit_bytes,
        )?)),
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Oracle backed by a chat-completions HTTP endpoint.
pub struct OpenAiOracle {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiOracle {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build from config, reading the API key from `cfg.api_key_env`.
    pub fn from_config(cfg: &OracleConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("missing API key: set {}", cfg.api_key_env))?;
        Self::new(
            api_key,
            cfg.model.clone(),
            cfg.base_url.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }
}

impl Oracle for OpenAiOracle {
    #[instrument(skip_all, fields(model = %self.model, prompt_bytes = prompt.len()))]
    fn generate(&self, prompt: &str) -> Result<String, OracleUnavailable> {
        info!("requesting completion");
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| {
                warn!(err = %e, "completion request failed");
                OracleUnavailable::new(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(%status, "completion request rejected");
            return Err(OracleUnavailable::new(format!(
                "service returned {status}: {}",
                body.trim()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| OracleUnavailable::new(format!("unparsable response: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| OracleUnavailable::new("response contained no completion"))?;

        debug!(response_bytes = content.len(), "completion received");
        Ok(content)
    }
}

/// Oracle backed by an external command that reads the prompt on stdin and
/// prints the completion on stdout.
pub struct CommandOracle {
    argv: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandOracle {
    pub fn new(argv: Vec<String>, timeout: Duration, output_limit_bytes: usize) -> Result<Self> {
        if argv.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(anyhow!("oracle command must be non-empty"));
        }
        Ok(Self {
            argv,
            timeout,
            output_limit_bytes,
        })
    }
}

impl Oracle for CommandOracle {
    #[instrument(skip_all, fields(program = %self.argv[0], prompt_bytes = prompt.len()))]
    fn generate(&self, prompt: &str) -> Result<String, OracleUnavailable> {
        let mut cmd = Command::new(&self.argv[0]);
        cmd.args(&self.argv[1..]);

        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )
        .map_err(|e| OracleUnavailable::new(format!("{e:#}")))?;

        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "oracle command timed out");
            return Err(OracleUnavailable::new(format!(
                "oracle command timed out after {:?}",
                self.timeout
            )));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "oracle command failed");
            return Err(OracleUnavailable::new(format!(
                "oracle command exited with {:?}: {}",
                output.status.code(),
                output.stderr_text().trim()
            )));
        }
        if output.stdin_incomplete {
            warn!("oracle command exited before reading the whole prompt");
            return Err(OracleUnavailable::new(
                "oracle command exited before reading the whole prompt",
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
