//! Persisted artifacts: the candidate source, the lint log and the run summary.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

pub const STATE_DIR: &str = ".supercoder";

/// Stable locations of every artifact a run may produce.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    /// The single live candidate; overwritten on every attempt.
    pub candidate_path: PathBuf,
    /// Unresolved lint findings, written only when the lint loop gives up.
    pub lint_log_path: PathBuf,
    pub summary_path: PathBuf,
}

impl ArtifactPaths {
    /// `output_path` is resolved against `root` unless it is absolute.
    pub fn new(root: &Path, output_path: &Path) -> Self {
        let state_dir = root.join(STATE_DIR);
        Self {
            candidate_path: root.join(output_path),
            lint_log_path: state_dir.join("lint_report.log"),
            summary_path: state_dir.join("summary.json"),
        }
    }
}

/// Config location used when `--config` is not given.
pub fn default_config_path(root: &Path) -> PathBuf {
    root.join(STATE_DIR).join("config.toml")
}

/// Fully replace the candidate file with `source`, ending in exactly one newline.
pub fn write_candidate(path: &Path, source: &str) -> Result<()> {
    let mut buf = source.trim_end_matches(['\n', '\r']).to_string();
    buf.push('\n');
    debug!(path = %path.display(), bytes = buf.len(), "writing candidate");
    write_atomic(path, &buf)
}

pub fn write_lint_log(path: &Path, report: &str) -> Result<()> {
    debug!(path = %path.display(), "writing lint log");
    write_atomic(path, report)
}

pub fn write_summary<T: Serialize>(path: &Path, summary: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(summary).context("serialize run summary")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Replace `path` with `contents` via a sibling temp file and a rename.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("artifact"));
    name.push(".tmp");
    path.with_file_name(name)
}
