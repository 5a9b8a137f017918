//! Open the finished artifact for the user.

use std::path::Path;
use std::process::Command;

use tracing::{info, warn};

/// Resolve the argv used to open a file.
///
/// `$VISUAL` wins over `$EDITOR`; without either, the platform opener is used.
pub fn opener_argv(visual: Option<&str>, editor: Option<&str>, os: &str) -> Vec<String> {
    let configured = [visual, editor]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty());
    if let Some(value) = configured {
        return value.split_whitespace().map(str::to_string).collect();
    }
    match os {
        "macos" => vec!["open".to_string()],
        "windows" => vec![
            "cmd".to_string(),
            "/C".to_string(),
            "start".to_string(),
            String::new(),
        ],
        _ => vec!["xdg-open".to_string()],
    }
}

/// Launch an editor on `path`. Failures are logged, never returned.
pub fn open_in_editor(path: &Path) {
    let visual = std::env::var("VISUAL").ok();
    let editor = std::env::var("EDITOR").ok();
    let argv = opener_argv(visual.as_deref(), editor.as_deref(), std::env::consts::OS);
    let Some((program, args)) = argv.split_first() else {
        return;
    };

    info!(%program, path = %path.display(), "opening artifact");
    match Command::new(program).args(args).arg(path).status() {
        Ok(status) if status.success() => {}
        Ok(status) => warn!(%program, exit_code = ?status.code(), "editor exited with failure"),
        Err(err) => warn!(%program, err = %err, "failed to launch editor"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visual_takes_precedence() {
        let argv = opener_argv(Some("code --wait"), Some("vim"), "linux");
        assert_eq!(argv, vec!["code", "--wait"]);
    }

    #[test]
    fn blank_visual_falls_back_to_editor() {
        let argv = opener_argv(Some("  "), Some("nano"), "linux");
        assert_eq!(argv, vec!["nano"]);
    }

    #[test]
    fn platform_openers() {
        assert_eq!(opener_argv(None, None, "macos"), vec!["open"]);
        assert_eq!(opener_argv(None, None, "linux"), vec!["xdg-open"]);
        assert_eq!(opener_argv(None, None, "windows")[..3], ["cmd", "/C", "start"]);
    }
}
