//! Append-only error log under `~/.gam-cli/errors.log`
//!
//! Every fatal path funnels through here before the process exits; the log
//! is never rotated or truncated by this tool.

use std::io::Write;
use std::path::PathBuf;

use crate::config::config_dir;

/// Fixed error log location (`~/.gam-cli/errors.log`)
pub fn log_path() -> Option<PathBuf> {
    config_dir().ok().map(|d| d.join("errors.log"))
}

/// Append one `[<ISO timestamp>] [<context>] <message>` line.
///
/// Best effort: logging must never turn a reportable error into a panic or
/// a second error, so I/O failures here are swallowed.
pub fn log_error(context: &str, message: &str) {
    let Some(path) = log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let timestamp = chrono::Local::now().to_rfc3339();
    let entry = format!("[{}] [{}] {}\n", timestamp, context, message);

    if let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    {
        let _ = file.write_all(entry.as_bytes());
    }
}
