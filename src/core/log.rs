//! Build event log — the ambient logging stack for the engine.
//!
//! Every recoverable condition is reported here instead of via
//! `Result::Err`: one line of colored, human-readable text on stderr, and
//! one JSON line appended to `<project>/fashion/build.events.jsonl`.
//! Generalizes a DB-mutation audit trail into a build-event audit trail.

use crate::core::time;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Warn,
    Error,
    Debug,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildEvent {
    pub ts: String,
    pub event_id: String,
    pub level: Level,
    /// Error-taxonomy kind, e.g. "UndeclaredAccess", "CycleDetected".
    pub kind: String,
    pub message: String,
}

/// Appends build events to a JSONL file and mirrors warn/error to stderr.
pub struct BuildLog {
    path: PathBuf,
    verbose: bool,
}

impl BuildLog {
    pub fn new(project_fashion_dir: &Path, verbose: bool) -> Self {
        Self { path: project_fashion_dir.join("build.events.jsonl"), verbose }
    }

    fn record(&self, level: Level, kind: &str, message: &str) {
        let event = BuildEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            level,
            kind: kind.to_string(),
            message: message.to_string(),
        };
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            if let Ok(line) = serde_json::to_string(&event) {
                let _ = writeln!(f, "{}", line);
            }
        }
        match level {
            Level::Warn => eprintln!("{} {}: {}", "warn".yellow().bold(), kind, message),
            Level::Error => eprintln!("{} {}: {}", "error".red().bold(), kind, message),
            Level::Debug => {
                if self.verbose {
                    eprintln!("{} {}: {}", "debug".dimmed(), kind, message);
                }
            }
        }
    }

    pub fn warn(&self, kind: &str, message: impl AsRef<str>) {
        self.record(Level::Warn, kind, message.as_ref());
    }

    pub fn error(&self, kind: &str, message: impl AsRef<str>) {
        self.record(Level::Error, kind, message.as_ref());
    }

    pub fn debug(&self, kind: &str, message: impl AsRef<str>) {
        self.record(Level::Debug, kind, message.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warn_appends_jsonl_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = BuildLog::new(dir.path(), false);
        log.warn("TargetModified", "Skipping out/g.txt");
        let contents = std::fs::read_to_string(dir.path().join("build.events.jsonl")).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("TargetModified"));
    }
}
