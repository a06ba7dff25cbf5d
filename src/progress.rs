//! Build progress reporting.
//!
//! Reports observable progress during `mds build` so users see how many
//! pages have been crawled, how many classes have been found and how much
//! work is queued. Progress is emitted on **stderr** so stdout remains
//! parseable for scripts.

use std::io::Write;

/// A single progress event emitted by the tree builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildProgressEvent {
    /// A listing page was fetched and its entries registered.
    Fetched {
        path: String,
        /// Nodes created from this page.
        created: usize,
        /// Total nodes registered so far.
        total: usize,
        /// Paths queued or in flight.
        pending: usize,
    },
    /// A listing page could not be fetched; its subtree is skipped.
    Failed { path: String },
}

/// Reports build progress. Implementations write to stderr (human or JSON).
pub trait BuildProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the builder's coordinating task.
    fn report(&self, event: BuildProgressEvent);
}

/// Human-friendly progress on stderr: "crawl 636  +12  1,234 nodes  57 pending".
pub struct StderrProgress;

impl BuildProgressReporter for StderrProgress {
    fn report(&self, event: BuildProgressEvent) {
        let line = match &event {
            BuildProgressEvent::Fetched {
                path,
                created,
                total,
                pending,
            } => format!(
                "crawl {}  +{}  {} nodes  {} pending\n",
                display_path(path),
                created,
                format_number(*total as u64),
                format_number(*pending as u64)
            ),
            BuildProgressEvent::Failed { path } => {
                format!("crawl {}  failed\n", display_path(path))
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl BuildProgressReporter for JsonProgress {
    fn report(&self, event: BuildProgressEvent) {
        let obj = match &event {
            BuildProgressEvent::Fetched {
                path,
                created,
                total,
                pending,
            } => serde_json::json!({
                "event": "progress",
                "phase": "fetched",
                "path": path,
                "created": created,
                "total": total,
                "pending": pending
            }),
            BuildProgressEvent::Failed { path } => serde_json::json!({
                "event": "progress",
                "phase": "failed",
                "path": path
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl BuildProgressReporter for NoProgress {
    fn report(&self, _event: BuildProgressEvent) {}
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "(root)"
    } else {
        path
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse a `--progress` flag value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    /// Build a reporter for this mode. Caller passes it to the builder.
    pub fn reporter(&self) -> Box<dyn BuildProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn parse_progress_mode() {
        assert_eq!(ProgressMode::parse("json"), Some(ProgressMode::Json));
        assert_eq!(ProgressMode::parse("human"), Some(ProgressMode::Human));
        assert_eq!(ProgressMode::parse("off"), Some(ProgressMode::Off));
        assert_eq!(ProgressMode::parse("loud"), None);
    }

    #[test]
    fn root_path_display() {
        assert_eq!(display_path(""), "(root)");
        assert_eq!(display_path("636"), "636");
    }
}
