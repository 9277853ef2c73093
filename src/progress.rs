//! Progress reporting for long-running bulk commands.
//!
//! Bulk commands (`clerk copy-docs`, `clerk replace`, `clerk wipe`) report
//! what they are working on so users see how much is left. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The command is still collecting its work items. Total unknown.
    Scanning { task: String },
    /// Item `n` of `total` is being processed.
    Working {
        task: String,
        n: u64,
        total: u64,
        item: String,
    },
    /// The command finished all items.
    Finished { task: String, total: u64 },
}

impl ProgressEvent {
    /// Completion percentage for `Working` events.
    pub fn percent(&self) -> Option<u64> {
        match self {
            ProgressEvent::Working { n, total, .. } if *total > 0 => Some(n * 100 / total),
            _ => None,
        }
    }
}

/// Reports progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "copy-docs  12 / 40 (30%)  a/b.docx".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Scanning { task } => format!("{}  scanning...\n", task),
            ProgressEvent::Working {
                task,
                n,
                total,
                item,
            } => format!(
                "{}  {} / {} ({}%)  {}\n",
                task,
                format_number(*n),
                format_number(*total),
                event.percent().unwrap_or(0),
                item
            ),
            ProgressEvent::Finished { task, total } => {
                format!("{}  done, {} items\n", task, format_number(*total))
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Scanning { task } => serde_json::json!({
                "event": "progress",
                "task": task,
                "phase": "scanning"
            }),
            ProgressEvent::Working {
                task,
                n,
                total,
                item,
            } => serde_json::json!({
                "event": "progress",
                "task": task,
                "phase": "working",
                "n": n,
                "total": total,
                "item": item
            }),
            ProgressEvent::Finished { task, total } => serde_json::json!({
                "event": "progress",
                "task": task,
                "phase": "finished",
                "total": total
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

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
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
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
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

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
