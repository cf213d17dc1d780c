//! JSONL log of resize events.
//!
//! Each line is one event tagged with the scheduler label and the time since
//! the log was opened. Handy for inspecting how a burst of UI changes was
//! coalesced.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sigscope_types::ResizeEvent;

#[derive(Debug, Serialize, Deserialize)]
pub struct EventLogEntry<T> {
    pub t_ms: u64,
    pub source: String,
    pub event: ResizeEvent<T>,
}

#[derive(Serialize)]
struct EntryRef<'a, T> {
    t_ms: u64,
    source: &'a str,
    event: &'a ResizeEvent<T>,
}

pub struct EventLog {
    writer: BufWriter<File>,
    opened: Instant,
}

impl EventLog {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            opened: Instant::now(),
        })
    }

    pub fn record<T: Serialize>(&mut self, source: &str, event: &ResizeEvent<T>) {
        let entry = EntryRef {
            t_ms: self.opened.elapsed().as_millis() as u64,
            source,
            event,
        };
        match serde_json::to_string(&entry) {
            Ok(json) => {
                if let Err(e) = writeln!(self.writer, "{}", json).and_then(|_| self.writer.flush()) {
                    log::warn!(target: "event_log", "write failed: {}", e);
                }
            }
            Err(e) => log::warn!(target: "event_log", "serialize failed: {}", e),
        }
    }
}

/// Error type for reading an event log back.
#[derive(Debug)]
pub enum EventLogError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl From<std::io::Error> for EventLogError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for EventLogError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl std::fmt::Display for EventLogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for EventLogError {}

/// Read back every entry of a log whose events carry targets of type `T`.
pub fn read_event_log<T>(path: &Path) -> Result<Vec<EventLogEntry<T>>, EventLogError>
where
    T: for<'de> Deserialize<'de>,
{
    let file = File::open(path)?;
    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(&line)?);
    }
    Ok(entries)
}
