//! Bounded operator log, newest entry first.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Entries beyond this are dropped from the tail.
pub const EVENT_LOG_CAPACITY: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub severity: Severity,
    pub text: String,
}

impl LogEntry {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            severity,
            text: text.into(),
        }
    }
}

#[derive(Debug)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        match entry.severity {
            Severity::Danger => log::warn!("{}", entry.text),
            Severity::Warning | Severity::Info => log::info!("{}", entry.text),
        }
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn record(&mut self, severity: Severity, text: impl Into<String>) {
        self.push(LogEntry::new(severity, text));
    }

    /// Newest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
