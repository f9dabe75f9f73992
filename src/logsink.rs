//! Client log sink
//!
//! Validated records from `POST /api/log` are written as NDJSON, one record per
//! line. Nothing is stored or queried afterwards.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::model::LogRecord;

/// Destination for client log records
///
/// `emit` may block; the handler calls it from `spawn_blocking`.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: &LogRecord) -> io::Result<()>;
}

/// Serializes a record as a single JSON line (no trailing newline)
pub fn to_ndjson_line(record: &LogRecord) -> io::Result<String> {
    serde_json::to_string(record).map_err(io::Error::from)
}

/// Writes records to the process stdout
///
/// Tracing output goes to stderr, so stdout carries nothing but these lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn emit(&self, record: &LogRecord) -> io::Result<()> {
        let line = to_ndjson_line(record)?;
        let mut out = io::stdout().lock();
        writeln!(out, "{line}")?;
        out.flush()
    }
}

/// Keeps lines in memory, used by tests and local tooling
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: &LogRecord) -> io::Result<()> {
        let line = to_ndjson_line(record)?;
        self.lines
            .lock()
            .map_err(|_| io::Error::other("log sink lock poisoned"))?
            .push(line);
        Ok(())
    }
}
