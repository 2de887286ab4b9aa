//! Record sinks: console output and rotating file output.

mod file;

pub use file::RotatingFileSink;

use std::io::{self, Write};

use crate::domain::Record;

/// A destination for formatted records.
///
/// Implementations are thin writers. Routing, threshold checks, and
/// failure reporting all live in the logger's dispatch loop.
pub trait Sink: Send {
    fn emit(&mut self, record: &Record) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Formats one record into the line shape shared by every sink.
pub fn format_record(project: &str, record: &Record) -> String {
    let mut line = format!(
        "{},{:03} | {} | {} | {}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.timestamp.timestamp_subsec_millis(),
        project,
        record.severity,
        record.message
    );
    if let Some(detail) = &record.detail {
        line.push('\n');
        line.push_str(detail);
    }
    line
}

/// Stderr sink.
pub struct ConsoleSink {
    project: String,
}

impl ConsoleSink {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
        }
    }
}

impl Sink for ConsoleSink {
    fn emit(&mut self, record: &Record) -> io::Result<()> {
        let mut err = io::stderr().lock();
        writeln!(err, "{}", format_record(&self.project, record))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().lock().flush()
    }
}
