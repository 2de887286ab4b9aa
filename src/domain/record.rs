use chrono::{DateTime, Local};

use super::severity::Severity;

/// A single log event flowing through the dispatch pipeline.
///
/// The routing flags are independent of each other: `uncaught_exception`
/// marks records produced by the process-wide exception hook, `no_email`
/// suppresses the escalation channel for an otherwise eligible record.
/// Nothing in the pipeline couples them.
#[derive(Debug, Clone)]
pub struct Record {
    pub severity: Severity,
    pub message: String,
    /// Rendered exception information appended below the formatted line.
    pub detail: Option<String>,
    pub uncaught_exception: bool,
    pub no_email: bool,
    /// Echo the bare message to stdout when the console sink's
    /// threshold would hide it.
    pub echo: bool,
    pub timestamp: DateTime<Local>,
}

impl Record {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            detail: None,
            uncaught_exception: false,
            no_email: false,
            echo: false,
            timestamp: Local::now(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn mark_uncaught(mut self) -> Self {
        self.uncaught_exception = true;
        self
    }

    pub fn suppress_email(mut self) -> Self {
        self.no_email = true;
        self
    }

    pub fn echoed(mut self) -> Self {
        self.echo = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_no_flags_set() {
        let record = Record::new(Severity::Info, "hello");
        assert!(!record.uncaught_exception);
        assert!(!record.no_email);
        assert!(!record.echo);
        assert!(record.detail.is_none());
    }

    #[test]
    fn test_flags_are_independently_settable() {
        let uncaught = Record::new(Severity::Error, "boom").mark_uncaught();
        assert!(uncaught.uncaught_exception);
        assert!(!uncaught.no_email);

        let muted = Record::new(Severity::Error, "boom").suppress_email();
        assert!(!muted.uncaught_exception);
        assert!(muted.no_email);

        let both = Record::new(Severity::Error, "boom")
            .mark_uncaught()
            .suppress_email();
        assert!(both.uncaught_exception);
        assert!(both.no_email);
    }

    #[test]
    fn test_detail_is_attached() {
        let record = Record::new(Severity::Error, "boom").with_detail("at src/main.rs:3");
        assert_eq!(record.detail.as_deref(), Some("at src/main.rs:3"));
    }
}
