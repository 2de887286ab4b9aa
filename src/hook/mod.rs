//! Process-wide uncaught-exception handling.
//!
//! [`UncaughtExceptionHook`] wraps a configured [`ProjectLogger`] and
//! registers itself as the panic hook. When a panic escapes, it writes
//! a best-effort fallback file, lets the previous hook print the usual
//! traceback, logs through the uncaught-exception route (bracketed by
//! the escalation gate on the email variant), tells the operator where
//! the log landed, blocks for acknowledgment, and exits with the fixed
//! failure code.

use std::fs;
use std::io::{self, Write};
use std::panic::{self, PanicHookInfo};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::Duration;

use chrono::Local;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::warn;

use crate::domain::{Record, SetupError, Severity};
use crate::logger::{Dispatch, ProjectLogger};

/// Exit code used on every path out of the hook.
pub const FAILURE_EXIT_CODE: i32 = -1;

/// Fallback file written before the regular sinks are trusted.
pub const FALLBACK_LOG_NAME: &str = "unhandled_exception.log";

const ACK_PROMPT: &str = "Press enter to exit.";
const ACK_FALLBACK_WAIT: Duration = Duration::from_secs(3);

/// Panic payload marking a failure inside log-infrastructure
/// preparation.
///
/// Hosts raise it with `std::panic::panic_any` when logger setup
/// fails; the installed hook recognizes it by downcast and exits
/// immediately instead of logging through sinks it cannot trust.
#[derive(Error, Debug)]
#[error("log infrastructure preparation failed: {reason}")]
pub struct LogInfrastructureFailure {
    pub reason: String,
}

impl LogInfrastructureFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<SetupError> for LogInfrastructureFailure {
    fn from(err: SetupError) -> Self {
        Self {
            reason: err.to_string(),
        }
    }
}

/// What the hook knows about one uncaught exception.
#[derive(Debug, Clone)]
pub struct ExceptionEvent {
    pub summary: String,
    pub location: Option<String>,
    infrastructure_failure: bool,
}

impl ExceptionEvent {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            location: None,
            infrastructure_failure: false,
        }
    }

    pub fn infrastructure(summary: impl Into<String>) -> Self {
        Self {
            infrastructure_failure: true,
            ..Self::new(summary)
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_infrastructure_failure(&self) -> bool {
        self.infrastructure_failure
    }

    /// Captures a panic's payload and location.
    pub fn from_panic_info(info: &PanicHookInfo<'_>) -> Self {
        let payload = info.payload();
        let mut event =
            if let Some(failure) = payload.downcast_ref::<LogInfrastructureFailure>() {
                Self::infrastructure(failure.to_string())
            } else if let Some(message) = payload.downcast_ref::<&str>() {
                Self::new(*message)
            } else if let Some(message) = payload.downcast_ref::<String>() {
                Self::new(message.clone())
            } else {
                Self::new("Box<dyn Any>")
            };
        if let Some(location) = info.location() {
            event = event.at(location.to_string());
        }
        event
    }

    /// Traceback-shaped text used as the logged record's detail.
    pub fn render(&self) -> String {
        match &self.location {
            Some(location) => format!("panicked at {location}:\n{}", self.summary),
            None => self.summary.clone(),
        }
    }
}

/// Blocks until the operator has seen the failure.
pub trait Acknowledger: Send {
    fn acknowledge(&mut self);
}

/// Reads one line from stdin. Without usable interactive input (EOF or
/// a read error) it falls back to a bounded wait instead of blocking
/// forever.
pub struct EnterKeyAck;

impl Acknowledger for EnterKeyAck {
    fn acknowledge(&mut self) {
        print!("{ACK_PROMPT}");
        let _ = io::stdout().flush();
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(n) if n > 0 => {}
            _ => {
                println!("Exiting in {} seconds...", ACK_FALLBACK_WAIT.as_secs());
                thread::sleep(ACK_FALLBACK_WAIT);
            }
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HookError {
    #[error("configured logger has no email capability")]
    MissingEmailCapability,
}

/// The uncaught-exception handler. Build it over a configured logger,
/// then [`install`](Self::install) it for the rest of the process
/// lifetime.
pub struct UncaughtExceptionHook {
    logger: ProjectLogger,
    fallback_log: PathBuf,
    escalate_by_email: bool,
    acknowledger: Box<dyn Acknowledger>,
}

impl UncaughtExceptionHook {
    pub fn new(logger: ProjectLogger) -> Self {
        Self {
            logger,
            fallback_log: PathBuf::from(FALLBACK_LOG_NAME),
            escalate_by_email: false,
            acknowledger: Box::new(EnterKeyAck),
        }
    }

    /// Email variant: every uncaught exception is also escalated, with
    /// the envelope refreshed before and after the log call. The
    /// logger must carry the email capability.
    pub fn with_email(logger: ProjectLogger) -> Result<Self, HookError> {
        if !logger.has_email_capability() {
            return Err(HookError::MissingEmailCapability);
        }
        let mut hook = Self::new(logger);
        hook.escalate_by_email = true;
        Ok(hook)
    }

    pub fn fallback_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.fallback_log = path.into();
        self
    }

    pub fn acknowledger(mut self, acknowledger: Box<dyn Acknowledger>) -> Self {
        self.acknowledger = acknowledger;
        self
    }

    /// Registers the hook process-wide. The previously installed hook
    /// keeps printing the default traceback; afterwards the handling
    /// sequence runs and the process exits with [`FAILURE_EXIT_CODE`].
    pub fn install(self) {
        let previous = panic::take_hook();
        let state = Mutex::new(self);
        panic::set_hook(Box::new(move |info| {
            let event = ExceptionEvent::from_panic_info(info);
            let code = state.lock().run(&event, || previous(info));
            process::exit(code);
        }));
    }

    /// Runs the handling sequence and returns the exit code. Split
    /// from [`install`](Self::install) so the sequence can run without
    /// ending the process.
    pub fn run(&mut self, event: &ExceptionEvent, default_print: impl FnOnce()) -> i32 {
        if event.is_infrastructure_failure() {
            return FAILURE_EXIT_CODE;
        }

        self.write_fallback_log(event);
        default_print();
        self.log_uncaught(event);
        println!("{}", banner(&self.fallback_log));
        self.acknowledger.acknowledge();
        FAILURE_EXIT_CODE
    }

    fn log_uncaught(&mut self, event: &ExceptionEvent) {
        let record = Record::new(Severity::Error, "Uncaught exception")
            .with_detail(event.render())
            .mark_uncaught();

        if self.escalate_by_email {
            self.logger.prepare_fresh_envelope();
            self.logger.log_record(record);
            self.logger.prepare_fresh_envelope();
        } else {
            self.logger.log_record(record);
        }
    }

    /// Best-effort write that does not depend on the configured sinks.
    /// Any prior file is removed so the file only ever holds the
    /// current exception.
    fn write_fallback_log(&self, event: &ExceptionEvent) {
        if let Err(e) = self.try_write_fallback_log(event) {
            println!("could not log unhandled exception to file due to error.");
            warn!("fallback log write failed: {e}");
        }
    }

    fn try_write_fallback_log(&self, event: &ExceptionEvent) -> io::Result<()> {
        if self.fallback_log.is_file() {
            fs::remove_file(&self.fallback_log)?;
        }
        let body = format!(
            "{} ERROR Uncaught exception\n{}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            event.render()
        );
        fs::write(&self.fallback_log, body)
    }
}

fn banner(fallback_log: &Path) -> String {
    format!(
        "\n********\n if exception could be logged, it is logged in '{}' even if it does not appear in other log files \n********\n",
        fallback_log.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LoggerBuilder;
    use crate::sink::Sink;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use tempfile::TempDir;

    struct RecordingSink {
        seen: Arc<StdMutex<Vec<Record>>>,
    }

    impl Sink for RecordingSink {
        fn emit(&mut self, record: &Record) -> io::Result<()> {
            self.seen.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct CountingAck(Arc<AtomicUsize>);

    impl Acknowledger for CountingAck {
        fn acknowledge(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn hook_over_recorder(
        dir: &TempDir,
    ) -> (UncaughtExceptionHook, Arc<StdMutex<Vec<Record>>>, Arc<AtomicUsize>) {
        let mut logger = LoggerBuilder::exception_only("app")
            .root(dir.path().join("logs"))
            .build()
            .unwrap();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        logger.attach_sink(Severity::Debug, Box::new(RecordingSink { seen: seen.clone() }));

        let acks = Arc::new(AtomicUsize::new(0));
        let hook = UncaughtExceptionHook::new(logger)
            .fallback_log(dir.path().join(FALLBACK_LOG_NAME))
            .acknowledger(Box::new(CountingAck(acks.clone())));
        (hook, seen, acks)
    }

    #[test]
    fn test_event_render_includes_location() {
        let event = ExceptionEvent::new("boom").at("src/main.rs:10:5");
        let rendered = event.render();
        assert!(rendered.contains("panicked at src/main.rs:10:5"));
        assert!(rendered.contains("boom"));

        assert_eq!(ExceptionEvent::new("bare").render(), "bare");
    }

    #[test]
    fn test_infrastructure_event_exits_without_logging() {
        let dir = TempDir::new().unwrap();
        let (mut hook, seen, acks) = hook_over_recorder(&dir);
        let printed = Cell::new(false);

        let code = hook.run(&ExceptionEvent::infrastructure("sink open failed"), || {
            printed.set(true);
        });

        assert_eq!(code, FAILURE_EXIT_CODE);
        assert!(!printed.get());
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(acks.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join(FALLBACK_LOG_NAME).exists());
    }

    #[test]
    fn test_run_logs_prints_and_acknowledges() {
        let dir = TempDir::new().unwrap();
        let (mut hook, seen, acks) = hook_over_recorder(&dir);
        let printed = Cell::new(false);

        let event = ExceptionEvent::new("index out of bounds").at("src/lib.rs:42:1");
        let code = hook.run(&event, || printed.set(true));

        assert_eq!(code, FAILURE_EXIT_CODE);
        assert!(printed.get());
        assert_eq!(acks.load(Ordering::SeqCst), 1);

        let records = seen.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "Uncaught exception");
        assert!(records[0].uncaught_exception);
        let detail = records[0].detail.as_deref().unwrap();
        assert!(detail.contains("index out of bounds"));
        assert!(detail.contains("src/lib.rs:42:1"));

        let fallback = fs::read_to_string(dir.path().join(FALLBACK_LOG_NAME)).unwrap();
        assert!(fallback.contains("ERROR Uncaught exception"));
        assert!(fallback.contains("index out of bounds"));
    }

    #[test]
    fn test_fallback_file_is_rewritten_fresh() {
        let dir = TempDir::new().unwrap();
        let (mut hook, _seen, _acks) = hook_over_recorder(&dir);

        hook.run(&ExceptionEvent::new("first"), || {});
        hook.run(&ExceptionEvent::new("second"), || {});

        let fallback = fs::read_to_string(dir.path().join(FALLBACK_LOG_NAME)).unwrap();
        assert!(fallback.contains("second"));
        assert!(!fallback.contains("first"));
    }

    #[test]
    fn test_with_email_requires_capability() {
        let dir = TempDir::new().unwrap();
        let logger = LoggerBuilder::exception_only("app")
            .root(dir.path().join("logs"))
            .build()
            .unwrap();

        assert!(matches!(
            UncaughtExceptionHook::with_email(logger),
            Err(HookError::MissingEmailCapability)
        ));
    }
}
