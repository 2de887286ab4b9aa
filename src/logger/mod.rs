//! Logger construction and dispatch.
//!
//! [`LoggerBuilder`] resolves the rotation spec, provisions the file
//! layout, and assembles a [`ProjectLogger`]. All logging goes through
//! the sealed [`Dispatch`] trait; per-severity methods do not exist on
//! the public surface.

use std::path::PathBuf;

use tracing::warn;

use crate::domain::{Record, SetupError, Severity};
use crate::escalate::{Archiver, EmailEscalation, EmailSettings, Emailer, TarGzArchiver};
use crate::filter::{CaughtExceptionFilter, NoEmailFilter, RecordFilter, UncaughtExceptionFilter};
use crate::provision::{FileSinkDescriptor, SinkLayout};
use crate::rotation::{RotationSource, RotationSpec};
use crate::sink::{ConsoleSink, RotatingFileSink, Sink};

/// Records at or above this severity are forwarded by email when the
/// capability is attached.
pub const ESCALATION_THRESHOLD: Severity = Severity::Error;

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::ProjectLogger {}
}

/// The one public logging surface. Callers always pass the severity;
/// the trait is sealed so no other dispatch path can appear.
pub trait Dispatch: sealed::Sealed {
    fn log(&mut self, severity: Severity, message: &str);

    fn log_record(&mut self, record: Record);
}

/// Which records a logger accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Ordinary application records. Uncaught-exception records are
    /// dropped so they reach only the dedicated logger.
    Application,
    /// Only records flagged by the uncaught-exception hook.
    UncaughtOnly,
}

impl Route {
    pub fn accepts(self, record: &Record) -> bool {
        match self {
            Self::Application => CaughtExceptionFilter.accept(record),
            Self::UncaughtOnly => UncaughtExceptionFilter.accept(record),
        }
    }
}

struct EmailPieces {
    settings: EmailSettings,
    emailer: Box<dyn Emailer>,
    archiver: Box<dyn Archiver>,
}

/// Configures and builds a [`ProjectLogger`].
pub struct LoggerBuilder {
    project: String,
    root: PathBuf,
    rotation: Option<RotationSource>,
    severities: Vec<Severity>,
    daily_bucket: bool,
    console_threshold: Option<Severity>,
    route: Route,
    email: Option<EmailPieces>,
}

impl LoggerBuilder {
    /// Application profile: one file sink per standard severity plus a
    /// console echo from ERROR up.
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            root: PathBuf::from("./logs"),
            rotation: None,
            severities: Severity::ALL.to_vec(),
            daily_bucket: false,
            console_threshold: Some(Severity::Error),
            route: Route::Application,
            email: None,
        }
    }

    /// Exception-only profile: zero file sinks of its own, hourly
    /// rotation by default, accepts only uncaught-exception records.
    pub fn exception_only(project: impl Into<String>) -> Self {
        Self {
            rotation: Some(RotationSource::Name("hourly".into())),
            severities: Vec::new(),
            console_threshold: None,
            route: Route::UncaughtOnly,
            ..Self::new(project)
        }
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn rotation(mut self, source: RotationSource) -> Self {
        self.rotation = Some(source);
        self
    }

    pub fn severities(mut self, severities: Vec<Severity>) -> Self {
        self.severities = severities;
        self
    }

    pub fn daily_bucket(mut self, enabled: bool) -> Self {
        self.daily_bucket = enabled;
        self
    }

    pub fn console_threshold(mut self, threshold: Option<Severity>) -> Self {
        self.console_threshold = threshold;
        self
    }

    /// Attaches the email capability with the bundled `.tar.gz`
    /// archiver.
    pub fn email(self, settings: EmailSettings, emailer: Box<dyn Emailer>) -> Self {
        self.email_with_archiver(settings, emailer, Box::new(TarGzArchiver))
    }

    pub fn email_with_archiver(
        mut self,
        settings: EmailSettings,
        emailer: Box<dyn Emailer>,
        archiver: Box<dyn Archiver>,
    ) -> Self {
        self.email = Some(EmailPieces {
            settings,
            emailer,
            archiver,
        });
        self
    }

    /// Resolves the rotation spec, provisions directories and file
    /// sinks, and assembles the logger.
    pub fn build(self) -> Result<ProjectLogger, SetupError> {
        let spec = RotationSpec::resolve(self.rotation.as_ref())?;
        let layout = SinkLayout::new(self.root, self.project.clone(), spec, self.daily_bucket);
        let descriptors = layout.provision(&self.severities)?;

        let mut sinks: Vec<(Severity, Box<dyn Sink>)> = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            let sink = RotatingFileSink::open(self.project.as_str(), descriptor).map_err(
                |source| SetupError::SinkOpen {
                    path: descriptor.path.clone(),
                    source,
                },
            )?;
            sinks.push((descriptor.severity, Box::new(sink)));
        }

        let console = self
            .console_threshold
            .map(|threshold| (threshold, ConsoleSink::new(self.project.as_str())));

        let escalation = match self.email {
            Some(pieces) => {
                let log_dir = layout.directory();
                Some(EmailEscalation::new(
                    pieces.settings,
                    pieces.emailer,
                    pieces.archiver,
                    log_dir,
                )?)
            }
            None => None,
        };

        Ok(ProjectLogger {
            project: self.project,
            layout,
            descriptors,
            sinks,
            console,
            route: self.route,
            escalation,
        })
    }
}

/// A configured logger bound to one project.
///
/// File sinks follow threshold semantics: a record reaches every sink
/// whose severity is at or below the record's, so the debug file holds
/// the full stream and the error file only ERROR and CRITICAL.
pub struct ProjectLogger {
    project: String,
    layout: SinkLayout,
    descriptors: Vec<FileSinkDescriptor>,
    sinks: Vec<(Severity, Box<dyn Sink>)>,
    console: Option<(Severity, ConsoleSink)>,
    route: Route,
    escalation: Option<EmailEscalation>,
}

impl ProjectLogger {
    pub fn builder(project: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(project)
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn spec(&self) -> RotationSpec {
        self.layout.spec()
    }

    /// Directory the logger's files live in today.
    pub fn directory(&self) -> PathBuf {
        self.layout.directory()
    }

    pub fn descriptors(&self) -> &[FileSinkDescriptor] {
        &self.descriptors
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn has_email_capability(&self) -> bool {
        self.escalation.is_some()
    }

    /// Adds a sink fed by every accepted record at or above
    /// `threshold`. This is the seam for host-supplied destinations.
    pub fn attach_sink(&mut self, threshold: Severity, sink: Box<dyn Sink>) {
        self.sinks.push((threshold, sink));
    }

    /// Whether an echoed record should also be printed plainly. False
    /// while a console sink already shows INFO or DEBUG, which would
    /// duplicate the line.
    pub fn should_echo(&self) -> bool {
        match &self.console {
            Some((threshold, _)) => *threshold > Severity::Info,
            None => true,
        }
    }

    /// Readies the escalation channel for a fresh outgoing message.
    /// Returns whether the logger carries the email capability at all;
    /// preparation failures are reported, never propagated.
    pub fn prepare_fresh_envelope(&mut self) -> bool {
        match &mut self.escalation {
            Some(escalation) => {
                escalation.prepare_fresh_envelope();
                true
            }
            None => false,
        }
    }

    pub fn flush(&mut self) {
        if let Some((_, console)) = &mut self.console {
            if let Err(e) = console.flush() {
                warn!("console sink flush failed: {e}");
            }
        }
        for (_, sink) in &mut self.sinks {
            if let Err(e) = sink.flush() {
                warn!("log sink flush failed: {e}");
            }
        }
    }

    fn dispatch(&mut self, record: Record) {
        if !self.route.accepts(&record) {
            return;
        }

        if record.echo && self.should_echo() {
            println!("{}", record.message);
        }

        if let Some((threshold, console)) = &mut self.console {
            if record.severity >= *threshold {
                if let Err(e) = console.emit(&record) {
                    warn!("console sink write failed: {e}");
                }
            }
        }

        for (threshold, sink) in &mut self.sinks {
            if record.severity >= *threshold {
                if let Err(e) = sink.emit(&record) {
                    eprintln!("Failed to write to log sink: {e}");
                    warn!("log sink write failed: {e}");
                }
            }
        }

        if record.severity >= ESCALATION_THRESHOLD && NoEmailFilter.accept(&record) {
            if let Some(escalation) = &mut self.escalation {
                escalation.escalate(&self.project, &record);
            }
        }
    }
}

impl Dispatch for ProjectLogger {
    fn log(&mut self, severity: Severity, message: &str) {
        self.dispatch(Record::new(severity, message));
    }

    fn log_record(&mut self, record: Record) {
        self.dispatch(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalate::MockEmailer;
    use crate::escalate::archive::MockArchiver;
    use std::fs;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct RecordingSink {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Sink for RecordingSink {
        fn emit(&mut self, record: &Record) -> io::Result<()> {
            self.seen.lock().unwrap().push(record.message.clone());
            Ok(())
        }
    }

    fn recording() -> (Arc<Mutex<Vec<String>>>, Box<dyn Sink>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink { seen: seen.clone() };
        (seen, Box::new(sink))
    }

    fn email_settings() -> EmailSettings {
        EmailSettings::new("alerts", vec!["ops@example.com".into()]).unwrap()
    }

    #[test]
    fn test_application_profile_provisions_all_severities() {
        let dir = TempDir::new().unwrap();
        let logger = LoggerBuilder::new("app").root(dir.path()).build().unwrap();

        assert_eq!(logger.descriptors().len(), Severity::ALL.len());
        assert_eq!(logger.spec().name, "minute");
        assert_eq!(logger.route(), Route::Application);
        for descriptor in logger.descriptors() {
            assert!(descriptor.path.is_file());
        }
    }

    #[test]
    fn test_exception_only_profile_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let logger = LoggerBuilder::exception_only("app")
            .root(dir.path().join("logs"))
            .build()
            .unwrap();

        assert!(logger.descriptors().is_empty());
        assert_eq!(logger.spec().name, "hourly");
        assert_eq!(logger.route(), Route::UncaughtOnly);
        assert!(!logger.directory().exists());
    }

    #[test]
    fn test_unknown_rotation_preset_fails_build() {
        let dir = TempDir::new().unwrap();
        let result = LoggerBuilder::new("app")
            .root(dir.path())
            .rotation(RotationSource::Name("fortnightly".into()))
            .build();
        assert!(matches!(result, Err(SetupError::Spec(_))));
    }

    #[test]
    fn test_application_route_drops_uncaught_records() {
        let dir = TempDir::new().unwrap();
        let mut logger = LoggerBuilder::new("app")
            .root(dir.path())
            .severities(Vec::new())
            .console_threshold(None)
            .build()
            .unwrap();
        let (seen, sink) = recording();
        logger.attach_sink(Severity::Debug, sink);

        logger.log(Severity::Info, "ordinary");
        logger.log_record(Record::new(Severity::Error, "from hook").mark_uncaught());

        assert_eq!(*seen.lock().unwrap(), vec!["ordinary".to_string()]);
    }

    #[test]
    fn test_uncaught_route_drops_ordinary_records() {
        let dir = TempDir::new().unwrap();
        let mut logger = LoggerBuilder::exception_only("app")
            .root(dir.path())
            .build()
            .unwrap();
        let (seen, sink) = recording();
        logger.attach_sink(Severity::Debug, sink);

        logger.log(Severity::Error, "ordinary");
        logger.log_record(Record::new(Severity::Error, "from hook").mark_uncaught());

        assert_eq!(*seen.lock().unwrap(), vec!["from hook".to_string()]);
    }

    #[test]
    fn test_file_sinks_follow_threshold_semantics() {
        let dir = TempDir::new().unwrap();
        let mut logger = LoggerBuilder::new("app")
            .root(dir.path())
            .console_threshold(None)
            .build()
            .unwrap();

        logger.log(Severity::Warning, "disk almost full");
        logger.flush();

        let read = |severity: Severity| {
            let path = dir
                .path()
                .join("app")
                .join(format!("{}.minute.log", severity.as_str()));
            fs::read_to_string(path).unwrap()
        };
        assert!(read(Severity::Debug).contains("disk almost full"));
        assert!(read(Severity::Info).contains("disk almost full"));
        assert!(read(Severity::Warning).contains("disk almost full"));
        assert!(read(Severity::Error).is_empty());
        assert!(read(Severity::Critical).is_empty());
    }

    #[test]
    fn test_should_echo_follows_console_threshold() {
        let dir = TempDir::new().unwrap();
        let base = || {
            LoggerBuilder::new("app")
                .root(dir.path())
                .severities(Vec::new())
        };

        assert!(base().build().unwrap().should_echo());
        assert!(base().console_threshold(None).build().unwrap().should_echo());
        assert!(
            !base()
                .console_threshold(Some(Severity::Info))
                .build()
                .unwrap()
                .should_echo()
        );
    }

    #[test]
    fn test_prepare_fresh_envelope_without_capability() {
        let dir = TempDir::new().unwrap();
        let mut logger = LoggerBuilder::new("app")
            .root(dir.path())
            .severities(Vec::new())
            .build()
            .unwrap();

        assert!(!logger.has_email_capability());
        assert!(!logger.prepare_fresh_envelope());
    }

    #[test]
    fn test_escalation_honors_no_email_flag() {
        let dir = TempDir::new().unwrap();

        let mut archiver = MockArchiver::new();
        archiver
            .expect_bundle()
            .times(1)
            .returning(|_| Ok(PathBuf::from("/tmp/logs_bundle.tar.gz")));
        archiver.expect_cleanup().times(1).returning(|_, _| ());

        let mut emailer = MockEmailer::new();
        emailer.expect_send().times(1).returning(|_, _, _, _| Ok(()));

        let mut logger = LoggerBuilder::exception_only("app")
            .root(dir.path())
            .email_with_archiver(email_settings(), Box::new(emailer), Box::new(archiver))
            .build()
            .unwrap();
        assert!(logger.has_email_capability());

        logger.log_record(
            Record::new(Severity::Error, "quiet failure")
                .mark_uncaught()
                .suppress_email(),
        );
        logger.log_record(Record::new(Severity::Error, "loud failure").mark_uncaught());
    }
}
