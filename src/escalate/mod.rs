//! Email escalation for records at or above the error threshold.
//!
//! The concrete transport lives outside the crate: hosts implement
//! [`Emailer`] over whatever mail client they use. Attachments come
//! from an [`Archiver`], by default the bundled [`TarGzArchiver`].

pub mod archive;

pub use archive::{Archiver, TarGzArchiver};

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[cfg(test)]
use mockall::automock;

use crate::domain::Record;
use crate::sink::format_record;

/// Invalid email configuration, rejected before any logger is built.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EmailConfigError {
    #[error("email subject must not be empty")]
    EmptySubject,
    #[error("email configuration needs at least one recipient")]
    NoRecipients,
}

/// Runtime failure on the escalation path. Never propagated past the
/// escalation itself.
#[derive(Error, Debug)]
pub enum EscalationError {
    #[error("could not bundle logs for attachment: {0}")]
    Archive(#[from] io::Error),
    #[error("could not prepare a fresh outgoing message: {0}")]
    Prepare(String),
    #[error("transport rejected the message: {0}")]
    Transport(String),
}

/// Addressing configuration for the escalation channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    /// Subject the host transport applies to messages it builds on its
    /// own. Escalated records always carry a computed
    /// `<LEVEL> in <project>` subject instead.
    pub subject: String,
    pub recipients: Vec<String>,
}

impl EmailSettings {
    pub fn new(
        subject: impl Into<String>,
        recipients: Vec<String>,
    ) -> Result<Self, EmailConfigError> {
        let settings = Self {
            subject: subject.into(),
            recipients,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), EmailConfigError> {
        if self.subject.trim().is_empty() {
            return Err(EmailConfigError::EmptySubject);
        }
        if self.recipients.is_empty() {
            return Err(EmailConfigError::NoRecipients);
        }
        Ok(())
    }
}

/// Outgoing-mail capability supplied by the host.
#[cfg_attr(test, automock)]
pub trait Emailer: Send {
    /// Discards any partially built message and starts a clean one.
    fn prepare_fresh_envelope(&mut self) -> Result<(), EscalationError>;

    /// Sends one message with the bundled logs attached.
    fn send(
        &mut self,
        subject: &str,
        body: &str,
        recipients: &[String],
        attachments: &[PathBuf],
    ) -> Result<(), EscalationError>;
}

/// Sends one email per escalation-worthy record: bundle the log
/// directory, attach, send, clean up the bundle.
pub struct EmailEscalation {
    settings: EmailSettings,
    emailer: Box<dyn Emailer>,
    archiver: Box<dyn Archiver>,
    log_dir: PathBuf,
}

impl EmailEscalation {
    pub fn new(
        settings: EmailSettings,
        emailer: Box<dyn Emailer>,
        archiver: Box<dyn Archiver>,
        log_dir: PathBuf,
    ) -> Result<Self, EmailConfigError> {
        settings.validate()?;
        Ok(Self {
            settings,
            emailer,
            archiver,
            log_dir,
        })
    }

    pub fn settings(&self) -> &EmailSettings {
        &self.settings
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Starts a clean outgoing message. Failures are reported, never
    /// propagated; the next escalation still gets a send attempt.
    pub fn prepare_fresh_envelope(&mut self) {
        if let Err(e) = self.emailer.prepare_fresh_envelope() {
            warn!("could not prepare a fresh email envelope: {e}");
        }
    }

    /// Forwards one record by email. A failure aborts this event only
    /// and is reported on the console.
    pub fn escalate(&mut self, project: &str, record: &Record) {
        if let Err(e) = self.try_escalate(project, record) {
            warn!("email escalation failed: {e}");
            eprintln!("Error sending email: {e}");
        }
    }

    fn try_escalate(&mut self, project: &str, record: &Record) -> Result<(), EscalationError> {
        let archive = self.archiver.bundle(&self.log_dir)?;
        let subject = format!("{} in {}", record.severity, project);
        let body = format_record(project, record);
        let attachments = [archive];
        self.emailer
            .send(&subject, &body, &self.settings.recipients, &attachments)?;
        self.archiver.cleanup(&self.log_dir, &attachments[0]);
        Ok(())
    }
}
