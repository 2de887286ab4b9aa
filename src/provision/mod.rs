//! Directory layout derivation and per-severity sink provisioning.
//!
//! Path derivation is a pure function of the layout fields plus an
//! explicit date; only `provision` touches the filesystem, and it is
//! idempotent.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::debug;

use crate::domain::Severity;
use crate::rotation::RotationSpec;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One provisioned file sink target. Owned by the logger that
/// provisioned it; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSinkDescriptor {
    pub severity: Severity,
    pub path: PathBuf,
    pub spec: RotationSpec,
}

/// Where a project's log files live.
#[derive(Debug, Clone)]
pub struct SinkLayout {
    root: PathBuf,
    project: String,
    spec: RotationSpec,
    daily_bucket: bool,
}

impl SinkLayout {
    pub fn new(
        root: impl Into<PathBuf>,
        project: impl Into<String>,
        spec: RotationSpec,
        daily_bucket: bool,
    ) -> Self {
        Self {
            root: root.into(),
            project: project.into(),
            spec,
            daily_bucket,
        }
    }

    pub fn spec(&self) -> RotationSpec {
        self.spec
    }

    /// Directory holding the sinks on `date`: flat under
    /// `<root>/<project>`, or bucketed by `<preset>-<date>` in
    /// daily-layout mode.
    pub fn directory_on(&self, date: NaiveDate) -> PathBuf {
        let base = self.root.join(&self.project);
        if self.daily_bucket {
            base.join(format!("{}-{}", self.spec.name, date.format("%Y-%m-%d")))
        } else {
            base
        }
    }

    pub fn directory(&self) -> PathBuf {
        self.directory_on(Local::now().date_naive())
    }

    /// File path for one severity under the directory for `date`.
    pub fn sink_path_on(&self, severity: Severity, date: NaiveDate) -> PathBuf {
        self.directory_on(date).join(self.file_name(severity))
    }

    /// Creates the directory structure and derives one descriptor per
    /// requested severity.
    ///
    /// Severities are deduplicated, so provisioning the same set twice
    /// yields the same descriptors. An empty set is the documented
    /// opt-out: nothing is created and nothing is returned.
    pub fn provision(
        &self,
        severities: &[Severity],
    ) -> Result<Vec<FileSinkDescriptor>, ProvisionError> {
        self.provision_on(severities, Local::now().date_naive())
    }

    pub fn provision_on(
        &self,
        severities: &[Severity],
        date: NaiveDate,
    ) -> Result<Vec<FileSinkDescriptor>, ProvisionError> {
        if severities.is_empty() {
            return Ok(Vec::new());
        }

        let dir = self.directory_on(date);
        fs::create_dir_all(&dir).map_err(|source| ProvisionError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        debug!("provisioned log directory {}", dir.display());

        let unique: BTreeSet<Severity> = severities.iter().copied().collect();
        Ok(unique
            .into_iter()
            .map(|severity| FileSinkDescriptor {
                severity,
                path: dir.join(self.file_name(severity)),
                spec: self.spec,
            })
            .collect())
    }

    fn file_name(&self, severity: Severity) -> String {
        format!("{}.{}.log", severity.as_str(), self.spec.name)
    }
}
