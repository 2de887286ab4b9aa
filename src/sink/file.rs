use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{DateTime, Local, TimeZone};
use tracing::{debug, warn};

use super::{Sink, format_record};
use crate::domain::Record;
use crate::provision::FileSinkDescriptor;
use crate::rotation::RotationSpec;

/// Append-only file sink that rolls the active file to a timestamped
/// backup when the rotation period advances, pruning old backups
/// beyond the configured backup count.
pub struct RotatingFileSink {
    path: PathBuf,
    spec: RotationSpec,
    project: String,
    writer: File,
    period: Option<i64>,
}

impl RotatingFileSink {
    pub fn open(project: impl Into<String>, descriptor: &FileSinkDescriptor) -> io::Result<Self> {
        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&descriptor.path)?;
        Ok(Self {
            path: descriptor.path.clone(),
            spec: descriptor.spec,
            project: project.into(),
            writer,
            period: None,
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Renames the active file with its period's timestamp suffix and
    /// reopens a fresh one once the rotation period has advanced. The
    /// first write only pins the current period.
    fn rotate_if_due(&mut self, at: DateTime<Local>) -> io::Result<()> {
        let current = self.spec.period_index(at);
        let previous = match self.period {
            None => {
                self.period = Some(current);
                return Ok(());
            }
            Some(previous) if previous == current => return Ok(()),
            Some(previous) => previous,
        };

        self.writer.flush()?;
        let backup = self.backup_path(previous, at);
        if self.path.exists() {
            fs::rename(&self.path, &backup)?;
        }
        self.writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.period = Some(current);
        debug!(
            "rotated {} to {}",
            self.path.display(),
            backup.display()
        );
        self.prune_backups();
        Ok(())
    }

    /// Backup files are named after the start of the period they hold.
    fn backup_path(&self, period: i64, fallback: DateTime<Local>) -> PathBuf {
        let started = Local
            .timestamp_opt(period * self.spec.period_seconds(), 0)
            .single()
            .unwrap_or(fallback);
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{}", self.spec.backup_suffix(started)));
        PathBuf::from(name)
    }

    /// Removes the oldest backups beyond `backup_count`. A count of
    /// zero keeps everything.
    fn prune_backups(&self) {
        if self.spec.backup_count == 0 {
            return;
        }
        let Some(dir) = self.path.parent() else {
            return;
        };
        let Some(active_name) = self.path.file_name().and_then(|name| name.to_str()) else {
            return;
        };
        let prefix = format!("{active_name}.");

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("failed to scan {} for old backups: {}", dir.display(), e);
                return;
            }
        };

        let mut backups: Vec<PathBuf> = Vec::new();
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(&prefix) {
                    backups.push(entry.path());
                }
            }
        }

        // Suffixes are zero-padded, so lexicographic order is age order.
        backups.sort();
        let keep = self.spec.backup_count as usize;
        if backups.len() > keep {
            let excess = backups.len() - keep;
            for oldest in backups.drain(..excess) {
                if let Err(e) = fs::remove_file(&oldest) {
                    warn!("failed to prune old backup {}: {}", oldest.display(), e);
                }
            }
        }
    }
}

impl Sink for RotatingFileSink {
    fn emit(&mut self, record: &Record) -> io::Result<()> {
        self.rotate_if_due(record.timestamp)?;
        writeln!(self.writer, "{}", format_record(&self.project, record))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
