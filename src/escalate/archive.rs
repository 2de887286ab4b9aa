use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

/// Name of the staging copy created next to the live log files.
const STAGING_DIR: &str = "outgoing_logs";
const ARCHIVE_NAME: &str = "logs_bundle.tar.gz";

/// Bundles a log directory into a single archive for attachment.
#[cfg_attr(test, automock)]
pub trait Archiver: Send {
    /// Copies the directory's `.log` files aside and produces an
    /// archive from the copy; returns the archive path.
    fn bundle(&self, dir: &Path) -> io::Result<PathBuf>;

    /// Removes the staging copy and the archive. Absence is fine.
    fn cleanup(&self, dir: &Path, archive: &Path);
}

/// `.tar.gz` implementation used when the host does not supply one.
pub struct TarGzArchiver;

impl Archiver for TarGzArchiver {
    fn bundle(&self, dir: &Path) -> io::Result<PathBuf> {
        let mut sources: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "log") {
                sources.push(path);
            }
        }
        if sources.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no log files under {}", dir.display()),
            ));
        }

        let staging = dir.join(STAGING_DIR);
        fs::create_dir_all(&staging)?;
        for path in &sources {
            if let Some(name) = path.file_name() {
                fs::copy(path, staging.join(name))?;
            }
        }

        let archive_path = dir.join(ARCHIVE_NAME);
        let file = File::create(&archive_path)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all("logs", &staging)?;
        let encoder = builder.into_inner()?;
        encoder.finish()?;

        debug!(
            "bundled {} log files into {}",
            sources.len(),
            archive_path.display()
        );
        Ok(archive_path)
    }

    fn cleanup(&self, dir: &Path, archive: &Path) {
        let staging = dir.join(STAGING_DIR);
        if let Err(e) = fs::remove_dir_all(&staging) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("failed to remove staging copy {}: {}", staging.display(), e);
            }
        }
        if let Err(e) = fs::remove_file(archive) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("failed to remove archive {}: {}", archive.display(), e);
            }
        }
    }
}
