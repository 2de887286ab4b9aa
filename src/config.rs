//! Settings file support for hosts and the demo binary.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::Severity;
use crate::escalate::EmailSettings;
use crate::logger::LoggerBuilder;
use crate::rotation::{RotationSource, RotationSpec};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Logger settings as loaded from a TOML file.
///
/// Everything except `project_name` has a default, so the smallest
/// useful file is a single line. The email section only carries
/// addressing; the transport itself is attached by the host.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub project_name: String,
    #[serde(default = "default_root_location")]
    pub root_location: PathBuf,
    /// Preset name or table form, absent for the default preset.
    #[serde(default)]
    pub rotation: Option<RotationSource>,
    /// Absent keeps the standard five severities.
    #[serde(default)]
    pub severities: Option<Vec<Severity>>,
    #[serde(default)]
    pub daily_bucket: bool,
    /// Lowest severity echoed to the console; absent keeps the ERROR
    /// default.
    #[serde(default)]
    pub console_threshold: Option<Severity>,
    #[serde(default)]
    pub email: Option<EmailSettings>,
}

fn default_root_location() -> PathBuf {
    PathBuf::from("./logs")
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates everything checkable without touching the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "project_name must not be empty".into(),
            ));
        }
        if let Err(e) = RotationSpec::resolve(self.rotation.as_ref()) {
            return Err(ConfigError::Invalid(e.to_string()));
        }
        if let Some(email) = &self.email {
            if let Err(e) = email.validate() {
                return Err(ConfigError::Invalid(e.to_string()));
            }
        }
        Ok(())
    }

    /// Seeds an application-profile [`LoggerBuilder`] with these
    /// settings.
    pub fn builder(&self) -> LoggerBuilder {
        let mut builder =
            LoggerBuilder::new(self.project_name.as_str()).root(self.root_location.clone());
        if let Some(rotation) = &self.rotation {
            builder = builder.rotation(rotation.clone());
        }
        if let Some(severities) = &self.severities {
            builder = builder.severities(severities.clone());
        }
        if self.daily_bucket {
            builder = builder.daily_bucket(true);
        }
        if let Some(threshold) = self.console_threshold {
            builder = builder.console_threshold(Some(threshold));
        }
        builder
    }
}
