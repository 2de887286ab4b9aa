//! Rotation spec resolution.
//!
//! Symbolic rotation input (a preset name, a table with overrides, or
//! nothing at all) is normalized here into a canonical `RotationSpec`.
//! Resolution is pure and deterministic; errors are configuration
//! errors, fatal to setup.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How often a file sink rolls to a fresh file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationUnit {
    Minute,
    Hour,
    Day,
}

impl RotationUnit {
    /// Seconds spanned by one unit.
    pub fn seconds(self) -> i64 {
        match self {
            RotationUnit::Minute => 60,
            RotationUnit::Hour => 3_600,
            RotationUnit::Day => 86_400,
        }
    }

    /// Timestamp format appended to rotated backup files.
    pub fn backup_suffix_format(self) -> &'static str {
        match self {
            RotationUnit::Minute => "%Y-%m-%d_%H-%M",
            RotationUnit::Hour => "%Y-%m-%d_%H",
            RotationUnit::Day => "%Y-%m-%d",
        }
    }
}

/// Canonical rotation parameters. Immutable once resolved; `resolve`
/// and the preset constants are the only ways to obtain one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RotationSpec {
    pub name: &'static str,
    pub unit: RotationUnit,
    pub interval: u32,
    pub backup_count: u32,
}

/// Accepted input forms for a rotation spec: a bare preset name, or a
/// table carrying `name` plus optional overrides. The absent case
/// (`None` at the call site) selects the default preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RotationSource {
    Name(String),
    Table {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        interval: Option<u32>,
        #[serde(default)]
        backup_count: Option<u32>,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("unknown rotation preset '{name}'")]
    UnknownPreset { name: String },

    #[error("rotation spec table is missing the 'name' key")]
    MissingName,
}

impl RotationSpec {
    pub const MINUTE: RotationSpec = RotationSpec {
        name: "minute",
        unit: RotationUnit::Minute,
        interval: 1,
        backup_count: 60,
    };

    pub const HOURLY: RotationSpec = RotationSpec {
        name: "hourly",
        unit: RotationUnit::Hour,
        interval: 1,
        backup_count: 24,
    };

    pub const DAILY: RotationSpec = RotationSpec {
        name: "daily",
        unit: RotationUnit::Day,
        interval: 1,
        backup_count: 7,
    };

    const PRESETS: [RotationSpec; 3] = [Self::MINUTE, Self::HOURLY, Self::DAILY];

    /// Resolves an optional spec source into canonical parameters.
    ///
    /// `None` selects the default preset ("minute"). Preset names match
    /// case-insensitively and the resolved name is always lower-case.
    pub fn resolve(source: Option<&RotationSource>) -> Result<Self, SpecError> {
        match source {
            None => Ok(Self::MINUTE),
            Some(RotationSource::Name(name)) => Self::from_name(name),
            Some(RotationSource::Table {
                name,
                interval,
                backup_count,
            }) => {
                let name = name.as_deref().ok_or(SpecError::MissingName)?;
                let mut spec = Self::from_name(name)?;
                if let Some(interval) = interval {
                    spec.interval = *interval;
                }
                if let Some(backup_count) = backup_count {
                    spec.backup_count = *backup_count;
                }
                Ok(spec)
            }
        }
    }

    /// Case-insensitive preset lookup.
    pub fn from_name(name: &str) -> Result<Self, SpecError> {
        let lowered = name.to_ascii_lowercase();
        Self::PRESETS
            .into_iter()
            .find(|preset| preset.name == lowered)
            .ok_or_else(|| SpecError::UnknownPreset {
                name: name.to_string(),
            })
    }

    /// Seconds spanned by one rotation period.
    pub fn period_seconds(&self) -> i64 {
        self.unit.seconds() * i64::from(self.interval.max(1))
    }

    /// Index of the rotation period containing `at`. A sink rolls over
    /// when the index advances.
    pub fn period_index(&self, at: DateTime<Local>) -> i64 {
        at.timestamp().div_euclid(self.period_seconds())
    }

    /// Suffix attached to a rotated backup of the active file.
    pub fn backup_suffix(&self, at: DateTime<Local>) -> String {
        at.format(self.unit.backup_suffix_format()).to_string()
    }
}
