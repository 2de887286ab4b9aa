use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordered severity of a log record.
///
/// Carries the canonical integer values (10..=50 in steps of 10) so
/// numeric level input normalizes to the same comparison scale as
/// named input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeverityError {
    #[error("unknown severity name '{0}'")]
    UnknownName(String),

    #[error("unknown severity value {0}")]
    UnknownValue(u8),
}

impl Severity {
    /// The standard severity set used when the caller does not choose one.
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    /// Lower-case name, used in file names and serialized forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }

    /// Upper-case label, used in formatted log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Canonical integer value for threshold comparisons.
    pub fn value(&self) -> u8 {
        match self {
            Severity::Debug => 10,
            Severity::Info => 20,
            Severity::Warning => 30,
            Severity::Error => 40,
            Severity::Critical => 50,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Severity {
    type Err = SeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            _ => Err(SeverityError::UnknownName(s.to_string())),
        }
    }
}

impl TryFrom<u8> for Severity {
    type Error = SeverityError;

    fn try_from(value: u8) -> Result<Self, SeverityError> {
        match value {
            10 => Ok(Severity::Debug),
            20 => Ok(Severity::Info),
            30 => Ok(Severity::Warning),
            40 => Ok(Severity::Error),
            50 => Ok(Severity::Critical),
            other => Err(SeverityError::UnknownValue(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn test_severity_from_name_case_insensitive() {
        assert_eq!("debug".parse::<Severity>().unwrap(), Severity::Debug);
        assert_eq!("WARNING".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("Critical".parse::<Severity>().unwrap(), Severity::Critical);
    }

    #[test]
    fn test_severity_from_unknown_name_fails() {
        let err = "verbose".parse::<Severity>().unwrap_err();
        assert_eq!(err, SeverityError::UnknownName("verbose".to_string()));
    }

    #[test]
    fn test_severity_from_canonical_value() {
        assert_eq!(Severity::try_from(10).unwrap(), Severity::Debug);
        assert_eq!(Severity::try_from(40).unwrap(), Severity::Error);
        assert_eq!(Severity::try_from(50).unwrap(), Severity::Critical);
    }

    #[test]
    fn test_severity_from_unknown_value_fails() {
        assert_eq!(
            Severity::try_from(25).unwrap_err(),
            SeverityError::UnknownValue(25)
        );
    }

    #[test]
    fn test_value_matches_ordering() {
        for pair in Severity::ALL.windows(2) {
            assert!(pair[0].value() < pair[1].value());
        }
    }

    #[test]
    fn test_names_and_labels() {
        assert_eq!(Severity::Error.as_str(), "error");
        assert_eq!(Severity::Error.label(), "ERROR");
        assert_eq!(Severity::Error.to_string(), "ERROR");
    }
}
