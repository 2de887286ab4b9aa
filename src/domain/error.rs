use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::escalate::EmailConfigError;
use crate::provision::ProvisionError;
use crate::rotation::SpecError;

/// Top-level error produced while building a logger configuration.
///
/// Every variant is fatal to setup; nothing here is retried.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("rotation spec error: {0}")]
    Spec(#[from] SpecError),

    #[error("sink provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    #[error("email configuration error: {0}")]
    Email(#[from] EmailConfigError),

    #[error("failed to open log sink {path}: {source}")]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
