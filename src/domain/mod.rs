//! Domain layer for vakt-logger.
//!
//! Contains the canonical types shared across all modules:
//! - `Severity`: Ordered log severity (Debug..Critical) with canonical integer values
//! - `Record`: The dispatch pipeline's core data type
//! - `SetupError`: Top-level configuration error

pub mod error;
pub mod record;
pub mod severity;

pub use error::SetupError;
pub use record::Record;
pub use severity::{Severity, SeverityError};
