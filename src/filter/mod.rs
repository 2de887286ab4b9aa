//! Record classification predicates.
//!
//! Three independent predicates gate distinct sinks. For any record the
//! uncaught and caught filters accept exclusively; the email filter is
//! orthogonal to both.

use crate::domain::Record;

pub trait RecordFilter {
    fn accept(&self, record: &Record) -> bool;
}

/// Admits only records produced by the uncaught-exception hook.
pub struct UncaughtExceptionFilter;

impl RecordFilter for UncaughtExceptionFilter {
    fn accept(&self, record: &Record) -> bool {
        record.uncaught_exception
    }
}

/// Admits ordinary application records.
pub struct CaughtExceptionFilter;

impl RecordFilter for CaughtExceptionFilter {
    fn accept(&self, record: &Record) -> bool {
        !record.uncaught_exception
    }
}

/// Admits records that may be escalated by email.
pub struct NoEmailFilter;

impl RecordFilter for NoEmailFilter {
    fn accept(&self, record: &Record) -> bool {
        !record.no_email
    }
}
