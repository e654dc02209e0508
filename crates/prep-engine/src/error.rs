//! Error types for scheduling preparation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    /// A working-hours preference has no entry for the requested weekday.
    /// Always fatal -- weekday windows are never silently defaulted.
    #[error("No working hours configured for {0}")]
    MissingWorkingHours(chrono::Weekday),

    #[error("Invalid input: {0}")]
    Validation(String),

    /// An interval invariant was violated (negative duration, end before
    /// start). Aborts the current (attendee, day) unit only.
    #[error("Computation error: {0}")]
    Computation(String),
}

pub type Result<T> = std::result::Result<T, PrepError>;
