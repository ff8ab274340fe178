//! Error types for the HAL crate.

use thiserror::Error;

use rimfax_timeline::{Port, PulseId, TimelineError};

/// Errors that can occur while driving an instrument. All of these are
/// fatal for the current run; none are retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// Could not reach the instrument.
    #[error("connection to instrument failed: {0}")]
    ConnectionFailed(String),

    /// A configured value is outside what the hardware can produce.
    #[error("{what} out of range: {value} (allowed {min}..={max})")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The port does not exist on this instrument.
    #[error("invalid {0}")]
    InvalidPort(Port),

    /// The pulse handle was never defined on this instrument.
    #[error("unknown {0}")]
    UnknownPulse(PulseId),

    /// The driver reported a fault.
    #[error("driver fault: {0}")]
    Driver(String),

    /// A timeline could not be programmed.
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// Transport-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
