//! Error types for timeline construction.

use thiserror::Error;

use crate::event::Port;

/// Errors that can occur while building or validating a timeline.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum TimelineError {
    /// A swept delay came out negative; the instrument cannot execute it.
    #[error("negative delay {delay} s at sweep index {index}")]
    NegativeDelay { index: usize, delay: f64 },

    /// An event was scheduled before the previous one.
    #[error("event at {time} s scheduled before previous event at {prev} s")]
    NonMonotonic { time: f64, prev: f64 },

    /// A pulse duration must be strictly positive.
    #[error("pulse duration must be positive, got {duration} s")]
    NonPositiveDuration { duration: f64 },

    /// A wait, latency or cursor advance must be non-negative.
    #[error("{name} must be non-negative, got {value} s")]
    NegativeInterval { name: &'static str, value: f64 },

    /// Two pulses on the same physical output overlap in time.
    #[error("pulses on {port} overlap: previous ends at {end} s, next starts at {start} s")]
    OverlappingPulses { port: Port, end: f64, start: f64 },

    /// A delay sweep needs at least one point.
    #[error("delay sweep must have at least one step")]
    EmptySweep,
}

/// Result type for timeline operations.
pub type TimelineResult<T> = Result<T, TimelineError>;
