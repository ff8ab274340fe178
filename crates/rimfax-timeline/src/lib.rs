//! Pulse-timeline construction for qubit measurement sequences.
//!
//! This crate computes the absolute start time of every pulse and every
//! sample window within one hardware program, without touching any
//! instrument. A program is an ordered list of [`Event`]s — "reset the
//! carrier phase", "emit pulse P", "open the sample window" — whose
//! timestamps are monotonically non-decreasing offsets from the start of
//! the program.
//!
//! # Model
//!
//! - [`TimelineBuilder`] keeps a time cursor and schedules events at it,
//!   exactly the way a measurement script walks its `T` variable forward.
//! - [`Timeline`] is the finished program: the event list plus the total
//!   period handed to the instrument's run call.
//! - [`schedule`] holds the fixed, experiment-specific builders
//!   (Ramsey echo, T1). These are deliberately not a general compiler:
//!   the pulse order and the placement of the swept delay carry physics,
//!   not just code.
//!
//! The whole sweep is placed back to back in a single program; the period
//! is the accumulated total over all sweep points. See
//! [`schedule::ramsey_echo_timeline`].

mod builder;
mod error;
mod event;
pub mod schedule;
mod sweep;

pub use builder::TimelineBuilder;
pub use error::TimelineError;
pub use event::{Action, Event, Port, PulseId, Timeline};
pub use sweep::DelaySweep;
