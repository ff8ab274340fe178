//! Cursor-based timeline builder.

use crate::error::{TimelineError, TimelineResult};
use crate::event::{Action, Event, Port, PulseId, Timeline};

/// Builds a [`Timeline`] by walking a time cursor forward, the way a
/// measurement script walks its running `T` variable.
///
/// Scheduling an event does not move the cursor; [`advance`] does. Events
/// must land at non-decreasing timestamps and the cursor can never move
/// backwards, so a finished timeline is ordered by construction.
///
/// [`advance`]: TimelineBuilder::advance
#[derive(Debug, Default)]
pub struct TimelineBuilder {
    events: Vec<Event>,
    cursor: f64,
}

impl TimelineBuilder {
    /// Start an empty program at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor position in seconds.
    pub fn at(&self) -> f64 {
        self.cursor
    }

    fn push(&mut self, time: f64, action: Action) -> TimelineResult<()> {
        if let Some(last) = self.events.last() {
            if time < last.time {
                return Err(TimelineError::NonMonotonic {
                    time,
                    prev: last.time,
                });
            }
        }
        self.events.push(Event { time, action });
        Ok(())
    }

    /// Schedule a carrier phase reset on `port` at the cursor.
    pub fn reset_phase(&mut self, port: Port) -> TimelineResult<()> {
        self.push(self.cursor, Action::ResetPhase { port })
    }

    /// Schedule a pulse on `port` starting at the cursor.
    pub fn output_pulse(&mut self, pulse: PulseId, port: Port, duration: f64) -> TimelineResult<()> {
        if !(duration > 0.0) {
            return Err(TimelineError::NonPositiveDuration { duration });
        }
        self.push(
            self.cursor,
            Action::OutputPulse {
                pulse,
                port,
                duration,
            },
        )
    }

    /// Schedule the sample window at an absolute time at or after the
    /// previous event. Used for the fixed acquisition-path latency offset.
    pub fn store_at(&mut self, time: f64) -> TimelineResult<()> {
        if time < 0.0 {
            return Err(TimelineError::NegativeInterval {
                name: "store time",
                value: time,
            });
        }
        self.push(time, Action::Store)
    }

    /// Move the cursor forward by `dt` seconds.
    pub fn advance(&mut self, dt: f64) -> TimelineResult<()> {
        if dt < 0.0 {
            return Err(TimelineError::NegativeInterval {
                name: "cursor advance",
                value: dt,
            });
        }
        self.cursor += dt;
        Ok(())
    }

    /// Finish the program. The period is the final cursor position.
    pub fn finish(self) -> Timeline {
        Timeline::from_parts(self.events, self.cursor)
    }
}
