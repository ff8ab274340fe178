//! Timeline events and the finished program.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TimelineError, TimelineResult};

/// A physical output or input port on the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Port(pub u8);

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port{}", self.0)
    }
}

impl From<u8> for Port {
    fn from(id: u8) -> Self {
        Port(id)
    }
}

/// Handle for a pulse template defined on the instrument.
///
/// The driver hands these out when a pulse is set up; the timeline only
/// refers to them, it never owns waveform data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PulseId(pub u32);

impl fmt::Display for PulseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pulse{}", self.0)
    }
}

impl From<u32> for PulseId {
    fn from(id: u32) -> Self {
        PulseId(id)
    }
}

/// One timed action in a program.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Reset the carrier phase of an output port.
    ResetPhase { port: Port },
    /// Emit a previously defined pulse on a port.
    OutputPulse {
        pulse: PulseId,
        port: Port,
        duration: f64,
    },
    /// Open the sample window on the configured store ports.
    Store,
}

/// A timestamped action. `time` is the offset in seconds from the start
/// of the program.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub time: f64,
    pub action: Action,
}

/// A finished program: events in non-decreasing time order plus the total
/// repetition period handed to the instrument's run call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    events: Vec<Event>,
    period: f64,
}

impl Timeline {
    pub(crate) fn from_parts(events: Vec<Event>, period: f64) -> Self {
        Self { events, period }
    }

    /// All events, in schedule order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Total program period in seconds.
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the program contains no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Timestamps of every sample window, in order.
    pub fn store_times(&self) -> Vec<f64> {
        self.events
            .iter()
            .filter(|ev| matches!(ev.action, Action::Store))
            .map(|ev| ev.time)
            .collect()
    }

    /// `[start, end)` intervals of every pulse emitted on `port`.
    pub fn pulse_intervals_on(&self, port: Port) -> Vec<(f64, f64)> {
        self.events
            .iter()
            .filter_map(|ev| match ev.action {
                Action::OutputPulse {
                    port: p, duration, ..
                } if p == port => Some((ev.time, ev.time + duration)),
                _ => None,
            })
            .collect()
    }

    /// Smallest gap between consecutive pulses on `port`, or `None` if the
    /// port carries fewer than two pulses. Negative means overlap.
    pub fn min_gap_on(&self, port: Port) -> Option<f64> {
        let intervals = self.pulse_intervals_on(port);
        intervals
            .windows(2)
            .map(|w| w[1].0 - w[0].1)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Check that no two pulses on the same physical output overlap.
    pub fn validate_no_overlap(&self) -> TimelineResult<()> {
        let mut ports: Vec<Port> = self
            .events
            .iter()
            .filter_map(|ev| match ev.action {
                Action::OutputPulse { port, .. } => Some(port),
                _ => None,
            })
            .collect();
        ports.sort_unstable();
        ports.dedup();
        for port in ports {
            for w in self.pulse_intervals_on(port).windows(2) {
                let (_, end) = w[0];
                let (start, _) = w[1];
                if start < end {
                    return Err(TimelineError::OverlappingPulses { port, end, start });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_event(time: f64, port: u8, duration: f64) -> Event {
        Event {
            time,
            action: Action::OutputPulse {
                pulse: PulseId(0),
                port: Port(port),
                duration,
            },
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Port(3).to_string(), "port3");
        assert_eq!(PulseId(7).to_string(), "pulse7");
    }

    #[test]
    fn test_overlap_detected() {
        let tl = Timeline::from_parts(
            vec![pulse_event(0.0, 1, 2e-6), pulse_event(1e-6, 1, 2e-6)],
            10e-6,
        );
        let err = tl.validate_no_overlap().unwrap_err();
        assert!(matches!(err, TimelineError::OverlappingPulses { port: Port(1), .. }));
    }

    #[test]
    fn test_overlap_across_ports_is_fine() {
        let tl = Timeline::from_parts(
            vec![pulse_event(0.0, 1, 2e-6), pulse_event(1e-6, 2, 2e-6)],
            10e-6,
        );
        assert!(tl.validate_no_overlap().is_ok());
    }

    #[test]
    fn test_min_gap() {
        let tl = Timeline::from_parts(
            vec![
                pulse_event(0.0, 1, 20e-9),
                pulse_event(50e-9, 1, 20e-9),
                pulse_event(90e-9, 1, 20e-9),
            ],
            1e-6,
        );
        let gap = tl.min_gap_on(Port(1)).unwrap();
        assert!((gap - 20e-9).abs() < 1e-15);
        assert_eq!(tl.min_gap_on(Port(2)), None);
    }

    #[test]
    fn test_serde_roundtrip() {
        let tl = Timeline::from_parts(vec![pulse_event(0.0, 1, 2e-6)], 10e-6);
        let json = serde_json::to_string(&tl).unwrap();
        let back: Timeline = serde_json::from_str(&json).unwrap();
        assert_eq!(tl, back);
    }
}
