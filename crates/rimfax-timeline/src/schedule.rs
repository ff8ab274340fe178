//! Experiment-specific timeline builders.
//!
//! Each builder lays the whole delay sweep back to back in a single
//! program, accumulating one running time cursor, and returns the
//! finished [`Timeline`] whose period is the accumulated total. The
//! instrument is programmed once and the run call receives that period.
//!
//! The pulse orderings here carry physics. In particular the Ramsey-echo
//! sequence splits the swept delay exactly in half around the middle
//! π pulse; changing that split changes the measurement, not just the
//! code.

use serde::{Deserialize, Serialize};

use crate::builder::TimelineBuilder;
use crate::error::{TimelineError, TimelineResult};
use crate::event::{Port, PulseId, Timeline};
use crate::sweep::DelaySweep;

fn check_duration(duration: f64) -> TimelineResult<f64> {
    if !(duration > 0.0) {
        return Err(TimelineError::NonPositiveDuration { duration });
    }
    Ok(duration)
}

fn check_interval(name: &'static str, value: f64) -> TimelineResult<f64> {
    if value < 0.0 {
        return Err(TimelineError::NegativeInterval { name, value });
    }
    Ok(value)
}

/// Durations and delays of the Ramsey-echo (π/2 – π – π/2) sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RamseyEchoTiming {
    /// Duration of each control pulse (π/2 and π share one length).
    pub control_duration: f64,
    /// Duration of the readout pulse.
    pub readout_duration: f64,
    /// Latency between readout-pulse start and the sample window.
    pub readout_sample_delay: f64,
    /// Inter-repetition wait for the qubit to decay back to ground.
    pub wait_delay: f64,
    /// The swept delay.
    pub sweep: DelaySweep,
}

impl RamseyEchoTiming {
    fn validate(&self) -> TimelineResult<()> {
        check_duration(self.control_duration)?;
        check_duration(self.readout_duration)?;
        check_interval("readout_sample_delay", self.readout_sample_delay)?;
        check_interval("wait_delay", self.wait_delay)?;
        if self.sweep.steps == 0 {
            return Err(TimelineError::EmptySweep);
        }
        check_interval("delay step", self.sweep.dt)?;
        Ok(())
    }
}

/// Pulse handles used by the Ramsey-echo sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamseyEchoPulses {
    pub control_pi2: PulseId,
    pub control_pi: PulseId,
    pub readout: PulseId,
}

/// Build the full Ramsey-echo sweep program.
///
/// For sweep index `i` with delay `d = i * dt`, one repetition is:
///
/// ```text
/// t = 0        phase reset (control), π/2
/// t = c + d/2  π                         (echo pulse)
/// t = 2c + d   π/2
/// t = 3c + d   phase reset (readout), readout pulse
///              sample window at 3c + d + latency
/// next repetition at 3c + d + readout_duration + wait_delay
/// ```
pub fn ramsey_echo_timeline(
    timing: &RamseyEchoTiming,
    pulses: RamseyEchoPulses,
    control_port: Port,
    readout_port: Port,
) -> TimelineResult<Timeline> {
    timing.validate()?;
    let c = timing.control_duration;
    let mut b = TimelineBuilder::new();
    for i in 0..timing.sweep.steps {
        let d = timing.sweep.delay(i);
        if d < 0.0 {
            return Err(TimelineError::NegativeDelay { index: i, delay: d });
        }
        b.reset_phase(control_port)?;
        // first pi/2 pulse
        b.output_pulse(pulses.control_pi2, control_port, c)?;
        b.advance(c)?;
        // first half of the swept delay
        b.advance(d / 2.0)?;
        // pi pulse, echo
        b.output_pulse(pulses.control_pi, control_port, c)?;
        b.advance(c)?;
        // second half of the swept delay
        b.advance(d / 2.0)?;
        // second pi/2 pulse
        b.output_pulse(pulses.control_pi2, control_port, c)?;
        b.advance(c)?;
        // readout starts right after the last control pulse
        b.reset_phase(readout_port)?;
        b.output_pulse(pulses.readout, readout_port, timing.readout_duration)?;
        b.store_at(b.at() + timing.readout_sample_delay)?;
        // move to the next sweep point
        b.advance(timing.readout_duration)?;
        b.advance(timing.wait_delay)?;
    }
    let timeline = b.finish();
    timeline.validate_no_overlap()?;
    Ok(timeline)
}

/// Period of sweep point `i` of the Ramsey-echo program:
/// `3c + d(i) + readout_duration + wait_delay`.
pub fn ramsey_echo_point_period(timing: &RamseyEchoTiming, i: usize) -> f64 {
    3.0 * timing.control_duration
        + timing.sweep.delay(i)
        + timing.readout_duration
        + timing.wait_delay
}

/// Durations and delays of the T1 (energy relaxation) sequence.
///
/// The delays are an explicit list rather than a linear sweep; scripts
/// usually pass `DelaySweep::delays()` but a hand-picked list works too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct T1Timing {
    /// Duration of the memory displacement pulse.
    pub memory_duration: f64,
    /// Duration of the conditional control (π) pulse.
    pub control_duration: f64,
    /// Duration of the readout pulse.
    pub readout_duration: f64,
    /// Latency between readout-pulse start and the sample window.
    pub readout_sample_delay: f64,
    /// Inter-repetition wait for the system to decay back to ground.
    pub wait_delay: f64,
    /// Swept idle delays, one per sweep point.
    pub delays: Vec<f64>,
}

impl T1Timing {
    fn validate(&self) -> TimelineResult<()> {
        check_duration(self.memory_duration)?;
        check_duration(self.control_duration)?;
        check_duration(self.readout_duration)?;
        check_interval("readout_sample_delay", self.readout_sample_delay)?;
        check_interval("wait_delay", self.wait_delay)?;
        if self.delays.is_empty() {
            return Err(TimelineError::EmptySweep);
        }
        Ok(())
    }
}

/// Pulse handles used by the T1 sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct T1Pulses {
    pub memory: PulseId,
    pub control: PulseId,
    pub readout: PulseId,
}

/// Output ports used by the T1 sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct T1Ports {
    pub memory: Port,
    pub control: Port,
    pub readout: Port,
}

/// Build the full T1 sweep program: displace the memory, idle for the
/// swept delay, apply the conditional π pulse, read out.
pub fn t1_timeline(
    timing: &T1Timing,
    pulses: T1Pulses,
    ports: T1Ports,
) -> TimelineResult<Timeline> {
    timing.validate()?;
    let mut b = TimelineBuilder::new();
    for (i, &delay) in timing.delays.iter().enumerate() {
        if delay < 0.0 {
            return Err(TimelineError::NegativeDelay { index: i, delay });
        }
        b.output_pulse(pulses.memory, ports.memory, timing.memory_duration)?;
        b.advance(timing.memory_duration)?;
        // swept idle delay
        b.advance(delay)?;
        // pi pulse conditioned on the memory still being in |0>
        b.output_pulse(pulses.control, ports.control, timing.control_duration)?;
        b.advance(timing.control_duration)?;
        b.output_pulse(pulses.readout, ports.readout, timing.readout_duration)?;
        b.store_at(b.at() + timing.readout_sample_delay)?;
        b.advance(timing.readout_duration)?;
        b.advance(timing.wait_delay)?;
    }
    let timeline = b.finish();
    timeline.validate_no_overlap()?;
    Ok(timeline)
}

/// Period of sweep point `i` of the T1 program:
/// `memory + d(i) + control + readout_duration + wait_delay`.
pub fn t1_point_period(timing: &T1Timing, i: usize) -> f64 {
    timing.memory_duration
        + timing.delays[i]
        + timing.control_duration
        + timing.readout_duration
        + timing.wait_delay
}
