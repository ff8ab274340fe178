//! Linear delay sweeps.

use serde::{Deserialize, Serialize};

use crate::error::{TimelineError, TimelineResult};

/// A linear sweep of an inter-pulse delay: `delay(i) = i * dt`.
///
/// Index 0 always yields delay 0, the minimum-delay calibration point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelaySweep {
    /// Number of sweep points.
    pub steps: usize,
    /// Step size in seconds.
    pub dt: f64,
}

impl DelaySweep {
    /// Create a sweep, rejecting empty or backwards sweeps.
    pub fn new(steps: usize, dt: f64) -> TimelineResult<Self> {
        if steps == 0 {
            return Err(TimelineError::EmptySweep);
        }
        if dt < 0.0 {
            return Err(TimelineError::NegativeInterval {
                name: "delay step",
                value: dt,
            });
        }
        Ok(Self { steps, dt })
    }

    /// Delay at sweep index `i`.
    pub fn delay(&self, i: usize) -> f64 {
        i as f64 * self.dt
    }

    /// The largest delay in the sweep.
    pub fn max_delay(&self) -> f64 {
        self.delay(self.steps - 1)
    }

    /// All delays in sweep order.
    pub fn delays(&self) -> Vec<f64> {
        (0..self.steps).map(|i| self.delay(i)).collect()
    }
}
