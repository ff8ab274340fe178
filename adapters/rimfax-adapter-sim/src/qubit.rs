//! The simulated two-level system.

use num_complex::Complex64;

/// Coherence and readout parameters of the simulated qubit.
///
/// The pulsed simulator reduces every repetition to the total idle gap
/// between its control-type pulses and maps it to an excited-state
/// weight: `exp(-gap/t1)` for relaxation-style sequences,
/// `(1 + exp(-(gap/t2)^2) cos(2 pi detuning gap)) / 2` for echo-style
/// sequences with three control pulses. The detuning imprints a fringe
/// so analysis code has a frequency to recover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QubitModel {
    /// Energy-relaxation time in seconds.
    pub t1: f64,
    /// Echo coherence time in seconds.
    pub t2: f64,
    /// Effective drive detuning in Hz.
    pub detuning: f64,
    /// Demodulated readout response with the qubit in the ground state.
    pub ground: Complex64,
    /// Demodulated readout response with the qubit excited.
    pub excited: Complex64,
    /// RMS noise per sample, in full-scale units, before averaging.
    pub noise: f64,
}

impl Default for QubitModel {
    fn default() -> Self {
        Self {
            t1: 30e-6,
            t2: 15e-6,
            detuning: 50e3,
            ground: Complex64::new(2.5e-3, -1.0e-3),
            excited: Complex64::new(1.0e-3, 1.5e-3),
            noise: 5e-3,
        }
    }
}

impl QubitModel {
    /// Excited-state weight after a relaxation-style repetition.
    pub(crate) fn relaxation_weight(&self, gap: f64) -> f64 {
        (-gap / self.t1).exp()
    }

    /// Excited-state weight after an echo-style repetition.
    pub(crate) fn echo_weight(&self, gap: f64) -> f64 {
        let damp = (-(gap / self.t2) * (gap / self.t2)).exp();
        0.5 * (1.0 + damp * (std::f64::consts::TAU * self.detuning * gap).cos())
    }

    /// Readout response for an excited-state weight `x`.
    pub(crate) fn response(&self, x: f64) -> Complex64 {
        self.ground + (self.excited - self.ground) * x
    }
}
