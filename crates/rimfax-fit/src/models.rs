//! Decay models for the two pulsed experiments.

use std::f64::consts::TAU;

use tracing::debug;

use crate::error::{FitError, FitResult};
use crate::lm::{LmOptions, levenberg_marquardt};

/// Fitted exponential decay `y = xg + (xe - xg) * exp(-t / t1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayFit {
    /// Relaxation time in seconds.
    pub t1: f64,
    /// Response with the qubit excited (t = 0 extrapolation).
    pub excited: f64,
    /// Response with the qubit relaxed (long-time asymptote).
    pub ground: f64,
}

/// Fit the energy-relaxation decay to `(t, y)`.
///
/// Initial guesses follow the usual heuristics: T1 a quarter of the
/// sweep span, the endpoints as excited/ground levels.
pub fn fit_exp_decay(t: &[f64], y: &[f64]) -> FitResult<DecayFit> {
    if t.len() < 3 || y.len() < 3 {
        return Err(FitError::InsufficientData {
            needed: 3,
            got: t.len().min(y.len()),
        });
    }
    let span = t[t.len() - 1] - t[0];
    let t1_guess = (0.25 * span).max(1e-12);
    let p0 = [t1_guess, y[0], y[y.len() - 1]];

    let model = |ti: f64, p: &[f64]| {
        let t1 = p[0].abs().max(1e-15);
        p[2] + (p[1] - p[2]) * (-ti / t1).exp()
    };
    let p = levenberg_marquardt(model, t, y, &p0, &LmOptions::default())?;
    let fit = DecayFit {
        t1: p[0].abs(),
        excited: p[1],
        ground: p[2],
    };
    debug!("decay fit: T1 = {:.3} us", 1e6 * fit.t1);
    Ok(fit)
}

/// Fitted Gaussian-damped cosine
/// `y = offset + amplitude * exp(-(t / t2)^2) * cos(2 pi f t + phase)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RamseyFit {
    /// Coherence time in seconds.
    pub t2: f64,
    /// Fringe frequency in Hz (drive detuning).
    pub frequency: f64,
    /// Fringe phase in radians.
    pub phase: f64,
    /// Fringe amplitude.
    pub amplitude: f64,
    /// Response offset.
    pub offset: f64,
}

/// Fit the Ramsey fringe to `(t, y)`.
///
/// The fringe frequency is seeded from a coarse periodogram over the
/// resolvable band, then everything is refined together.
pub fn fit_ramsey(t: &[f64], y: &[f64]) -> FitResult<RamseyFit> {
    let n = t.len().min(y.len());
    if n < 6 {
        return Err(FitError::InsufficientData { needed: 6, got: n });
    }
    let span = t[n - 1] - t[0];
    if !(span > 0.0) {
        return Err(FitError::InsufficientData { needed: 6, got: 1 });
    }

    let offset = y.iter().sum::<f64>() / n as f64;
    let (min, max) = y
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let amplitude = 0.5 * (max - min);

    // coarse periodogram: candidate fringe frequencies k / span
    let mut best = (0.0, 0.0, 0.0f64); // (freq, phase, power)
    for k in 1..=(n / 2) {
        let freq = k as f64 / span;
        let (mut re, mut im) = (0.0, 0.0);
        for i in 0..n {
            let angle = TAU * freq * t[i];
            re += (y[i] - offset) * angle.cos();
            im -= (y[i] - offset) * angle.sin();
        }
        let power = re * re + im * im;
        if power > best.2 {
            best = (freq, im.atan2(re), power);
        }
    }
    let (freq_guess, phase_guess, _) = best;

    let p0 = [0.5 * span, freq_guess, phase_guess, amplitude, offset];
    let model = |ti: f64, p: &[f64]| {
        let t2 = p[0].abs().max(1e-15);
        let damp = (-(ti / t2) * (ti / t2)).exp();
        p[4] + p[3] * damp * (TAU * p[1] * ti + p[2]).cos()
    };
    let p = levenberg_marquardt(model, &t[..n], &y[..n], &p0, &LmOptions::default())?;
    let fit = RamseyFit {
        t2: p[0].abs(),
        frequency: p[1],
        phase: p[2],
        amplitude: p[3],
        offset: p[4],
    };
    debug!(
        "ramsey fit: T2 = {:.3} us, detuning = {:.3} kHz",
        1e6 * fit.t2,
        1e-3 * fit.frequency
    );
    Ok(fit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_recovery() {
        let t1 = 25e-6;
        let t: Vec<f64> = (0..128).map(|i| i as f64 * 1e-6).collect();
        let y: Vec<f64> = t.iter().map(|&ti| 0.1 + 0.9 * (-ti / t1).exp()).collect();
        let fit = fit_exp_decay(&t, &y).unwrap();
        assert!((fit.t1 - t1).abs() / t1 < 1e-4);
        assert!((fit.excited - 1.0).abs() < 1e-4);
        assert!((fit.ground - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_decay_insufficient_data() {
        let err = fit_exp_decay(&[0.0, 1.0], &[1.0, 0.5]).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { .. }));
    }

    #[test]
    fn test_ramsey_recovery() {
        let t2 = 20e-6;
        let freq = 50e3;
        let phase = 0.3;
        let t: Vec<f64> = (0..200).map(|i| i as f64 * 0.2e-6).collect();
        let y: Vec<f64> = t
            .iter()
            .map(|&ti| {
                0.1 + 0.8 * (-(ti / t2) * (ti / t2)).exp() * (TAU * freq * ti + phase).cos()
            })
            .collect();
        let fit = fit_ramsey(&t, &y).unwrap();
        assert!((fit.t2 - t2).abs() / t2 < 0.02, "t2 = {}", fit.t2);
        assert!(
            (fit.frequency - freq).abs() / freq < 0.02,
            "freq = {}",
            fit.frequency
        );
        assert!((fit.amplitude - 0.8).abs() < 0.05);
        assert!((fit.offset - 0.1).abs() < 0.01);
    }

    #[test]
    fn test_ramsey_insufficient_data() {
        let err = fit_ramsey(&[0.0; 4], &[0.0; 4]).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { .. }));
    }
}
