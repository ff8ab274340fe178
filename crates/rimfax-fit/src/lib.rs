//! Result reduction and model fits.
//!
//! The acquisition returns a complex store buffer per sweep point. The
//! reduction pipeline is:
//!
//! 1. [`mean_response`] — average each sample window down to one complex
//!    number per sweep point.
//! 2. [`rotate_opt`] — one fixed linear phase rotation so the dominant
//!    variation lies on the real quadrature (best signal-to-noise in I).
//! 3. A model fit on the real part: [`fit_exp_decay`] for energy
//!    relaxation, [`fit_ramsey`] for the Gaussian-damped echo fringe.
//!
//! Fits run after the raw data is persisted, so a diverging fit is an
//! analysis error, never data loss.

mod error;
mod lm;
mod models;
mod rotate;

pub use error::{FitError, FitResult};
pub use lm::{LmOptions, levenberg_marquardt};
pub use models::{DecayFit, RamseyFit, fit_exp_decay, fit_ramsey};
pub use rotate::{mean_response, optimal_rotation, rotate_opt};
