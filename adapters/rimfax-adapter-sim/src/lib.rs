//! Local instrument simulator.
//!
//! A stand-in for the real signal-generation/acquisition hardware, for
//! development and tests on machines without lab access. It implements
//! both HAL traits:
//!
//! - [`SimPulsed`] replays a programmed pulse timeline against a small
//!   two-level-system model and synthesizes the averaged store buffer a
//!   run would produce.
//! - [`SimLockin`] synthesizes a power-broadened two-tone spectroscopy
//!   response for the continuous-wave mode.
//!
//! The simulator is deterministic under a fixed noise seed and enforces
//! the same range checks real hardware would: out-of-range scales,
//! currents and frequencies are rejected, not clamped.
//!
//! # Example
//!
//! ```ignore
//! use rimfax_adapter_sim::SimPulsed;
//! use rimfax_hal::{InstrumentConfig, PulsedInstrument};
//!
//! let config = InstrumentConfig::new("sim");
//! let mut pls = SimPulsed::connect(&config)?;
//! let readout = pls.setup_long_drive(Port(1), 2e-6, Complex64::new(1.0, 1.0))?;
//! // ... program a timeline, run, read back store_data()
//! ```

mod lockin;
mod pulsed;
mod qubit;

pub use lockin::{ResonanceModel, SimLockin};
pub use pulsed::SimPulsed;
pub use qubit::QubitModel;
