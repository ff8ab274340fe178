//! Instrument hardware-abstraction layer.
//!
//! The [`PulsedInstrument`] trait defines the capability set a pulsed
//! measurement consumes:
//!
//! ```text
//!   connect ──→ configure ──→ define pulses ──→ program ──→ run ──→ read back ──→ shutdown
//!                (mixers,       (templates,      (timeline)  (blocks)  (store data)
//!                 LUTs, knobs)   long drives)
//! ```
//!
//! ## Design principles
//!
//! - **Strictly sequential**: one connection, one thread, blocking `run`.
//!   There is nothing to await and nothing to cancel short of killing the
//!   process, so every method is synchronous.
//! - **Fatal errors**: a connection drop or an out-of-range setting is a
//!   physical-instrument fault. Nothing here retries; silent retry of a
//!   single-shot physical measurement would poison the averages.
//! - **Scoped connection**: [`Session`] guarantees the shutdown path
//!   (outputs muted, bias lines zeroed) on every exit, including panics
//!   and early `?` returns. Hardware left driven after an aborted run is
//!   a safety and calibration hazard.
//!
//! [`LockinInstrument`] is the continuous-wave sibling used by two-tone
//! spectroscopy: per-port frequency/scale/phase settings and DMA capture
//! instead of a timed program.

mod config;
mod error;
mod instrument;
mod session;
pub mod waveform;

pub use config::InstrumentConfig;
pub use error::{HalError, HalResult};
pub use instrument::{
    Converter, LockinInstrument, MixerConfig, PulsedInstrument, Shutdown, StoreData,
};
pub use session::Session;
