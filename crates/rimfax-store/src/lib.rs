//! Self-describing persisted records for measurement runs.
//!
//! One run produces one [`Record`]: a verbatim snapshot of the generating
//! program's source, a scalar attribute for every experiment parameter,
//! and the named result arrays (time axis, complex result buffer). The
//! whole thing is a single JSON container.
//!
//! # Round-trip contract
//!
//! Loading a record must reconstruct an object able to re-run analysis
//! without re-acquiring data — so every parameter that affects timeline
//! construction or physical calibration is persisted. Writing happens
//! before any fitting: a diverging fit can never corrupt raw data.

mod error;
mod record;

pub use error::{StoreError, StoreResult};
pub use record::{ArrayData, AttrValue, Record};
