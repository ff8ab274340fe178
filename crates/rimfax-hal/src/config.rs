//! Instrument connection configuration.

use serde::{Deserialize, Serialize};

/// Where and how to reach the instrument.
///
/// Everything beyond the transport endpoint (mixer frequencies, pulse
/// amplitudes, ...) belongs to the experiment parameters, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// IP address or hostname.
    pub address: String,
    /// TCP port of the control interface.
    pub port: u16,
    /// Lock to an external reference clock instead of the internal one.
    pub ext_ref_clk: bool,
}

impl InstrumentConfig {
    /// Configuration for the default control port on `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port: 42874,
            ext_ref_clk: false,
        }
    }

    /// Set the TCP port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Lock to an external reference clock.
    pub fn with_ext_ref_clk(mut self, ext_ref_clk: bool) -> Self {
        self.ext_ref_clk = ext_ref_clk;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let cfg = InstrumentConfig::new("192.0.2.53")
            .with_port(4000)
            .with_ext_ref_clk(true);
        assert_eq!(cfg.address, "192.0.2.53");
        assert_eq!(cfg.port, 4000);
        assert!(cfg.ext_ref_clk);
    }
}
