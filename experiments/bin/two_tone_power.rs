//! Two-tone spectroscopy script: 2-D sweep of pump power and frequency
//! with a fixed probe on the cavity.
//!
//! Standalone, no command-line arguments: configuration is the block of
//! constants below.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::Path;

use anyhow::bail;
use tracing_subscriber::EnvFilter;

use rimfax_adapter_sim::SimLockin;
use rimfax_experiments::two_tone_power::{TwoTonePower, TwoTonePowerParams};
use rimfax_experiments::{print_header, print_result, print_section, print_success};
use rimfax_hal::InstrumentConfig;
use rimfax_timeline::Port;

const WHICH_QUBIT: u8 = 2; // 1 (higher resonator) or 2 (lower resonator)

// instrument address; the simulator backend accepts anything non-empty
const ADDRESS: &str = "192.0.2.53";
const EXT_REF_CLK: bool = false;

const SPAN: f64 = 500e6; // Hz, pump frequency sweep span
const DF: f64 = 1e6; // Hz, measurement bandwidth per sweep point

const CAVITY_AMP: f64 = 0.1; // FS, fixed probe amplitude
const NR_AMPS: usize = 61; // pump amplitudes, log-spaced 1e-3 .. 1 FS

const CAVITY_PORT: u8 = 1;
const QUBIT_PORT: u8 = 5;
const INPUT_PORT: u8 = 1;
const DITHER: bool = true;
const EXTRA: usize = 500; // discarded lead-in samples per capture
const NUM_AVERAGES: usize = 100;

const DATA_DIR: &str = "data";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // per-qubit sweep center and probe frequency
    let (center_freq, cavity_freq) = match WHICH_QUBIT {
        1 => (3.56e9, 6.213_095e9),
        2 => (4.0e9, 6.028_450e9),
        other => bail!("invalid qubit selector {other}: expected 1 or 2"),
    };

    print_header("Two-tone power sweep");
    print_section("Setup");
    print_result("Qubit", WHICH_QUBIT);
    print_result("Sweep center", format!("{:.3} GHz", center_freq / 1e9));
    print_result("Span", format!("{:.0} MHz", SPAN / 1e6));
    print_result("Pump amplitudes", NR_AMPS);

    let params = TwoTonePowerParams {
        center_freq,
        span: SPAN,
        df: DF,
        cavity_freq,
        cavity_amp: CAVITY_AMP,
        nr_amps: NR_AMPS,
        cavity_port: Port(CAVITY_PORT),
        qubit_port: Port(QUBIT_PORT),
        input_port: Port(INPUT_PORT),
        dither: DITHER,
        extra: EXTRA,
        num_averages: NUM_AVERAGES,
    };

    let config = InstrumentConfig::new(ADDRESS).with_ext_ref_clk(EXT_REF_CLK);
    let instrument = SimLockin::connect(&config)?;

    print_section("Measurement");
    let mut exp = TwoTonePower::new(params);
    exp.run(instrument)?;

    let path = exp.save(Path::new(DATA_DIR), include_str!("two_tone_power.rs"))?;
    print_result("Data saved to", path.display());

    print_section("Analysis");
    let qubit_freq = exp.analyze()?;
    print_result(
        "Low-power dip",
        format!("{:.6} GHz", qubit_freq / 1e9),
    );

    println!();
    print_success("Two-tone power sweep complete");
    Ok(())
}
