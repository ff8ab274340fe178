//! Ramsey echo measurement script.
//!
//! Standalone, no command-line arguments: configuration is the block of
//! constants below. The raw data is persisted before any fitting.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::Path;

use anyhow::bail;
use tracing_subscriber::EnvFilter;

use rimfax_adapter_sim::SimPulsed;
use rimfax_experiments::ramsey_echo::{RamseyEcho, RamseyEchoParams};
use rimfax_experiments::{print_header, print_result, print_section, print_success};
use rimfax_hal::InstrumentConfig;
use rimfax_timeline::Port;

const WHICH_QUBIT: u8 = 2; // 1 (higher resonator) or 2 (lower resonator)

// instrument address; the simulator backend accepts anything non-empty
const ADDRESS: &str = "192.0.2.53";
const PORT: u16 = 42874;
const EXT_REF_CLK: bool = false; // lock to an external reference clock

// cavity drive: readout
const READOUT_AMP: f64 = 0.1; // FS
const READOUT_DURATION: f64 = 2e-6; // s
const READOUT_PORT: u8 = 1;

// qubit drive: control
const CONTROL_IF: f64 = 0.0; // Hz
const CONTROL_DURATION: f64 = 20e-9; // s

// cavity readout: sample
const SAMPLE_DURATION: f64 = 4e-6; // s
const SAMPLE_PORT: u8 = 1;

// Ramsey sweep
const NUM_AVERAGES: u32 = 10_000;
const NR_DELAYS: usize = 256; // steps of the swept delay
const DT_DELAYS: f64 = 0.4e-6; // s, delay step size
const WAIT_DELAY: f64 = 200e-6; // s, qubit decay between repetitions
const READOUT_SAMPLE_DELAY: f64 = 290e-9; // s, readout-to-sample latency

const DATA_DIR: &str = "data";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // per-qubit calibration
    let (readout_freq, control_freq, control_amp_90, control_amp_180, control_port) =
        match WHICH_QUBIT {
            1 => (6.166_600e9, 3.557_866e9, 0.051_29, 0.102_58, 3u8),
            2 => (6.028_450e9, 4.093_372e9, 0.380_8, 0.761_7, 4u8),
            other => bail!("invalid qubit selector {other}: expected 1 or 2"),
        };

    print_header("Ramsey echo");
    print_section("Setup");
    print_result("Qubit", WHICH_QUBIT);
    print_result("Control frequency", format!("{:.6} GHz", control_freq / 1e9));
    print_result("Readout frequency", format!("{:.6} GHz", readout_freq / 1e9));
    print_result("Delay steps", NR_DELAYS);
    print_result(
        "Max delay",
        format!("{:.1} µs", (NR_DELAYS - 1) as f64 * DT_DELAYS * 1e6),
    );

    let params = RamseyEchoParams {
        readout_freq,
        control_freq,
        control_if: CONTROL_IF,
        readout_amp: READOUT_AMP,
        control_amp_90,
        control_amp_180,
        readout_duration: READOUT_DURATION,
        control_duration: CONTROL_DURATION,
        sample_duration: SAMPLE_DURATION,
        readout_port: Port(READOUT_PORT),
        control_port: Port(control_port),
        sample_port: Port(SAMPLE_PORT),
        nr_delays: NR_DELAYS,
        dt_delays: DT_DELAYS,
        wait_delay: WAIT_DELAY,
        readout_sample_delay: READOUT_SAMPLE_DELAY,
        num_averages: NUM_AVERAGES,
    };

    let config = InstrumentConfig::new(ADDRESS)
        .with_port(PORT)
        .with_ext_ref_clk(EXT_REF_CLK);
    let instrument = SimPulsed::connect(&config)?;

    print_section("Measurement");
    let mut exp = RamseyEcho::new(params);
    exp.run(instrument)?;

    let path = exp.save(Path::new(DATA_DIR), include_str!("ramsey_echo.rs"))?;
    print_result("Data saved to", path.display());

    print_section("Analysis");
    let fit = exp.analyze()?;
    print_result("T2 echo", format!("{:.2} µs", fit.t2 * 1e6));
    print_result(
        "Fringe frequency",
        format!("{:.1} kHz", fit.frequency / 1e3),
    );

    println!();
    print_success("Ramsey echo complete");
    Ok(())
}
