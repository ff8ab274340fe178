//! Energy-relaxation (T1) measurement script.
//!
//! Standalone, no command-line arguments: configuration is the block of
//! constants below. The raw data is persisted before any fitting.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::Path;

use anyhow::bail;
use tracing_subscriber::EnvFilter;

use rimfax_adapter_sim::SimPulsed;
use rimfax_experiments::t1_memory_coherent::{T1MemoryCoherent, T1MemoryCoherentParams};
use rimfax_experiments::{print_header, print_result, print_section, print_success};
use rimfax_hal::InstrumentConfig;
use rimfax_timeline::Port;

const WHICH_QUBIT: u8 = 2; // 1 (higher resonator) or 2 (lower resonator)

// instrument address; the simulator backend accepts anything non-empty
const ADDRESS: &str = "192.0.2.53";
const PORT: u16 = 42874;
const EXT_REF_CLK: bool = false;

// cavity drive: readout
const READOUT_AMP: f64 = 0.1; // FS
const READOUT_DURATION: f64 = 2e-6; // s
const READOUT_PORT: u8 = 1;

// memory drive: displacement
const MEMORY_FREQ: f64 = 4.2e9; // Hz
const MEMORY_AMP: f64 = 0.3; // FS
const MEMORY_DURATION: f64 = 1e-6; // s
const MEMORY_PORT: u8 = 5;

// qubit drive: conditional pi pulse
const CONTROL_DURATION: f64 = 100e-9; // s

// cavity readout: sample
const SAMPLE_DURATION: f64 = 4e-6; // s
const SAMPLE_PORT: u8 = 1;

// T1 sweep
const NUM_AVERAGES: u32 = 10_000;
const NR_DELAYS: usize = 64;
const DT_DELAYS: f64 = 2e-6; // s, delay step size
const WAIT_DELAY: f64 = 200e-6; // s, decay between repetitions
const READOUT_SAMPLE_DELAY: f64 = 290e-9; // s

const DATA_DIR: &str = "data";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // per-qubit calibration
    let (readout_freq, control_freq, control_amp, control_port) = match WHICH_QUBIT {
        1 => (6.166_600e9, 3.557_866e9, 0.102_58, 3u8),
        2 => (6.028_450e9, 4.093_372e9, 0.761_7, 4u8),
        other => bail!("invalid qubit selector {other}: expected 1 or 2"),
    };

    print_header("T1 energy relaxation");
    print_section("Setup");
    print_result("Qubit", WHICH_QUBIT);
    print_result("Control frequency", format!("{:.6} GHz", control_freq / 1e9));
    print_result("Delay steps", NR_DELAYS);
    print_result(
        "Max delay",
        format!("{:.1} µs", (NR_DELAYS - 1) as f64 * DT_DELAYS * 1e6),
    );

    let params = T1MemoryCoherentParams {
        readout_freq,
        control_freq,
        memory_freq: MEMORY_FREQ,
        readout_amp: READOUT_AMP,
        control_amp,
        memory_amp: MEMORY_AMP,
        readout_duration: READOUT_DURATION,
        control_duration: CONTROL_DURATION,
        memory_duration: MEMORY_DURATION,
        sample_duration: SAMPLE_DURATION,
        delay_arr: (0..NR_DELAYS).map(|i| i as f64 * DT_DELAYS).collect(),
        readout_port: Port(READOUT_PORT),
        control_port: Port(control_port),
        memory_port: Port(MEMORY_PORT),
        sample_port: Port(SAMPLE_PORT),
        wait_delay: WAIT_DELAY,
        readout_sample_delay: READOUT_SAMPLE_DELAY,
        num_averages: NUM_AVERAGES,
    };

    let config = InstrumentConfig::new(ADDRESS)
        .with_port(PORT)
        .with_ext_ref_clk(EXT_REF_CLK);
    let instrument = SimPulsed::connect(&config)?;

    print_section("Measurement");
    let mut exp = T1MemoryCoherent::new(params);
    exp.run(instrument)?;

    let path = exp.save(Path::new(DATA_DIR), include_str!("t1_memory_coherent.rs"))?;
    print_result("Data saved to", path.display());

    print_section("Analysis");
    let fit = exp.analyze()?;
    print_result("T1", format!("{:.2} µs", fit.t1 * 1e6));

    println!();
    print_success("T1 measurement complete");
    Ok(())
}
