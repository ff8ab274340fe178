//! Measurement procedures.
//!
//! Each experiment is a plain struct holding its full parameter set plus
//! the acquired data, with the same four-method surface:
//!
//! - `run(instrument)` — configure, build the pulse program, execute and
//!   read back, releasing the instrument through a [`Session`] guard.
//! - `save(dir, source)` / `load(path)` — persist every parameter and the
//!   raw result arrays as one self-describing record, before any fitting.
//! - `analyze()` — reduce the raw buffers and fit the relevant model.
//!
//! The matching standalone scripts live under `bin/`; they hold their
//! configuration as constants at the top of the file and take no
//! command-line arguments.
//!
//! [`Session`]: rimfax_hal::Session

pub mod ramsey_echo;
pub mod t1_memory_coherent;
pub mod two_tone_power;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

pub use ramsey_echo::RamseyEcho;
pub use t1_memory_coherent::T1MemoryCoherent;
pub use two_tone_power::TwoTonePower;

/// Anything a measurement procedure can fail with.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExperimentError {
    #[error("timeline error: {0}")]
    Timeline(#[from] rimfax_timeline::TimelineError),

    #[error("instrument error: {0}")]
    Hal(#[from] rimfax_hal::HalError),

    #[error("storage error: {0}")]
    Store(#[from] rimfax_store::StoreError),

    #[error("fit error: {0}")]
    Fit(#[from] rimfax_fit::FitError),

    #[error("no acquired data: run the experiment or load a record first")]
    NoData,
}

/// Shorthand for results of experiment operations.
pub type ExperimentResult<T> = Result<T, ExperimentError>;

/// Progress bar with ETA for long sweeps.
pub fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} (eta {eta}) {msg}",
        )
        .unwrap()
        .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}

/// Print a script header.
pub fn print_header(title: &str) {
    println!();
    println!("{}", style("═".repeat(60)).cyan());
    println!("{}", style(format!("  {title}")).cyan().bold());
    println!("{}", style("═".repeat(60)).cyan());
    println!();
}

/// Print a script section.
pub fn print_section(title: &str) {
    println!();
    println!("{}", style(format!("▶ {title}")).green().bold());
    println!("{}", style("─".repeat(40)).dim());
}

/// Print a result line.
pub fn print_result(label: &str, value: impl std::fmt::Display) {
    println!("  {} {}", style(format!("{label}:")).dim(), value);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}
