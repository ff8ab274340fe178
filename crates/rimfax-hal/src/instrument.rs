//! Instrument capability traits.

use std::time::Duration;

use ndarray::{Array1, Array3};
use num_complex::Complex64;

use rimfax_timeline::{Event, Port, PulseId, Timeline};

use crate::error::HalResult;

/// Which data-converter clock a sample rate refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    Adc,
    Dac,
}

/// Up/down-conversion setup for one output port, optionally paired with
/// an input port that shares the same carrier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixerConfig {
    /// Carrier frequency in Hz.
    pub freq: f64,
    /// Input port down-converted with the same carrier, if any.
    pub in_port: Option<Port>,
    /// Output port to up-convert.
    pub out_port: Port,
    /// Synchronize all mixer settings after this call. Scripts configuring
    /// several mixers set this only on the last one.
    pub sync: bool,
}

impl MixerConfig {
    /// Output-only mixer at `freq`, synchronized immediately.
    pub fn output(freq: f64, out_port: Port) -> Self {
        Self {
            freq,
            in_port: None,
            out_port,
            sync: true,
        }
    }

    /// Pair an input port to the same carrier.
    pub fn with_input(mut self, in_port: Port) -> Self {
        self.in_port = Some(in_port);
        self
    }

    /// Defer synchronization to a later mixer call.
    pub fn deferred(mut self) -> Self {
        self.sync = false;
        self
    }
}

/// Acquired data for one run.
///
/// `store_arr` is indexed by (sweep point, repetition, time sample);
/// `t_arr` is the time axis of one sample window, shared by all windows.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreData {
    pub t_arr: Array1<f64>,
    pub store_arr: Array3<Complex64>,
}

/// Release hardware into a safe state: outputs muted, bias lines zeroed.
///
/// Split out of the instrument traits so [`Session`](crate::Session) can
/// guard any of them.
pub trait Shutdown {
    fn shutdown(&mut self) -> HalResult<()>;
}

/// A pulsed signal-generation/acquisition instrument.
///
/// # Contract
///
/// - Configuration calls precede pulse definitions; pulse definitions
///   precede [`program`](PulsedInstrument::program); `run` blocks until
///   the acquisition has finished; `store_data` is valid only after a
///   completed run.
/// - Implementations MUST reject out-of-range scales, currents and
///   frequencies with [`HalError::OutOfRange`](crate::HalError::OutOfRange)
///   instead of clamping: a silently clamped amplitude is a miscalibrated
///   measurement.
pub trait PulsedInstrument: Shutdown {
    /// Sample rate of the given converter in S/s.
    fn sample_rate(&self, converter: Converter) -> f64;

    /// Attenuation of the acquisition path on an input port, in dB.
    fn set_adc_attenuation(&mut self, port: Port, attenuation: f64) -> HalResult<()>;

    /// Full-scale DAC output current on an output port, in µA.
    fn set_dac_current(&mut self, port: Port, current: u32) -> HalResult<()>;

    /// Inverse-sinc compensation filter order on an output port.
    fn set_inv_sinc(&mut self, port: Port, order: u8) -> HalResult<()>;

    /// Configure up/down-conversion for one port pair.
    fn configure_mixer(&mut self, config: MixerConfig) -> HalResult<()>;

    /// Program the intermediate-frequency lookup table of an output port.
    /// `phases` and `phases_q` are the I and Q carrier phases in radians.
    fn setup_freq_lut(
        &mut self,
        port: Port,
        frequencies: &[f64],
        phases: &[f64],
        phases_q: &[f64],
    ) -> HalResult<()>;

    /// Program the amplitude-scale lookup table of an output port.
    /// Scales are in full-scale units, |scale| <= 1.
    fn setup_scale_lut(&mut self, port: Port, scales: &[f64]) -> HalResult<()>;

    /// Define a square pulse of `duration` seconds with a flat complex
    /// amplitude. Returns the handle to schedule it with.
    fn setup_long_drive(
        &mut self,
        port: Port,
        duration: f64,
        amplitude: Complex64,
    ) -> HalResult<PulseId>;

    /// Define an arbitrary-envelope pulse from DAC-rate samples.
    fn setup_template(&mut self, port: Port, envelope: &[Complex64]) -> HalResult<PulseId>;

    /// Select the input ports digitized during each sample window.
    fn set_store_ports(&mut self, ports: &[Port]) -> HalResult<()>;

    /// Length of each sample window in seconds.
    fn set_store_duration(&mut self, duration: f64) -> HalResult<()>;

    /// Schedule one timed event into the hardware program buffer.
    fn schedule(&mut self, event: &Event) -> HalResult<()>;

    /// Schedule a whole timeline, in order.
    fn program(&mut self, timeline: &Timeline) -> HalResult<()> {
        for event in timeline.events() {
            self.schedule(event)?;
        }
        Ok(())
    }

    /// Execute the program and block until acquisition completes.
    /// The program of length `period` runs `repeat_count` times and the
    /// whole thing is averaged `num_averages` times.
    fn run(&mut self, period: f64, repeat_count: u32, num_averages: u32) -> HalResult<()>;

    /// Read back the averaged sample windows of the last run.
    fn store_data(&self) -> HalResult<StoreData>;
}

/// A continuous-wave lock-in style instrument, used for two-tone
/// spectroscopy. No timed program: tones run freely and the response is
/// DMA-captured from one input port.
pub trait LockinInstrument: Shutdown {
    /// ADC sample rate in S/s.
    fn sample_rate(&self) -> f64;

    /// Configure up/down-conversion for one port pair.
    fn configure_mixer(&mut self, config: MixerConfig) -> HalResult<()>;

    /// Intermediate-frequency offset of an output port, in Hz.
    fn set_frequency(&mut self, port: Port, freq: f64) -> HalResult<()>;

    /// I and Q output scales in full-scale units, |scale| <= 1.
    fn set_scale(&mut self, port: Port, scale_i: f64, scale_q: f64) -> HalResult<()>;

    /// I and Q carrier phases in radians.
    fn set_phase(&mut self, port: Port, phase_i: f64, phase_q: f64) -> HalResult<()>;

    /// Enable output dithering on a port.
    fn set_dither(&mut self, port: Port, enable: bool) -> HalResult<()>;

    /// Select the input port feeding the DMA stream.
    fn set_dma_source(&mut self, port: Port) -> HalResult<()>;

    /// Start or halt the outputs.
    fn set_run(&mut self, run: bool) -> HalResult<()>;

    /// Wait on the instrument clock, e.g. for a retuned mixer to settle.
    fn settle(&mut self, duration: Duration) -> HalResult<()>;

    /// Arm DMA capture of `num_samples` complex samples.
    fn start_dma(&mut self, num_samples: usize) -> HalResult<()>;

    /// Block until the armed capture has filled.
    fn wait_for_dma(&mut self) -> HalResult<()>;

    /// Disarm DMA capture.
    fn stop_dma(&mut self) -> HalResult<()>;

    /// Read the captured samples, normalized to full scale.
    fn dma_data(&mut self, num_samples: usize) -> HalResult<Vec<Complex64>>;
}
