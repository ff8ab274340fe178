//! Continuous-wave (lock-in) mode simulator.

use std::collections::BTreeMap;
use std::time::Duration;

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use rimfax_hal::{HalError, HalResult, InstrumentConfig, LockinInstrument, MixerConfig, Shutdown};
use rimfax_timeline::Port;

const NUM_PORTS: u8 = 8;
const ADC_SAMPLE_RATE: f64 = 1e9;
const MAX_MIXER_FREQ: f64 = 10e9;

/// The simulated qubit resonance probed by two-tone spectroscopy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResonanceModel {
    /// Qubit transition frequency in Hz.
    pub qubit_freq: f64,
    /// Bare linewidth in Hz.
    pub linewidth: f64,
    /// Pump amplitude at which power broadening doubles the linewidth.
    pub saturation: f64,
    /// Fractional dip depth of the probe response on resonance.
    pub contrast: f64,
    /// RMS noise per captured sample, in full-scale units.
    pub noise: f64,
}

impl Default for ResonanceModel {
    fn default() -> Self {
        Self {
            qubit_freq: 4.0e9,
            linewidth: 2e6,
            saturation: 0.05,
            contrast: 0.6,
            noise: 2e-3,
        }
    }
}

impl ResonanceModel {
    /// Probe transmission factor for a pump at `freq` with `amp`.
    fn transmission(&self, freq: f64, amp: f64) -> f64 {
        let broadened = self.linewidth * (1.0 + (amp / self.saturation).powi(2)).sqrt();
        let detune = (freq - self.qubit_freq) / broadened;
        1.0 - self.contrast / (1.0 + detune * detune)
    }
}

/// Simulated continuous-wave instrument for two-tone spectroscopy.
///
/// The probe port is the output whose mixer is paired with the DMA input
/// port; any output-only mixer is treated as the pump.
#[derive(Debug)]
pub struct SimLockin {
    resonance: ResonanceModel,
    mixer_freqs: BTreeMap<Port, f64>,
    scales: BTreeMap<Port, (f64, f64)>,
    probe_port: Option<Port>,
    pump_port: Option<Port>,
    dma_source: Option<Port>,
    running: bool,
    armed: Option<usize>,
    captured: Option<Vec<Complex64>>,
    rng: StdRng,
    muted: bool,
}

fn check_port(port: Port) -> HalResult<()> {
    if port.0 == 0 || port.0 > NUM_PORTS {
        return Err(HalError::InvalidPort(port));
    }
    Ok(())
}

fn check_scale(what: &'static str, value: f64) -> HalResult<()> {
    if !(-1.0..=1.0).contains(&value) {
        return Err(HalError::OutOfRange {
            what,
            value,
            min: -1.0,
            max: 1.0,
        });
    }
    Ok(())
}

impl SimLockin {
    /// "Connect" to the simulator.
    pub fn connect(config: &InstrumentConfig) -> HalResult<Self> {
        if config.address.is_empty() {
            return Err(HalError::ConnectionFailed(
                "no instrument address given".into(),
            ));
        }
        info!(
            "simulated lock-in instrument at {}:{}",
            config.address, config.port
        );
        Ok(Self {
            resonance: ResonanceModel::default(),
            mixer_freqs: BTreeMap::new(),
            scales: BTreeMap::new(),
            probe_port: None,
            pump_port: None,
            dma_source: None,
            running: false,
            armed: None,
            captured: None,
            rng: StdRng::seed_from_u64(0x5eed),
            muted: false,
        })
    }

    /// Replace the simulated resonance.
    pub fn with_resonance(mut self, resonance: ResonanceModel) -> Self {
        self.resonance = resonance;
        self
    }

    /// Reseed the noise generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Whether the outputs have been muted by a shutdown.
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn gauss(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        let u2: f64 = self.rng.gen_range(0.0..1.0);
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

impl Shutdown for SimLockin {
    fn shutdown(&mut self) -> HalResult<()> {
        self.running = false;
        self.muted = true;
        for scale in self.scales.values_mut() {
            *scale = (0.0, 0.0);
        }
        info!("simulated instrument shut down: outputs muted, bias zeroed");
        Ok(())
    }
}

impl LockinInstrument for SimLockin {
    fn sample_rate(&self) -> f64 {
        ADC_SAMPLE_RATE
    }

    fn configure_mixer(&mut self, config: MixerConfig) -> HalResult<()> {
        check_port(config.out_port)?;
        if !(0.0..=MAX_MIXER_FREQ).contains(&config.freq) {
            return Err(HalError::OutOfRange {
                what: "mixer frequency",
                value: config.freq,
                min: 0.0,
                max: MAX_MIXER_FREQ,
            });
        }
        self.mixer_freqs.insert(config.out_port, config.freq);
        if let Some(in_port) = config.in_port {
            check_port(in_port)?;
            self.probe_port = Some(config.out_port);
        } else {
            self.pump_port = Some(config.out_port);
        }
        Ok(())
    }

    fn set_frequency(&mut self, port: Port, freq: f64) -> HalResult<()> {
        check_port(port)?;
        if freq.abs() > 1e9 {
            return Err(HalError::OutOfRange {
                what: "IF frequency",
                value: freq,
                min: -1e9,
                max: 1e9,
            });
        }
        Ok(())
    }

    fn set_scale(&mut self, port: Port, scale_i: f64, scale_q: f64) -> HalResult<()> {
        check_port(port)?;
        check_scale("output scale I", scale_i)?;
        check_scale("output scale Q", scale_q)?;
        self.scales.insert(port, (scale_i, scale_q));
        Ok(())
    }

    fn set_phase(&mut self, port: Port, _phase_i: f64, _phase_q: f64) -> HalResult<()> {
        check_port(port)
    }

    fn set_dither(&mut self, port: Port, _enable: bool) -> HalResult<()> {
        check_port(port)
    }

    fn set_dma_source(&mut self, port: Port) -> HalResult<()> {
        check_port(port)?;
        self.dma_source = Some(port);
        Ok(())
    }

    fn set_run(&mut self, run: bool) -> HalResult<()> {
        self.running = run;
        Ok(())
    }

    fn settle(&mut self, _duration: Duration) -> HalResult<()> {
        // instrument-clock wait: instantaneous in simulation
        Ok(())
    }

    fn start_dma(&mut self, num_samples: usize) -> HalResult<()> {
        if self.dma_source.is_none() {
            return Err(HalError::Driver("DMA source not selected".into()));
        }
        self.armed = Some(num_samples);
        self.captured = None;
        Ok(())
    }

    fn wait_for_dma(&mut self) -> HalResult<()> {
        let Some(num_samples) = self.armed else {
            return Err(HalError::Driver("DMA capture not armed".into()));
        };
        if !self.running {
            return Err(HalError::Driver("outputs halted, DMA will not fill".into()));
        }
        let probe = self
            .probe_port
            .ok_or_else(|| HalError::Driver("probe mixer not configured".into()))?;
        let pump = self
            .pump_port
            .ok_or_else(|| HalError::Driver("pump mixer not configured".into()))?;
        let probe_amp = self.scales.get(&probe).copied().unwrap_or((0.0, 0.0)).0;
        let pump_amp = self.scales.get(&pump).copied().unwrap_or((0.0, 0.0)).0;
        let pump_freq = self.mixer_freqs.get(&pump).copied().unwrap_or(0.0);

        let level = probe_amp * self.resonance.transmission(pump_freq, pump_amp);
        let sigma = self.resonance.noise;
        let samples = (0..num_samples)
            .map(|_| {
                Complex64::new(level, 0.0) + Complex64::new(self.gauss(), self.gauss()) * sigma
            })
            .collect();
        self.captured = Some(samples);
        Ok(())
    }

    fn stop_dma(&mut self) -> HalResult<()> {
        self.armed = None;
        Ok(())
    }

    fn dma_data(&mut self, num_samples: usize) -> HalResult<Vec<Complex64>> {
        let captured = self
            .captured
            .take()
            .ok_or_else(|| HalError::Driver("no completed DMA capture".into()))?;
        if captured.len() < num_samples {
            return Err(HalError::Driver(format!(
                "DMA capture holds {} samples, {} requested",
                captured.len(),
                num_samples
            )));
        }
        Ok(captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> SimLockin {
        let mut lck = SimLockin::connect(&InstrumentConfig::new("sim"))
            .unwrap()
            .with_seed(3);
        lck.configure_mixer(MixerConfig::output(6.2e9, Port(1)).with_input(Port(1)))
            .unwrap();
        lck.configure_mixer(MixerConfig::output(4.0e9, Port(5)))
            .unwrap();
        lck.set_scale(Port(1), 0.1, 0.1).unwrap();
        lck.set_scale(Port(5), 0.01, 0.01).unwrap();
        lck.set_dma_source(Port(1)).unwrap();
        lck
    }

    fn capture_mean(lck: &mut SimLockin, n: usize) -> Complex64 {
        lck.start_dma(n).unwrap();
        lck.set_run(true).unwrap();
        lck.wait_for_dma().unwrap();
        lck.stop_dma().unwrap();
        let data = lck.dma_data(n).unwrap();
        data.iter().sum::<Complex64>() / n as f64
    }

    #[test]
    fn test_dip_on_resonance() {
        let mut lck = configured();
        let on = capture_mean(&mut lck, 4096).re;
        lck.configure_mixer(MixerConfig::output(4.3e9, Port(5)))
            .unwrap();
        let off = capture_mean(&mut lck, 4096).re;
        assert!(
            on < off,
            "pump on resonance should dip the probe: on = {on}, off = {off}"
        );
    }

    #[test]
    fn test_dma_requires_arming() {
        let mut lck = configured();
        lck.set_run(true).unwrap();
        assert!(matches!(lck.wait_for_dma(), Err(HalError::Driver(_))));
    }

    #[test]
    fn test_dma_requires_running_outputs() {
        let mut lck = configured();
        lck.start_dma(128).unwrap();
        assert!(matches!(lck.wait_for_dma(), Err(HalError::Driver(_))));
    }

    #[test]
    fn test_shutdown_zeroes_scales() {
        let mut lck = configured();
        lck.shutdown().unwrap();
        assert!(lck.is_muted());
        assert_eq!(lck.scales.get(&Port(1)), Some(&(0.0, 0.0)));
    }
}
