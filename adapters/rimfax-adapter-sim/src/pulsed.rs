//! Pulsed-mode simulator.

use ndarray::{Array1, Array3};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use rimfax_hal::{
    Converter, HalError, HalResult, InstrumentConfig, MixerConfig, PulsedInstrument, Shutdown,
    StoreData,
};
use rimfax_timeline::{Action, Event, Port, PulseId, Timeline};

const NUM_PORTS: u8 = 8;
const ADC_SAMPLE_RATE: f64 = 1e9;
const DAC_SAMPLE_RATE: f64 = 1e9;
const MAX_DAC_CURRENT: u32 = 40_000;
const MAX_MIXER_FREQ: f64 = 10e9;

#[derive(Debug, Clone, Copy, PartialEq)]
enum PulseKind {
    /// Square drive, used for readout.
    Long,
    /// Arbitrary envelope, used for control and memory drives.
    Template,
}

#[derive(Debug, Clone, Copy)]
struct PulseDef {
    port: Port,
    duration: f64,
    kind: PulseKind,
}

/// Simulated pulsed instrument.
///
/// Accepts the full configure → define → program → run → read back
/// lifecycle and synthesizes store data from a [`QubitModel`].
///
/// [`QubitModel`]: crate::QubitModel
#[derive(Debug)]
pub struct SimPulsed {
    qubit: crate::QubitModel,
    pulses: Vec<PulseDef>,
    events: Vec<Event>,
    store_ports: Vec<Port>,
    store_duration: f64,
    data: Option<StoreData>,
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

impl SimPulsed {
    /// "Connect" to the simulator. Fails on an empty address to mimic an
    /// unreachable instrument.
    pub fn connect(config: &InstrumentConfig) -> HalResult<Self> {
        if config.address.is_empty() {
            return Err(HalError::ConnectionFailed(
                "no instrument address given".into(),
            ));
        }
        info!(
            "simulated pulsed instrument at {}:{}",
            config.address, config.port
        );
        Ok(Self {
            qubit: crate::QubitModel::default(),
            pulses: Vec::new(),
            events: Vec::new(),
            store_ports: Vec::new(),
            store_duration: 0.0,
            data: None,
            rng: StdRng::seed_from_u64(0x5eed),
            muted: false,
        })
    }

    /// Replace the simulated qubit.
    pub fn with_qubit(mut self, qubit: crate::QubitModel) -> Self {
        self.qubit = qubit;
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

    fn pulse(&self, id: PulseId) -> HalResult<&PulseDef> {
        self.pulses
            .get(id.0 as usize)
            .ok_or(HalError::UnknownPulse(id))
    }

    /// One standard-normal deviate (Box-Muller).
    fn gauss(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        let u2: f64 = self.rng.gen_range(0.0..1.0);
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }

    /// Excited-state weight of one repetition: the idle gap between its
    /// control-type (template) pulses fed through the qubit model.
    fn repetition_weight(&self, templates: &[(f64, f64)]) -> f64 {
        let gap: f64 = templates
            .windows(2)
            .map(|w| (w[1].0 - w[0].1).max(0.0))
            .sum();
        if templates.len() >= 3 {
            self.qubit.echo_weight(gap)
        } else {
            self.qubit.relaxation_weight(gap)
        }
    }
}

impl Shutdown for SimPulsed {
    fn shutdown(&mut self) -> HalResult<()> {
        self.muted = true;
        info!("simulated instrument shut down: outputs muted, bias zeroed");
        Ok(())
    }
}

impl PulsedInstrument for SimPulsed {
    fn sample_rate(&self, converter: Converter) -> f64 {
        match converter {
            Converter::Adc => ADC_SAMPLE_RATE,
            Converter::Dac => DAC_SAMPLE_RATE,
        }
    }

    fn set_adc_attenuation(&mut self, port: Port, attenuation: f64) -> HalResult<()> {
        check_port(port)?;
        if !(0.0..=27.0).contains(&attenuation) {
            return Err(HalError::OutOfRange {
                what: "ADC attenuation",
                value: attenuation,
                min: 0.0,
                max: 27.0,
            });
        }
        Ok(())
    }

    fn set_dac_current(&mut self, port: Port, current: u32) -> HalResult<()> {
        check_port(port)?;
        if current > MAX_DAC_CURRENT {
            return Err(HalError::OutOfRange {
                what: "DAC current",
                value: f64::from(current),
                min: 0.0,
                max: f64::from(MAX_DAC_CURRENT),
            });
        }
        Ok(())
    }

    fn set_inv_sinc(&mut self, port: Port, _order: u8) -> HalResult<()> {
        check_port(port)
    }

    fn configure_mixer(&mut self, config: MixerConfig) -> HalResult<()> {
        check_port(config.out_port)?;
        if let Some(in_port) = config.in_port {
            check_port(in_port)?;
        }
        if !(0.0..=MAX_MIXER_FREQ).contains(&config.freq) {
            return Err(HalError::OutOfRange {
                what: "mixer frequency",
                value: config.freq,
                min: 0.0,
                max: MAX_MIXER_FREQ,
            });
        }
        Ok(())
    }

    fn setup_freq_lut(
        &mut self,
        port: Port,
        frequencies: &[f64],
        _phases: &[f64],
        _phases_q: &[f64],
    ) -> HalResult<()> {
        check_port(port)?;
        for &freq in frequencies {
            if freq.abs() > 1e9 {
                return Err(HalError::OutOfRange {
                    what: "IF frequency",
                    value: freq,
                    min: -1e9,
                    max: 1e9,
                });
            }
        }
        Ok(())
    }

    fn setup_scale_lut(&mut self, port: Port, scales: &[f64]) -> HalResult<()> {
        check_port(port)?;
        for &scale in scales {
            check_scale("LUT scale", scale)?;
        }
        Ok(())
    }

    fn setup_long_drive(
        &mut self,
        port: Port,
        duration: f64,
        amplitude: Complex64,
    ) -> HalResult<PulseId> {
        check_port(port)?;
        check_scale("long-drive amplitude I", amplitude.re)?;
        check_scale("long-drive amplitude Q", amplitude.im)?;
        self.pulses.push(PulseDef {
            port,
            duration,
            kind: PulseKind::Long,
        });
        Ok(PulseId(self.pulses.len() as u32 - 1))
    }

    fn setup_template(&mut self, port: Port, envelope: &[Complex64]) -> HalResult<PulseId> {
        check_port(port)?;
        for sample in envelope {
            check_scale("template sample I", sample.re)?;
            check_scale("template sample Q", sample.im)?;
        }
        self.pulses.push(PulseDef {
            port,
            duration: envelope.len() as f64 / DAC_SAMPLE_RATE,
            kind: PulseKind::Template,
        });
        Ok(PulseId(self.pulses.len() as u32 - 1))
    }

    fn set_store_ports(&mut self, ports: &[Port]) -> HalResult<()> {
        for &port in ports {
            check_port(port)?;
        }
        self.store_ports = ports.to_vec();
        Ok(())
    }

    fn set_store_duration(&mut self, duration: f64) -> HalResult<()> {
        if !(duration > 0.0) {
            return Err(HalError::OutOfRange {
                what: "store duration",
                value: duration,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        self.store_duration = duration;
        Ok(())
    }

    fn schedule(&mut self, event: &Event) -> HalResult<()> {
        if let Action::OutputPulse { pulse, port, .. } = event.action {
            let def = self.pulse(pulse)?;
            if def.port != port {
                return Err(HalError::Driver(format!(
                    "{pulse} is defined on {}, scheduled on {port}",
                    def.port
                )));
            }
        }
        self.events.push(*event);
        Ok(())
    }

    fn run(&mut self, period: f64, repeat_count: u32, num_averages: u32) -> HalResult<()> {
        if !(period > 0.0) {
            return Err(HalError::Driver(format!("non-positive period {period} s")));
        }
        if repeat_count == 0 || num_averages == 0 {
            return Err(HalError::Driver(
                "repeat count and averages must be at least 1".into(),
            ));
        }
        if self.events.is_empty() {
            return Err(HalError::Driver("no program scheduled".into()));
        }
        if self.store_ports.is_empty() || self.store_duration <= 0.0 {
            return Err(HalError::Driver("store window not configured".into()));
        }

        // One repetition per Store event: collect the template-pulse
        // intervals leading up to it and reduce them to a response.
        let mut weights = Vec::new();
        let mut templates: Vec<(f64, f64)> = Vec::new();
        for event in &self.events {
            match event.action {
                Action::OutputPulse { pulse, .. } => {
                    let def = self.pulse(pulse)?;
                    if def.kind == PulseKind::Template {
                        templates.push((event.time, event.time + def.duration));
                    }
                }
                Action::Store => {
                    weights.push(self.repetition_weight(&templates));
                    templates.clear();
                }
                Action::ResetPhase { .. } => {}
            }
        }
        if weights.is_empty() {
            return Err(HalError::Driver("program contains no sample window".into()));
        }

        let num_samples = (self.store_duration * ADC_SAMPLE_RATE).round() as usize;
        let sigma = self.qubit.noise / f64::from(num_averages).sqrt();
        let mut store_arr = Array3::zeros((weights.len(), repeat_count as usize, num_samples));
        for (i, &weight) in weights.iter().enumerate() {
            let response = self.qubit.response(weight);
            for r in 0..repeat_count as usize {
                for s in 0..num_samples {
                    let noise = Complex64::new(self.gauss(), self.gauss()) * sigma;
                    store_arr[[i, r, s]] = response + noise;
                }
            }
        }
        let t_arr = Array1::from_iter((0..num_samples).map(|s| s as f64 / ADC_SAMPLE_RATE));

        debug!(
            "simulated run: {} sweep points, period {:.3} ms, {} averages",
            weights.len(),
            1e3 * period,
            num_averages
        );
        self.data = Some(StoreData { t_arr, store_arr });
        Ok(())
    }

    fn store_data(&self) -> HalResult<StoreData> {
        self.data
            .clone()
            .ok_or_else(|| HalError::Driver("no completed acquisition".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rimfax_timeline::schedule::{
        RamseyEchoPulses, RamseyEchoTiming, ramsey_echo_timeline,
    };
    use rimfax_timeline::{DelaySweep, Timeline, TimelineBuilder};

    fn connected() -> SimPulsed {
        SimPulsed::connect(&InstrumentConfig::new("sim"))
            .unwrap()
            .with_seed(7)
    }

    fn simple_timeline(pls: &mut SimPulsed, delays: &[f64]) -> Timeline {
        let memory = pls
            .setup_template(Port(5), &[Complex64::new(0.5, 0.5); 40])
            .unwrap();
        let control = pls
            .setup_template(Port(4), &[Complex64::new(0.5, 0.5); 40])
            .unwrap();
        let readout = pls
            .setup_long_drive(Port(1), 2e-6, Complex64::new(1.0, 1.0))
            .unwrap();
        let mut b = TimelineBuilder::new();
        for &delay in delays {
            b.output_pulse(memory, Port(5), 40e-9).unwrap();
            b.advance(40e-9).unwrap();
            b.advance(delay).unwrap();
            b.output_pulse(control, Port(4), 40e-9).unwrap();
            b.advance(40e-9).unwrap();
            b.output_pulse(readout, Port(1), 2e-6).unwrap();
            b.store_at(b.at() + 290e-9).unwrap();
            b.advance(2e-6).unwrap();
            b.advance(50e-6).unwrap();
        }
        b.finish()
    }

    #[test]
    fn test_relaxation_response_decays() {
        let mut pls = connected();
        let delays: Vec<f64> = (0..8).map(|i| i as f64 * 20e-6).collect();
        let timeline = simple_timeline(&mut pls, &delays);
        pls.set_store_ports(&[Port(1)]).unwrap();
        pls.set_store_duration(1e-6).unwrap();
        pls.program(&timeline).unwrap();
        pls.run(timeline.period(), 1, 100_000).unwrap();
        let data = pls.store_data().unwrap();
        assert_eq!(data.store_arr.dim().0, 8);

        // distance from the ground-state response shrinks with delay
        let model = crate::QubitModel::default();
        let mut prev = f64::INFINITY;
        for i in 0..8 {
            let mean = data
                .store_arr
                .slice(ndarray::s![i, 0, ..])
                .iter()
                .sum::<Complex64>()
                / data.store_arr.dim().2 as f64;
            let dist = (mean - model.ground).norm();
            assert!(dist <= prev + 1e-4, "sweep point {i}");
            prev = dist;
        }
    }

    #[test]
    fn test_echo_sequence_uses_echo_weight() {
        let mut pls = connected();
        let control_pi2 = pls
            .setup_template(Port(4), &[Complex64::new(0.3, 0.3); 20])
            .unwrap();
        let control_pi = pls
            .setup_template(Port(4), &[Complex64::new(0.6, 0.6); 20])
            .unwrap();
        let readout = pls
            .setup_long_drive(Port(1), 2e-6, Complex64::new(1.0, 1.0))
            .unwrap();
        let timing = RamseyEchoTiming {
            control_duration: 20e-9,
            readout_duration: 2e-6,
            readout_sample_delay: 290e-9,
            wait_delay: 100e-6,
            sweep: DelaySweep::new(4, 5e-6).unwrap(),
        };
        let timeline = ramsey_echo_timeline(
            &timing,
            RamseyEchoPulses {
                control_pi2,
                control_pi,
                readout,
            },
            Port(4),
            Port(1),
        )
        .unwrap();
        pls.set_store_ports(&[Port(1)]).unwrap();
        pls.set_store_duration(1e-6).unwrap();
        pls.program(&timeline).unwrap();
        pls.run(timeline.period(), 1, 10_000).unwrap();
        let data = pls.store_data().unwrap();
        assert_eq!(data.store_arr.dim().0, 4);
    }

    #[test]
    fn test_out_of_range_scale_rejected() {
        let mut pls = connected();
        let err = pls
            .setup_long_drive(Port(1), 2e-6, Complex64::new(1.5, 0.0))
            .unwrap_err();
        assert!(matches!(err, HalError::OutOfRange { .. }));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut pls = connected();
        assert!(matches!(
            pls.set_dac_current(Port(9), 32_000),
            Err(HalError::InvalidPort(_))
        ));
    }

    #[test]
    fn test_unknown_pulse_rejected() {
        let mut pls = connected();
        let event = Event {
            time: 0.0,
            action: Action::OutputPulse {
                pulse: PulseId(42),
                port: Port(1),
                duration: 1e-6,
            },
        };
        assert!(matches!(
            pls.schedule(&event),
            Err(HalError::UnknownPulse(_))
        ));
    }

    #[test]
    fn test_run_without_program_rejected() {
        let mut pls = connected();
        assert!(matches!(pls.run(1e-3, 1, 100), Err(HalError::Driver(_))));
    }

    #[test]
    fn test_shutdown_mutes() {
        let mut pls = connected();
        assert!(!pls.is_muted());
        pls.shutdown().unwrap();
        assert!(pls.is_muted());
    }
}
