//! Ramsey echo: measure the coherence time T2 with a π/2 – π – π/2
//! sequence, sweeping the free-evolution delay around the central echo
//! pulse.

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::info;

use rimfax_fit::{RamseyFit, fit_ramsey, mean_response, rotate_opt};
use rimfax_hal::waveform::{scaled_template, sin2};
use rimfax_hal::{Converter, MixerConfig, PulsedInstrument, Session};
use rimfax_store::{ArrayData, Record};
use rimfax_timeline::schedule::{RamseyEchoPulses, RamseyEchoTiming, ramsey_echo_timeline};
use rimfax_timeline::{DelaySweep, Port, Timeline};

use crate::{ExperimentError, ExperimentResult};

const DAC_CURRENT: u32 = 32_000; // uA

/// Full parameter set of one Ramsey-echo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RamseyEchoParams {
    /// Resonator readout carrier frequency, Hz.
    pub readout_freq: f64,
    /// Qubit drive carrier frequency, Hz.
    pub control_freq: f64,
    /// Intermediate frequency of the qubit drive, Hz.
    pub control_if: f64,
    /// Readout pulse amplitude, full scale.
    pub readout_amp: f64,
    /// π/2 pulse amplitude, full scale.
    pub control_amp_90: f64,
    /// π pulse amplitude, full scale.
    pub control_amp_180: f64,
    /// Readout pulse duration, s.
    pub readout_duration: f64,
    /// Control pulse duration, s.
    pub control_duration: f64,
    /// Sampling window duration, s.
    pub sample_duration: f64,
    pub readout_port: Port,
    pub control_port: Port,
    pub sample_port: Port,
    /// Number of swept delays.
    pub nr_delays: usize,
    /// Delay step size, s.
    pub dt_delays: f64,
    /// Inter-repetition wait for the qubit to decay, s.
    pub wait_delay: f64,
    /// Latency between readout pulse and sampling window, s.
    pub readout_sample_delay: f64,
    pub num_averages: u32,
}

/// The Ramsey-echo experiment: parameters plus acquired data.
#[derive(Debug, Clone)]
pub struct RamseyEcho {
    pub params: RamseyEchoParams,
    t_arr: Option<Array1<f64>>,
    store_arr: Option<Array3<Complex64>>,
}

impl RamseyEcho {
    pub fn new(params: RamseyEchoParams) -> Self {
        Self {
            params,
            t_arr: None,
            store_arr: None,
        }
    }

    /// Time axis of one sampling window, available after a run or load.
    pub fn t_arr(&self) -> Option<&Array1<f64>> {
        self.t_arr.as_ref()
    }

    /// Raw store buffer, available after a run or load.
    pub fn store_arr(&self) -> Option<&Array3<Complex64>> {
        self.store_arr.as_ref()
    }

    fn timing(&self) -> RamseyEchoTiming {
        RamseyEchoTiming {
            control_duration: self.params.control_duration,
            readout_duration: self.params.readout_duration,
            readout_sample_delay: self.params.readout_sample_delay,
            wait_delay: self.params.wait_delay,
            sweep: DelaySweep {
                steps: self.params.nr_delays,
                dt: self.params.dt_delays,
            },
        }
    }

    /// Build the full sweep program for the given pulse handles.
    pub fn timeline(&self, pulses: RamseyEchoPulses) -> ExperimentResult<Timeline> {
        Ok(ramsey_echo_timeline(
            &self.timing(),
            pulses,
            self.params.control_port,
            self.params.readout_port,
        )?)
    }

    /// Execute the measurement on a connected instrument.
    pub fn run<I: PulsedInstrument>(&mut self, instrument: I) -> ExperimentResult<()> {
        let p = self.params.clone();
        let mut session = Session::new(instrument);
        {
            let pls = session.instrument_mut();

            pls.set_adc_attenuation(p.sample_port, 0.0)?;
            pls.set_dac_current(p.readout_port, DAC_CURRENT)?;
            pls.set_dac_current(p.control_port, DAC_CURRENT)?;
            pls.set_inv_sinc(p.readout_port, 0)?;
            pls.set_inv_sinc(p.control_port, 0)?;
            pls.configure_mixer(
                MixerConfig::output(p.readout_freq, p.readout_port)
                    .with_input(p.sample_port)
                    .deferred(), // sync in next call
            )?;
            pls.configure_mixer(MixerConfig::output(
                p.control_freq - p.control_if,
                p.control_port,
            ))?;

            // only carrier 1 is used
            pls.setup_freq_lut(p.readout_port, &[0.0], &[0.0], &[0.0])?;
            let phase_q = if p.control_if == 0.0 {
                0.0
            } else {
                -std::f64::consts::FRAC_PI_2
            };
            pls.setup_freq_lut(p.control_port, &[p.control_if], &[0.0], &[phase_q])?;

            pls.setup_scale_lut(p.readout_port, &[p.readout_amp])?;
            // control amplitudes live in the templates
            pls.setup_scale_lut(p.control_port, &[1.0])?;

            let readout = pls.setup_long_drive(
                p.readout_port,
                p.readout_duration,
                Complex64::new(1.0, 1.0),
            )?;
            let control_ns =
                (p.control_duration * pls.sample_rate(Converter::Dac)).round() as usize;
            let envelope = sin2(control_ns);
            let control_pi2 =
                pls.setup_template(p.control_port, &scaled_template(&envelope, p.control_amp_90))?;
            let control_pi = pls.setup_template(
                p.control_port,
                &scaled_template(&envelope, p.control_amp_180),
            )?;

            pls.set_store_ports(&[p.sample_port])?;
            pls.set_store_duration(p.sample_duration)?;

            let timeline = self.timeline(RamseyEchoPulses {
                control_pi2,
                control_pi,
                readout,
            })?;
            pls.program(&timeline)?;
            info!(
                points = p.nr_delays,
                period = timeline.period(),
                "running Ramsey-echo sweep"
            );
            pls.run(timeline.period(), 1, p.num_averages)?;
            let data = pls.store_data()?;
            self.t_arr = Some(data.t_arr);
            self.store_arr = Some(data.store_arr);
        }
        session.close()?;
        Ok(())
    }

    /// Build the persisted record, snapshotting `source_code`.
    pub fn record(&self, source_code: &str) -> ExperimentResult<Record> {
        let t_arr = self.t_arr.clone().ok_or(ExperimentError::NoData)?;
        let store_arr = self.store_arr.clone().ok_or(ExperimentError::NoData)?;
        let p = &self.params;
        let mut rec = Record::new("ramsey_echo", source_code);
        rec.set_attr("readout_freq", p.readout_freq);
        rec.set_attr("control_freq", p.control_freq);
        rec.set_attr("control_if", p.control_if);
        rec.set_attr("readout_amp", p.readout_amp);
        rec.set_attr("control_amp_90", p.control_amp_90);
        rec.set_attr("control_amp_180", p.control_amp_180);
        rec.set_attr("readout_duration", p.readout_duration);
        rec.set_attr("control_duration", p.control_duration);
        rec.set_attr("sample_duration", p.sample_duration);
        rec.set_attr("readout_port", p.readout_port.0);
        rec.set_attr("control_port", p.control_port.0);
        rec.set_attr("sample_port", p.sample_port.0);
        rec.set_attr("nr_delays", p.nr_delays);
        rec.set_attr("dt_delays", p.dt_delays);
        rec.set_attr("wait_delay", p.wait_delay);
        rec.set_attr("readout_sample_delay", p.readout_sample_delay);
        rec.set_attr("num_averages", p.num_averages);
        rec.insert_array("t_arr", ArrayData::Float1(t_arr));
        rec.insert_array("store_arr", ArrayData::Complex3(store_arr));
        Ok(rec)
    }

    /// Persist the run under `dir` with a timestamped file name.
    pub fn save(&self, dir: &Path, source_code: &str) -> ExperimentResult<PathBuf> {
        Ok(self.record(source_code)?.save(dir)?)
    }

    /// Reload a persisted run.
    pub fn load(path: &Path) -> ExperimentResult<Self> {
        let rec = Record::load(path)?;
        let params = RamseyEchoParams {
            readout_freq: rec.attr_f64("readout_freq")?,
            control_freq: rec.attr_f64("control_freq")?,
            control_if: rec.attr_f64("control_if")?,
            readout_amp: rec.attr_f64("readout_amp")?,
            control_amp_90: rec.attr_f64("control_amp_90")?,
            control_amp_180: rec.attr_f64("control_amp_180")?,
            readout_duration: rec.attr_f64("readout_duration")?,
            control_duration: rec.attr_f64("control_duration")?,
            sample_duration: rec.attr_f64("sample_duration")?,
            readout_port: Port(rec.attr_i64("readout_port")? as u8),
            control_port: Port(rec.attr_i64("control_port")? as u8),
            sample_port: Port(rec.attr_i64("sample_port")? as u8),
            nr_delays: rec.attr_usize("nr_delays")?,
            dt_delays: rec.attr_f64("dt_delays")?,
            wait_delay: rec.attr_f64("wait_delay")?,
            readout_sample_delay: rec.attr_f64("readout_sample_delay")?,
            num_averages: rec.attr_i64("num_averages")? as u32,
        };
        Ok(Self {
            params,
            t_arr: Some(rec.array_f64("t_arr")?.clone()),
            store_arr: Some(rec.array_c64_3d("store_arr")?.clone()),
        })
    }

    /// Swept delays, one per sweep point.
    pub fn delays(&self) -> Vec<f64> {
        (0..self.params.nr_delays)
            .map(|i| i as f64 * self.params.dt_delays)
            .collect()
    }

    /// Reduce the store buffer and fit the damped echo fringe.
    pub fn analyze(&self) -> ExperimentResult<RamseyFit> {
        let store_arr = self.store_arr.as_ref().ok_or(ExperimentError::NoData)?;
        let resp = rotate_opt(&mean_response(store_arr));
        let y: Vec<f64> = resp.iter().map(|z| z.re).collect();
        let fit = fit_ramsey(&self.delays(), &y)?;
        info!(
            t2 = fit.t2,
            frequency = fit.frequency,
            "Ramsey-echo fit done"
        );
        Ok(fit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rimfax_timeline::PulseId;

    fn params() -> RamseyEchoParams {
        RamseyEchoParams {
            readout_freq: 6.028_450e9,
            control_freq: 4.093_372e9,
            control_if: 0.0,
            readout_amp: 0.1,
            control_amp_90: 0.3808,
            control_amp_180: 0.7617,
            readout_duration: 2e-6,
            control_duration: 20e-9,
            sample_duration: 4e-6,
            readout_port: Port(1),
            control_port: Port(4),
            sample_port: Port(1),
            nr_delays: 16,
            dt_delays: 0.4e-6,
            wait_delay: 200e-6,
            readout_sample_delay: 290e-9,
            num_averages: 100,
        }
    }

    #[test]
    fn test_timeline_has_one_store_per_delay() {
        let exp = RamseyEcho::new(params());
        let tl = exp
            .timeline(RamseyEchoPulses {
                control_pi2: PulseId(0),
                control_pi: PulseId(1),
                readout: PulseId(2),
            })
            .unwrap();
        assert_eq!(tl.store_times().len(), 16);
    }

    #[test]
    fn test_save_before_run_is_an_error() {
        let exp = RamseyEcho::new(params());
        assert!(matches!(
            exp.record("src"),
            Err(ExperimentError::NoData)
        ));
    }

    #[test]
    fn test_delays_start_at_zero() {
        let exp = RamseyEcho::new(params());
        let delays = exp.delays();
        assert_eq!(delays[0], 0.0);
        assert!((delays[15] - 6.0e-6).abs() < 1e-15);
    }
}
