//! Energy relaxation: displace the memory, idle for a swept delay, apply
//! a π pulse conditioned on the memory still being in the ground state,
//! then read out. The decay of the conditional response gives T1.

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::info;

use rimfax_fit::{DecayFit, fit_exp_decay, mean_response, rotate_opt};
use rimfax_hal::waveform::{scaled_template, sin2};
use rimfax_hal::{Converter, MixerConfig, PulsedInstrument, Session};
use rimfax_store::{ArrayData, Record};
use rimfax_timeline::schedule::{T1Ports, T1Pulses, T1Timing, t1_timeline};
use rimfax_timeline::{Port, Timeline};

use crate::{ExperimentError, ExperimentResult};

const DAC_CURRENT: u32 = 32_000; // uA

/// Full parameter set of one T1 run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct T1MemoryCoherentParams {
    pub readout_freq: f64,
    pub control_freq: f64,
    pub memory_freq: f64,
    pub readout_amp: f64,
    pub control_amp: f64,
    pub memory_amp: f64,
    pub readout_duration: f64,
    pub control_duration: f64,
    pub memory_duration: f64,
    pub sample_duration: f64,
    /// Swept idle delays, s. Arbitrary lists are allowed, not just
    /// linear ramps.
    pub delay_arr: Vec<f64>,
    pub readout_port: Port,
    pub control_port: Port,
    pub memory_port: Port,
    pub sample_port: Port,
    pub wait_delay: f64,
    pub readout_sample_delay: f64,
    pub num_averages: u32,
}

/// The T1 experiment: parameters plus acquired data.
#[derive(Debug, Clone)]
pub struct T1MemoryCoherent {
    pub params: T1MemoryCoherentParams,
    t_arr: Option<Array1<f64>>,
    store_arr: Option<Array3<Complex64>>,
}

impl T1MemoryCoherent {
    pub fn new(params: T1MemoryCoherentParams) -> Self {
        Self {
            params,
            t_arr: None,
            store_arr: None,
        }
    }

    pub fn t_arr(&self) -> Option<&Array1<f64>> {
        self.t_arr.as_ref()
    }

    pub fn store_arr(&self) -> Option<&Array3<Complex64>> {
        self.store_arr.as_ref()
    }

    fn timing(&self) -> T1Timing {
        T1Timing {
            memory_duration: self.params.memory_duration,
            control_duration: self.params.control_duration,
            readout_duration: self.params.readout_duration,
            readout_sample_delay: self.params.readout_sample_delay,
            wait_delay: self.params.wait_delay,
            delays: self.params.delay_arr.clone(),
        }
    }

    /// Build the full sweep program for the given pulse handles.
    pub fn timeline(&self, pulses: T1Pulses) -> ExperimentResult<Timeline> {
        Ok(t1_timeline(
            &self.timing(),
            pulses,
            T1Ports {
                memory: self.params.memory_port,
                control: self.params.control_port,
                readout: self.params.readout_port,
            },
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
            pls.set_dac_current(p.memory_port, DAC_CURRENT)?;
            pls.set_inv_sinc(p.readout_port, 0)?;
            pls.set_inv_sinc(p.control_port, 0)?;
            pls.set_inv_sinc(p.memory_port, 0)?;

            pls.configure_mixer(
                MixerConfig::output(p.readout_freq, p.readout_port)
                    .with_input(p.sample_port)
                    .deferred(),
            )?;
            pls.configure_mixer(MixerConfig::output(p.control_freq, p.control_port).deferred())?;
            pls.configure_mixer(MixerConfig::output(p.memory_freq, p.memory_port))?;

            pls.setup_scale_lut(p.readout_port, &[p.readout_amp])?;
            pls.setup_scale_lut(p.control_port, &[p.control_amp])?;
            pls.setup_scale_lut(p.memory_port, &[p.memory_amp])?;

            let readout = pls.setup_long_drive(
                p.readout_port,
                p.readout_duration,
                Complex64::new(1.0, 1.0),
            )?;
            let fs_dac = pls.sample_rate(Converter::Dac);
            let control_ns = (p.control_duration * fs_dac).round() as usize;
            let control =
                pls.setup_template(p.control_port, &scaled_template(&sin2(control_ns), 1.0))?;
            let memory_ns = (p.memory_duration * fs_dac).round() as usize;
            let memory =
                pls.setup_template(p.memory_port, &scaled_template(&sin2(memory_ns), 1.0))?;

            pls.set_store_ports(&[p.sample_port])?;
            pls.set_store_duration(p.sample_duration)?;

            let timeline = self.timeline(T1Pulses {
                memory,
                control,
                readout,
            })?;
            pls.program(&timeline)?;
            info!(
                points = p.delay_arr.len(),
                period = timeline.period(),
                "running T1 sweep"
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
        let mut rec = Record::new("t1_memory_coherent", source_code);
        rec.set_attr("readout_freq", p.readout_freq);
        rec.set_attr("control_freq", p.control_freq);
        rec.set_attr("memory_freq", p.memory_freq);
        rec.set_attr("readout_amp", p.readout_amp);
        rec.set_attr("control_amp", p.control_amp);
        rec.set_attr("memory_amp", p.memory_amp);
        rec.set_attr("readout_duration", p.readout_duration);
        rec.set_attr("control_duration", p.control_duration);
        rec.set_attr("memory_duration", p.memory_duration);
        rec.set_attr("sample_duration", p.sample_duration);
        rec.set_attr("readout_port", p.readout_port.0);
        rec.set_attr("control_port", p.control_port.0);
        rec.set_attr("memory_port", p.memory_port.0);
        rec.set_attr("sample_port", p.sample_port.0);
        rec.set_attr("wait_delay", p.wait_delay);
        rec.set_attr("readout_sample_delay", p.readout_sample_delay);
        rec.set_attr("num_averages", p.num_averages);
        rec.insert_array("delay_arr", ArrayData::Float1(Array1::from(p.delay_arr.clone())));
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
        let params = T1MemoryCoherentParams {
            readout_freq: rec.attr_f64("readout_freq")?,
            control_freq: rec.attr_f64("control_freq")?,
            memory_freq: rec.attr_f64("memory_freq")?,
            readout_amp: rec.attr_f64("readout_amp")?,
            control_amp: rec.attr_f64("control_amp")?,
            memory_amp: rec.attr_f64("memory_amp")?,
            readout_duration: rec.attr_f64("readout_duration")?,
            control_duration: rec.attr_f64("control_duration")?,
            memory_duration: rec.attr_f64("memory_duration")?,
            sample_duration: rec.attr_f64("sample_duration")?,
            delay_arr: rec.array_f64("delay_arr")?.to_vec(),
            readout_port: Port(rec.attr_i64("readout_port")? as u8),
            control_port: Port(rec.attr_i64("control_port")? as u8),
            memory_port: Port(rec.attr_i64("memory_port")? as u8),
            sample_port: Port(rec.attr_i64("sample_port")? as u8),
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

    /// Reduce the store buffer and fit the exponential decay.
    pub fn analyze(&self) -> ExperimentResult<DecayFit> {
        let store_arr = self.store_arr.as_ref().ok_or(ExperimentError::NoData)?;
        let resp = rotate_opt(&mean_response(store_arr));
        let y: Vec<f64> = resp.iter().map(|z| z.re).collect();
        let fit = fit_exp_decay(&self.params.delay_arr, &y)?;
        info!(t1 = fit.t1, "T1 fit done");
        Ok(fit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rimfax_timeline::PulseId;

    fn params() -> T1MemoryCoherentParams {
        T1MemoryCoherentParams {
            readout_freq: 6.166_600e9,
            control_freq: 3.557_866e9,
            memory_freq: 4.2e9,
            readout_amp: 0.1,
            control_amp: 0.5,
            memory_amp: 0.3,
            readout_duration: 2e-6,
            control_duration: 100e-9,
            memory_duration: 1e-6,
            sample_duration: 4e-6,
            delay_arr: (0..32).map(|i| i as f64 * 2e-6).collect(),
            readout_port: Port(1),
            control_port: Port(4),
            memory_port: Port(5),
            sample_port: Port(1),
            wait_delay: 100e-6,
            readout_sample_delay: 290e-9,
            num_averages: 100,
        }
    }

    #[test]
    fn test_timeline_has_one_store_per_delay() {
        let exp = T1MemoryCoherent::new(params());
        let tl = exp
            .timeline(T1Pulses {
                memory: PulseId(0),
                control: PulseId(1),
                readout: PulseId(2),
            })
            .unwrap();
        assert_eq!(tl.store_times().len(), 32);
    }

    #[test]
    fn test_save_before_run_is_an_error() {
        let exp = T1MemoryCoherent::new(params());
        assert!(matches!(exp.record("src"), Err(ExperimentError::NoData)));
    }
}
