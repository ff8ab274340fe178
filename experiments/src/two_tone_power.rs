//! Two-tone spectroscopy in continuous-wave mode: a 2-D sweep of pump
//! power and frequency with a fixed probe on the cavity. The pump
//! frequencies are integer multiples of the measurement bandwidth, so
//! every tone falls exactly on an analysis bin.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::info;

use rimfax_hal::{LockinInstrument, MixerConfig, Session};
use rimfax_store::{ArrayData, Record};
use rimfax_timeline::Port;

use crate::{ExperimentError, ExperimentResult, create_progress_bar};

/// Full parameter set of one two-tone power sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoTonePowerParams {
    /// Center of the pump frequency sweep, Hz.
    pub center_freq: f64,
    /// Span of the pump frequency sweep, Hz.
    pub span: f64,
    /// Requested measurement bandwidth, Hz; rounded to an integer number
    /// of samples per capture at run time.
    pub df: f64,
    /// Probe (cavity) carrier frequency, Hz.
    pub cavity_freq: f64,
    /// Probe amplitude, full scale.
    pub cavity_amp: f64,
    /// Number of pump amplitudes, log-spaced from 1e-3 to 1 FS.
    pub nr_amps: usize,
    pub cavity_port: Port,
    pub qubit_port: Port,
    pub input_port: Port,
    pub dither: bool,
    /// Lead-in samples discarded from each capture.
    pub extra: usize,
    pub num_averages: usize,
}

/// The two-tone power sweep: parameters plus acquired data.
#[derive(Debug, Clone)]
pub struct TwoTonePower {
    pub params: TwoTonePowerParams,
    df_measured: Option<f64>,
    qubit_freq_arr: Option<Array1<f64>>,
    qubit_amp_arr: Option<Array1<f64>>,
    resp_arr: Option<Array2<Complex64>>,
}

impl TwoTonePower {
    pub fn new(params: TwoTonePowerParams) -> Self {
        Self {
            params,
            df_measured: None,
            qubit_freq_arr: None,
            qubit_amp_arr: None,
            resp_arr: None,
        }
    }

    /// Swept pump frequencies, available after a run or load.
    pub fn qubit_freq_arr(&self) -> Option<&Array1<f64>> {
        self.qubit_freq_arr.as_ref()
    }

    /// Swept pump amplitudes, available after a run or load.
    pub fn qubit_amp_arr(&self) -> Option<&Array1<f64>> {
        self.qubit_amp_arr.as_ref()
    }

    /// Averaged probe response per (amplitude, frequency) point.
    pub fn resp_arr(&self) -> Option<&Array2<Complex64>> {
        self.resp_arr.as_ref()
    }

    /// Log-spaced pump amplitudes, 1e-3 to 1 FS.
    fn amp_ramp(nr_amps: usize) -> Vec<f64> {
        if nr_amps < 2 {
            return vec![1e-3];
        }
        (0..nr_amps)
            .map(|j| 10f64.powf(-3.0 + 3.0 * j as f64 / (nr_amps - 1) as f64))
            .collect()
    }

    /// Execute the sweep on a connected instrument.
    pub fn run<I: LockinInstrument>(&mut self, instrument: I) -> ExperimentResult<()> {
        let p = self.params.clone();
        let mut session = Session::new(instrument);
        {
            let lck = session.instrument_mut();

            let fs = lck.sample_rate();
            let nr_samples = (fs / p.df).round() as usize;
            // actual bandwidth after rounding to whole samples
            let df = fs / nr_samples as f64;
            let n_start = ((p.center_freq - p.span / 2.0) / df).round() as i64;
            let n_stop = ((p.center_freq + p.span / 2.0) / df).round() as i64;
            let qubit_freq_arr: Vec<f64> = (n_start..=n_stop).map(|n| df * n as f64).collect();
            let nr_freq = qubit_freq_arr.len();
            let qubit_amp_arr = Self::amp_ramp(p.nr_amps);
            let mut resp_arr = Array2::<Complex64>::zeros((qubit_amp_arr.len(), nr_freq));

            lck.set_run(false)?;
            lck.configure_mixer(
                MixerConfig::output(p.cavity_freq, p.cavity_port).with_input(p.input_port),
            )?;
            lck.configure_mixer(MixerConfig::output(qubit_freq_arr[0], p.qubit_port))?;
            lck.set_frequency(p.cavity_port, 0.0)?;
            lck.set_frequency(p.qubit_port, 0.0)?;
            lck.set_scale(p.cavity_port, p.cavity_amp, p.cavity_amp)?;
            lck.set_scale(p.qubit_port, qubit_amp_arr[0], qubit_amp_arr[0])?;
            lck.set_phase(p.cavity_port, 0.0, 0.0)?;
            lck.set_phase(p.qubit_port, 0.0, 0.0)?;
            lck.set_dither(p.cavity_port, p.dither)?;
            lck.set_dither(p.qubit_port, p.dither)?;
            lck.set_dma_source(p.input_port)?;
            lck.set_run(true)?;

            info!(
                nr_amps = qubit_amp_arr.len(),
                nr_freq,
                df,
                "running two-tone power sweep"
            );
            let capture = p.num_averages * nr_samples + p.extra;
            let pb = create_progress_bar(
                (qubit_amp_arr.len() * nr_freq) as u64,
                "two-tone power sweep",
            );
            for (jj, &qubit_amp) in qubit_amp_arr.iter().enumerate() {
                for (ii, &qubit_freq) in qubit_freq_arr.iter().enumerate() {
                    lck.set_run(false)?;
                    lck.configure_mixer(MixerConfig::output(qubit_freq, p.qubit_port))?;
                    lck.set_scale(p.qubit_port, qubit_amp, qubit_amp)?;
                    lck.settle(Duration::from_millis(1))?;
                    lck.start_dma(capture)?;
                    lck.set_run(true)?;
                    lck.wait_for_dma()?;
                    lck.stop_dma()?;

                    let data = lck.dma_data(capture)?;
                    // drop the lead-in, average the rest
                    let sum: Complex64 = data[p.extra..].iter().sum();
                    resp_arr[[jj, ii]] = sum / (p.num_averages * nr_samples) as f64;
                    pb.inc(1);
                }
            }
            pb.finish_and_clear();

            // mute outputs at the end of the sweep
            lck.set_run(false)?;
            lck.set_scale(p.cavity_port, 0.0, 0.0)?;
            lck.set_scale(p.qubit_port, 0.0, 0.0)?;

            self.df_measured = Some(df);
            self.qubit_freq_arr = Some(Array1::from(qubit_freq_arr));
            self.qubit_amp_arr = Some(Array1::from(qubit_amp_arr));
            self.resp_arr = Some(resp_arr);
        }
        session.close()?;
        Ok(())
    }

    /// Build the persisted record, snapshotting `source_code`.
    pub fn record(&self, source_code: &str) -> ExperimentResult<Record> {
        let df = self.df_measured.ok_or(ExperimentError::NoData)?;
        let qubit_freq_arr = self.qubit_freq_arr.clone().ok_or(ExperimentError::NoData)?;
        let qubit_amp_arr = self.qubit_amp_arr.clone().ok_or(ExperimentError::NoData)?;
        let resp_arr = self.resp_arr.clone().ok_or(ExperimentError::NoData)?;
        let p = &self.params;
        let mut rec = Record::new("two_tone_power", source_code);
        rec.set_attr("center_freq", p.center_freq);
        rec.set_attr("span", p.span);
        rec.set_attr("df", df);
        rec.set_attr("cavity_freq", p.cavity_freq);
        rec.set_attr("cavity_amp", p.cavity_amp);
        rec.set_attr("cavity_port", p.cavity_port.0);
        rec.set_attr("qubit_port", p.qubit_port.0);
        rec.set_attr("input_port", p.input_port.0);
        rec.set_attr("dither", p.dither);
        rec.set_attr("extra", p.extra);
        rec.set_attr("num_averages", p.num_averages);
        rec.insert_array("qubit_freq_arr", ArrayData::Float1(qubit_freq_arr));
        rec.insert_array("qubit_amp_arr", ArrayData::Float1(qubit_amp_arr));
        rec.insert_array("resp_arr", ArrayData::Complex2(resp_arr));
        Ok(rec)
    }

    /// Persist the sweep under `dir` with a timestamped file name.
    pub fn save(&self, dir: &Path, source_code: &str) -> ExperimentResult<PathBuf> {
        Ok(self.record(source_code)?.save(dir)?)
    }

    /// Reload a persisted sweep.
    pub fn load(path: &Path) -> ExperimentResult<Self> {
        let rec = Record::load(path)?;
        let qubit_amp_arr = rec.array_f64("qubit_amp_arr")?.clone();
        let params = TwoTonePowerParams {
            center_freq: rec.attr_f64("center_freq")?,
            span: rec.attr_f64("span")?,
            df: rec.attr_f64("df")?,
            cavity_freq: rec.attr_f64("cavity_freq")?,
            cavity_amp: rec.attr_f64("cavity_amp")?,
            nr_amps: qubit_amp_arr.len(),
            cavity_port: Port(rec.attr_i64("cavity_port")? as u8),
            qubit_port: Port(rec.attr_i64("qubit_port")? as u8),
            input_port: Port(rec.attr_i64("input_port")? as u8),
            dither: rec.attr_bool("dither")?,
            extra: rec.attr_usize("extra")?,
            num_averages: rec.attr_usize("num_averages")?,
        };
        Ok(Self {
            params,
            df_measured: Some(rec.attr_f64("df")?),
            qubit_freq_arr: Some(rec.array_f64("qubit_freq_arr")?.clone()),
            qubit_amp_arr: Some(qubit_amp_arr),
            resp_arr: Some(rec.array_c64_2d("resp_arr")?.clone()),
        })
    }

    /// Pump frequency of the deepest probe dip at the lowest pump power,
    /// the low-power estimate of the qubit transition frequency.
    pub fn analyze(&self) -> ExperimentResult<f64> {
        let freqs = self.qubit_freq_arr.as_ref().ok_or(ExperimentError::NoData)?;
        let resp = self.resp_arr.as_ref().ok_or(ExperimentError::NoData)?;
        let row = resp.row(0);
        let mut best = 0;
        for (i, z) in row.iter().enumerate() {
            if z.norm() < row[best].norm() {
                best = i;
            }
        }
        let freq = freqs[best];
        info!(qubit_freq = freq, "two-tone dip located");
        Ok(freq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amp_ramp_is_log_spaced() {
        let amps = TwoTonePower::amp_ramp(61);
        assert_eq!(amps.len(), 61);
        assert!((amps[0] - 1e-3).abs() < 1e-12);
        assert!((amps[60] - 1.0).abs() < 1e-12);
        // constant ratio between neighbors
        let r0 = amps[1] / amps[0];
        let r1 = amps[60] / amps[59];
        assert!((r0 - r1).abs() < 1e-9);
    }

    #[test]
    fn test_amp_ramp_degenerate() {
        assert_eq!(TwoTonePower::amp_ramp(1), vec![1e-3]);
    }

    #[test]
    fn test_record_before_run_is_an_error() {
        let exp = TwoTonePower::new(TwoTonePowerParams {
            center_freq: 4.0e9,
            span: 500e6,
            df: 1e6,
            cavity_freq: 6.213_095e9,
            cavity_amp: 0.1,
            nr_amps: 61,
            cavity_port: Port(1),
            qubit_port: Port(5),
            input_port: Port(1),
            dither: true,
            extra: 500,
            num_averages: 100,
        });
        assert!(matches!(exp.record("src"), Err(ExperimentError::NoData)));
    }
}
