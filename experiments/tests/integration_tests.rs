//! End-to-end runs of every measurement against the simulator backend.

use rimfax_adapter_sim::{QubitModel, ResonanceModel, SimLockin, SimPulsed};
use rimfax_experiments::ramsey_echo::{RamseyEcho, RamseyEchoParams};
use rimfax_experiments::t1_memory_coherent::{T1MemoryCoherent, T1MemoryCoherentParams};
use rimfax_experiments::two_tone_power::{TwoTonePower, TwoTonePowerParams};
use rimfax_hal::InstrumentConfig;
use rimfax_timeline::schedule::{RamseyEchoPulses, T1Pulses};
use rimfax_timeline::{Port, PulseId};

fn ramsey_params() -> RamseyEchoParams {
    RamseyEchoParams {
        readout_freq: 6.028_450e9,
        control_freq: 4.093_372e9,
        control_if: 0.0,
        readout_amp: 0.1,
        control_amp_90: 0.3808,
        control_amp_180: 0.7617,
        readout_duration: 2e-6,
        control_duration: 20e-9,
        sample_duration: 2e-6,
        readout_port: Port(1),
        control_port: Port(4),
        sample_port: Port(1),
        nr_delays: 40,
        dt_delays: 1e-6,
        wait_delay: 200e-6,
        readout_sample_delay: 290e-9,
        num_averages: 10_000,
    }
}

fn sim_qubit() -> QubitModel {
    QubitModel {
        t1: 20e-6,
        t2: 12e-6,
        detuning: 100e3,
        noise: 1e-3,
        ..QubitModel::default()
    }
}

#[test]
fn test_ramsey_echo_recovers_coherence() {
    let instrument = SimPulsed::connect(&InstrumentConfig::new("sim"))
        .unwrap()
        .with_qubit(sim_qubit())
        .with_seed(11);

    let mut exp = RamseyEcho::new(ramsey_params());
    exp.run(instrument).unwrap();

    let store_arr = exp.store_arr().unwrap();
    assert_eq!(store_arr.dim(), (40, 1, 2000));

    let fit = exp.analyze().unwrap();
    assert!(
        (fit.t2 - 12e-6).abs() < 3e-6,
        "T2 off: {} us",
        fit.t2 * 1e6
    );
    assert!(
        (fit.frequency - 100e3).abs() < 5e3,
        "fringe frequency off: {} kHz",
        fit.frequency / 1e3
    );
}

#[test]
fn test_ramsey_record_roundtrip_rebuilds_identical_timeline() {
    let instrument = SimPulsed::connect(&InstrumentConfig::new("sim"))
        .unwrap()
        .with_qubit(sim_qubit())
        .with_seed(5);

    let mut params = ramsey_params();
    params.nr_delays = 8;
    params.num_averages = 100;
    let mut exp = RamseyEcho::new(params);
    exp.run(instrument).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = exp.save(dir.path(), "const NR_DELAYS: usize = 8;\n").unwrap();
    let back = RamseyEcho::load(&path).unwrap();

    assert_eq!(back.params, exp.params);
    assert_eq!(back.t_arr().unwrap(), exp.t_arr().unwrap());
    assert_eq!(back.store_arr().unwrap(), exp.store_arr().unwrap());

    // parameters alone must rebuild the exact pulse program
    let pulses = RamseyEchoPulses {
        control_pi2: PulseId(0),
        control_pi: PulseId(1),
        readout: PulseId(2),
    };
    assert_eq!(back.timeline(pulses).unwrap(), exp.timeline(pulses).unwrap());
}

#[test]
fn test_t1_recovers_relaxation_time() {
    let instrument = SimPulsed::connect(&InstrumentConfig::new("sim"))
        .unwrap()
        .with_qubit(QubitModel {
            t1: 10e-6,
            noise: 1e-3,
            ..QubitModel::default()
        })
        .with_seed(23);

    let mut exp = T1MemoryCoherent::new(T1MemoryCoherentParams {
        readout_freq: 6.028_450e9,
        control_freq: 4.093_372e9,
        memory_freq: 4.2e9,
        readout_amp: 0.1,
        control_amp: 0.7617,
        memory_amp: 0.3,
        readout_duration: 2e-6,
        control_duration: 100e-9,
        memory_duration: 1e-6,
        sample_duration: 2e-6,
        delay_arr: (0..32).map(|i| i as f64 * 1.5e-6).collect(),
        readout_port: Port(1),
        control_port: Port(4),
        memory_port: Port(5),
        sample_port: Port(1),
        wait_delay: 200e-6,
        readout_sample_delay: 290e-9,
        num_averages: 10_000,
    });
    exp.run(instrument).unwrap();

    let fit = exp.analyze().unwrap();
    assert!(
        (fit.t1 - 10e-6).abs() < 1.5e-6,
        "T1 off: {} us",
        fit.t1 * 1e6
    );
}

#[test]
fn test_t1_record_roundtrip() {
    let instrument = SimPulsed::connect(&InstrumentConfig::new("sim"))
        .unwrap()
        .with_seed(3);

    let mut exp = T1MemoryCoherent::new(T1MemoryCoherentParams {
        readout_freq: 6.166_600e9,
        control_freq: 3.557_866e9,
        memory_freq: 4.2e9,
        readout_amp: 0.1,
        control_amp: 0.5,
        memory_amp: 0.3,
        readout_duration: 2e-6,
        control_duration: 100e-9,
        memory_duration: 1e-6,
        sample_duration: 2e-6,
        delay_arr: vec![0.0, 2e-6, 5e-6, 11e-6],
        readout_port: Port(1),
        control_port: Port(3),
        memory_port: Port(5),
        sample_port: Port(1),
        wait_delay: 100e-6,
        readout_sample_delay: 290e-9,
        num_averages: 100,
    });
    exp.run(instrument).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = exp.save(dir.path(), "// t1 test run\n").unwrap();
    let back = T1MemoryCoherent::load(&path).unwrap();

    assert_eq!(back.params, exp.params);
    let pulses = T1Pulses {
        memory: PulseId(0),
        control: PulseId(1),
        readout: PulseId(2),
    };
    assert_eq!(back.timeline(pulses).unwrap(), exp.timeline(pulses).unwrap());
}

#[test]
fn test_two_tone_finds_the_qubit() {
    let resonance = ResonanceModel {
        qubit_freq: 4.0e9,
        ..ResonanceModel::default()
    };
    let instrument = SimLockin::connect(&InstrumentConfig::new("sim"))
        .unwrap()
        .with_resonance(resonance)
        .with_seed(17);

    let mut exp = TwoTonePower::new(TwoTonePowerParams {
        center_freq: 4.0e9,
        span: 20e6,
        df: 1e6,
        cavity_freq: 6.213_095e9,
        cavity_amp: 0.1,
        nr_amps: 5,
        cavity_port: Port(1),
        qubit_port: Port(5),
        input_port: Port(1),
        dither: true,
        extra: 100,
        num_averages: 10,
    });
    exp.run(instrument).unwrap();

    let resp = exp.resp_arr().unwrap();
    assert_eq!(resp.nrows(), 5);
    assert_eq!(resp.ncols(), exp.qubit_freq_arr().unwrap().len());

    let dip = exp.analyze().unwrap();
    assert!(
        (dip - 4.0e9).abs() <= 1.5e6,
        "dip off: {} GHz",
        dip / 1e9
    );

    // round-trip through the record
    let dir = tempfile::tempdir().unwrap();
    let path = exp.save(dir.path(), "// two-tone test run\n").unwrap();
    let back = TwoTonePower::load(&path).unwrap();
    assert_eq!(back.params, exp.params);
    assert_eq!(back.resp_arr().unwrap(), exp.resp_arr().unwrap());
}
