//! The fixed channel configuration applied before streaming.
//!
//! Steps run in order and the first failure is returned as is; settings
//! already applied are left in place.

use std::io::Write;

use crate::Device;
use crate::Driver;
use crate::Range;
use crate::Result;
use crate::RunConfig;
use crate::SampleRate;

/// Values read back from the device while configuring.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub lo_frequency: f64,
    pub antennas: Vec<String>,
    pub auto_antenna: usize,
    pub antenna: usize,
    pub sample_rate: SampleRate,
    pub lpf_range: Range,
    pub normalized_gain: f64,
    pub gain_db: u32,
}

fn antenna_name(list: &[String], index: usize) -> &str {
    list.get(index).map(String::as_str).unwrap_or("?")
}

pub fn configure<D: Driver + ?Sized, W: Write>(
    device: &Device<'_, D>,
    config: &RunConfig,
    out: &mut W,
) -> Result<Applied> {
    let ch = device.channel(config.channel);
    let dir = config.channel.direction;

    log::debug!("enabling {}", config.channel);
    ch.enable(true)?;

    log::debug!("setting LO to {} Hz", config.lo_frequency);
    ch.set_lo_frequency(config.lo_frequency)?;
    let lo_frequency = ch.lo_frequency()?;
    writeln!(out, "\nCenter frequency: {} MHz", lo_frequency / 1e6)?;

    let antennas = ch.antenna_list()?;
    writeln!(out, "Available antennae:")?;
    for (i, name) in antennas.iter().enumerate() {
        writeln!(out, "{i}: {name}")?;
    }
    let auto_antenna = ch.antenna()?;
    writeln!(
        out,
        "Automatically selected antenna: {auto_antenna}: {}",
        antenna_name(&antennas, auto_antenna)
    )?;
    ch.set_antenna(config.antenna)?;
    let antenna = ch.antenna()?;
    writeln!(out, "Manually selected antenna: {antenna}: {}", antenna_name(&antennas, antenna))?;

    log::debug!(
        "setting sample rate to {} Hz, oversample {}",
        config.sample_rate,
        config.oversample
    );
    device.set_sample_rate(config.sample_rate, config.oversample)?;
    let sample_rate = ch.sample_rate()?;
    writeln!(
        out,
        "Host interface sample rate: {} MHz\nRF ADC sample rate: {} MHz\n",
        sample_rate.host / 1e6,
        sample_rate.rf / 1e6
    )?;

    let lpf_range = device.lpf_bw_range(dir)?;
    writeln!(
        out,
        "{dir} LPF bandwidth range: {} - {} MHz\n",
        lpf_range.min / 1e6,
        lpf_range.max / 1e6
    )?;
    if !lpf_range.contains(config.lpf_bandwidth) {
        log::warn!("LPF bandwidth {} Hz is outside the device range", config.lpf_bandwidth);
    }
    ch.set_lpf_bw(config.lpf_bandwidth)?;

    ch.set_normalized_gain(config.normalized_gain)?;
    let normalized_gain = ch.normalized_gain()?;
    writeln!(out, "Normalized {dir} Gain: {normalized_gain}")?;
    let gain_db = ch.gain_db()?;
    writeln!(out, "{dir} Gain: {gain_db} dB")?;

    log::debug!("calibrating for {} Hz", config.calibration_bandwidth);
    ch.calibrate(config.calibration_bandwidth, 0)?;

    ch.set_test_signal(config.test_signal, 0, 0)?;

    Ok(Applied {
        lo_frequency,
        antennas,
        auto_antenna,
        antenna,
        sample_rate,
        lpf_range,
        normalized_gain,
        gain_db,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use crate::ManualClock;
    use crate::TestSignal;

    /// Driver calls the sequence makes, in order.
    const SEQUENCE: [&str; 16] = [
        "enable_channel",
        "set_lo_frequency",
        "lo_frequency",
        "antenna_list",
        "antenna",
        "set_antenna",
        "antenna",
        "set_sample_rate",
        "sample_rate",
        "lpf_bw_range",
        "set_lpf_bw",
        "set_normalized_gain",
        "normalized_gain",
        "gain_db",
        "calibrate",
        "set_test_signal",
    ];

    fn driver() -> MockDriver {
        MockDriver::new(ManualClock::new(), vec!["LimeSDR Mini".to_string()])
    }

    #[test]
    fn applies_settings_in_order() {
        let d = driver();
        let dev = Device::open(&d, "LimeSDR Mini").unwrap();
        let cfg = RunConfig::default();
        let mut out = Vec::new();
        let applied = configure(&dev, &cfg, &mut out).unwrap();

        assert_eq!(&d.calls()[1..], &SEQUENCE);
        assert_eq!(applied.lo_frequency, 800e6);
        assert_eq!(applied.auto_antenna, 1);
        assert_eq!(applied.antenna, 3);
        assert_eq!(applied.sample_rate.host, 21e6);
        assert_eq!(applied.sample_rate.rf, 42e6);
        assert_eq!(applied.normalized_gain, 0.7);
        assert_eq!(applied.gain_db, 51);

        let ch = dev.channel(cfg.channel);
        assert_eq!(ch.test_signal().unwrap(), TestSignal::NcoDiv8);
        assert_eq!(ch.lpf_bw().unwrap(), 8e6);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Center frequency: 800 MHz"));
        assert!(text.contains("Automatically selected antenna: 1: LNAH"));
        assert!(text.contains("Manually selected antenna: 3: LNAW"));
        assert!(text.contains("RX Gain: 51 dB"));
    }

    #[test]
    fn first_failure_stops_the_sequence() {
        for (i, &op) in SEQUENCE.iter().enumerate() {
            // "antenna" appears twice; failing the first read covers both
            if SEQUENCE[..i].contains(&op) {
                continue;
            }
            let d = driver();
            let dev = Device::open(&d, "LimeSDR Mini").unwrap();
            d.fail_on(op);
            let r = configure(&dev, &RunConfig::default(), &mut std::io::sink());
            assert!(r.is_err(), "{op} failure not reported");

            let calls = d.calls();
            assert_eq!(calls.last(), Some(&op));
            assert_eq!(&calls[1..], &SEQUENCE[..=i], "calls after {op} failed");
        }
    }
}
