//! One complete RX smoke test: open, configure, stream, shut down.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::sequencer;
use crate::sequencer::Applied;
use crate::AntennaPath;
use crate::ChannelId;
use crate::Clock;
use crate::DataFormat;
use crate::Device;
use crate::Driver;
use crate::LinkFormat;
use crate::LogRegistration;
use crate::Result;
use crate::StreamConfig;
use crate::StreamReport;
use crate::TestSignal;

/// Everything the run does, fixed up front.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub channel: ChannelId,
    pub lo_frequency: f64,
    pub antenna: AntennaPath,
    /// Host sample rate, applied to all channels.
    pub sample_rate: f64,
    /// RF oversampling factor.
    pub oversample: usize,
    pub lpf_bandwidth: f64,
    pub normalized_gain: f64,
    pub calibration_bandwidth: f64,
    pub test_signal: TestSignal,
    /// FIFO size in samples.
    pub fifo_size: u32,
    pub throughput_vs_latency: f32,
    pub data_format: DataFormat,
    /// Complex samples per read.
    pub buffer_size: usize,
    pub read_timeout: Duration,
    pub duration: Duration,
    pub report_interval: Duration,
    /// Where the device configuration is saved after init.
    pub config_snapshot: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            channel: ChannelId::rx(0),
            lo_frequency: 800e6,
            antenna: AntennaPath::Lnaw,
            sample_rate: 21e6,
            oversample: 2,
            lpf_bandwidth: 8e6,
            normalized_gain: 0.7,
            calibration_bandwidth: 8e6,
            test_signal: TestSignal::NcoDiv8,
            fifo_size: 1024 * 1024,
            throughput_vs_latency: 1.0,
            data_format: DataFormat::F32,
            buffer_size: 10_000,
            read_timeout: Duration::from_millis(1000),
            duration: Duration::from_secs(10),
            report_interval: Duration::from_secs(1),
            config_snapshot: std::env::temp_dir().join("LimeMini.ini"),
        }
    }
}

impl RunConfig {
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            channel: self.channel,
            fifo_size: self.fifo_size,
            throughput_vs_latency: self.throughput_vs_latency,
            data_format: self.data_format,
            link_format: LinkFormat::Default,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Outcome {
    /// The driver found nothing to open.
    NoDevices,
    Completed { applied: Applied, report: StreamReport },
}

/// Runs the smoke test against the first device `driver` lists.
///
/// Progress goes to `out`. On any failure the device is closed and the log
/// handler unregistered before the error is returned; errors during that
/// cleanup are logged and dropped.
pub fn run<D, C, W>(driver: &D, clock: &C, config: &RunConfig, out: &mut W) -> Result<Outcome>
where
    D: Driver + ?Sized,
    C: Clock,
    W: Write,
{
    writeln!(out, "Lime API Version: {}", driver.library_version())?;
    let _log = LogRegistration::new(driver, crate::forward_to_log);

    let devices = driver.device_list()?;
    writeln!(out, "{} devices", devices.len())?;
    let Some(first) = devices.first() else {
        return Ok(Outcome::NoDevices);
    };
    for name in &devices {
        writeln!(out, "Device: {name}")?;
    }

    let device = Device::open(driver, first)?;
    let result = session(&device, clock, config, out);
    if let Err(e) = device.close() {
        log::warn!("error closing device: {e}");
    }

    let (applied, report) = result?;
    Ok(Outcome::Completed { applied, report })
}

fn session<D, C, W>(
    device: &Device<'_, D>,
    clock: &C,
    config: &RunConfig,
    out: &mut W,
) -> Result<(Applied, StreamReport)>
where
    D: Driver + ?Sized,
    C: Clock,
    W: Write,
{
    device.init()?;
    if let Err(e) = device.save_config(&config.config_snapshot) {
        log::warn!("could not save config to {}: {e}", config.config_snapshot.display());
    }

    let applied = sequencer::configure(device, config, out)?;

    let mut stream = device.setup_stream(config.stream_config())?;
    let mut buf = stream.buffer(config.buffer_size);
    stream.start()?;
    let report = stream.receive_for(
        clock,
        &mut buf,
        config.read_timeout,
        config.duration,
        config.report_interval,
        out,
    )?;
    stream.stop()?;
    stream.destroy()?;
    drop(buf);

    log::info!(
        "{} samples in {} reads, {} timeouts",
        report.samples,
        report.reads,
        report.timeouts
    );
    writeln!(out, "All Done")?;
    Ok((applied, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use crate::ManualClock;

    #[test]
    fn default_config_matches_the_smoke_test() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.channel, ChannelId::rx(0));
        assert_eq!(cfg.duration, Duration::from_secs(10));
        assert_eq!(cfg.buffer_size, 10_000);
        assert!(cfg.config_snapshot.ends_with("LimeMini.ini"));

        let sc = cfg.stream_config();
        assert_eq!(sc.fifo_size, 1024 * 1024);
        assert_eq!(sc.data_format, DataFormat::F32);
        assert_eq!(sc.throughput_vs_latency, 1.0);
    }

    #[test]
    fn save_config_failure_is_not_fatal() {
        let clock = ManualClock::new();
        let d = MockDriver::new(clock.clone(), vec!["LimeSDR Mini".to_string()]);
        d.set_read_latency(Duration::from_millis(100));
        d.fail_on("save_config");
        let r = run(&d, &clock, &RunConfig::default(), &mut std::io::sink()).unwrap();
        assert!(matches!(r, Outcome::Completed { .. }));
        assert!(d.saved_configs().is_empty());
    }

    #[test]
    fn init_failure_skips_configuration() {
        let clock = ManualClock::new();
        let d = MockDriver::new(clock.clone(), vec!["LimeSDR Mini".to_string()]);
        d.fail_on("init");
        assert!(run(&d, &clock, &RunConfig::default(), &mut std::io::sink()).is_err());
        assert_eq!(d.count("enable_channel"), 0);
        assert_eq!(d.count("close"), 1);
        assert!(!d.log_handler_registered());
    }
}
