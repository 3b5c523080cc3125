use std::io::Write;
use std::time::Duration;

use crate::Clock;
use crate::Device;
use crate::Driver;
use crate::Error;
use crate::Result;
use crate::SampleBuffer;
use crate::StreamConfig;
use crate::StreamHandle;
use crate::StreamMeta;
use crate::StreamStatus;

/// A set-up sample stream.
///
/// Borrowing the [`Device`] keeps the device open for the stream's lifetime.
/// Dropping stops a running stream before destroying it.
pub struct Stream<'a, D: Driver + ?Sized> {
    device: &'a Device<'a, D>,
    handle: Option<StreamHandle>,
    config: StreamConfig,
    running: bool,
}

/// What a timed receive loop saw.
#[derive(Debug, Clone, Default)]
pub struct StreamReport {
    pub reads: usize,
    /// Reads that returned no samples before the timeout.
    pub timeouts: usize,
    pub samples: u64,
    /// Status snapshots with their offset from the start of the loop.
    pub statuses: Vec<(Duration, StreamStatus)>,
    pub elapsed: Duration,
}

impl<'a, D: Driver + ?Sized> Stream<'a, D> {
    pub(crate) fn setup(device: &'a Device<'a, D>, config: StreamConfig) -> Result<Self> {
        let handle = device.driver().setup_stream(device.handle()?, &config)?;
        log::debug!("stream {handle:?} set up on {}", config.channel);
        Ok(Self {
            device,
            handle: Some(handle),
            config,
            running: false,
        })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn handle(&self) -> Result<StreamHandle> {
        self.handle.ok_or(Error::InvalidHandle)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// A host buffer matching the stream's data format.
    pub fn buffer(&self, samples: usize) -> SampleBuffer {
        SampleBuffer::new(self.config.data_format, samples)
    }

    pub fn start(&mut self) -> Result {
        self.device.driver().start_stream(self.handle()?)?;
        self.running = true;
        Ok(())
    }

    pub fn stop(&mut self) -> Result {
        if !self.running {
            return Err(Error::NotRunning);
        }
        self.device.driver().stop_stream(self.handle()?)?;
        self.running = false;
        Ok(())
    }

    pub fn recv(&mut self, buf: &mut SampleBuffer, timeout: Duration) -> Result<usize> {
        self.device.driver().recv_stream(self.handle()?, buf, None, timeout)
    }

    pub fn recv_with_meta(
        &mut self,
        buf: &mut SampleBuffer,
        meta: &mut StreamMeta,
        timeout: Duration,
    ) -> Result<usize> {
        self.device.driver().recv_stream(self.handle()?, buf, Some(meta), timeout)
    }

    pub fn send(
        &mut self,
        buf: &SampleBuffer,
        count: usize,
        meta: Option<&StreamMeta>,
        timeout: Duration,
    ) -> Result<usize> {
        let count = count.min(buf.capacity());
        self.device.driver().send_stream(self.handle()?, buf, count, meta, timeout)
    }

    pub fn status(&self) -> Result<StreamStatus> {
        self.device.driver().stream_status(self.handle()?)
    }

    /// Reads into `buf` until `duration` has passed on `clock`, writing a
    /// status report to `out` whenever more than `interval` has passed since
    /// the previous one.
    ///
    /// The report cadence follows the clock, not the number of reads.
    pub fn receive_for<C: Clock, W: Write>(
        &mut self,
        clock: &C,
        buf: &mut SampleBuffer,
        timeout: Duration,
        duration: Duration,
        interval: Duration,
        out: &mut W,
    ) -> Result<StreamReport> {
        let mut report = StreamReport::default();
        let dir = self.config.channel.direction;
        let watch = clock.stopwatch();
        let mut last = Duration::ZERO;

        while watch.elapsed() < duration {
            let n = self.recv(buf, timeout)?;
            report.reads += 1;
            report.samples += n as u64;
            if n == 0 {
                report.timeouts += 1;
            }

            let now = watch.elapsed();
            if now.saturating_sub(last) > interval {
                last = now;
                let status = self.status()?;
                writeln!(out, "{dir} data rate: {} MB/s", status.link_rate / 1e6)?;
                writeln!(out, "{dir} fifo: {}%", status.fifo_fill_percent())?;
                report.statuses.push((now, status));
            }
        }

        report.elapsed = watch.elapsed();
        Ok(report)
    }

    /// Stops the stream if running and releases it.
    pub fn destroy(mut self) -> Result {
        self.teardown()
    }

    fn teardown(&mut self) -> Result {
        let Some(h) = self.handle else {
            return Ok(());
        };
        let driver = self.device.driver();
        if self.running {
            self.running = false;
            if let Err(e) = driver.stop_stream(h) {
                log::warn!("error stopping stream {h:?}: {e}");
            }
        }
        self.handle = None;
        driver.destroy_stream(self.device.handle()?, h)
    }
}

impl<D: Driver + ?Sized> Drop for Stream<'_, D> {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            log::warn!("error destroying stream: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use crate::ChannelId;
    use crate::ManualClock;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn setup(clock: &ManualClock) -> MockDriver {
        MockDriver::new(clock.clone(), vec!["LimeSDR Mini".to_string()])
    }

    #[test]
    fn drop_stops_then_destroys() {
        let clock = ManualClock::new();
        let d = setup(&clock);
        let dev = Device::open(&d, "LimeSDR Mini").unwrap();
        {
            let mut s = dev.setup_stream(StreamConfig::new(ChannelId::rx(0))).unwrap();
            s.start().unwrap();
            assert_eq!(d.live_streams().len(), 1);
        }
        assert!(d.live_streams().is_empty());
        let calls = d.calls();
        let stop = calls.iter().position(|c| *c == "stop_stream").unwrap();
        let destroy = calls.iter().position(|c| *c == "destroy_stream").unwrap();
        assert!(stop < destroy);
    }

    #[test]
    fn stopped_stream_is_not_stopped_twice() {
        let clock = ManualClock::new();
        let d = setup(&clock);
        let dev = Device::open(&d, "LimeSDR Mini").unwrap();
        let mut s = dev.setup_stream(StreamConfig::new(ChannelId::rx(0))).unwrap();
        s.start().unwrap();
        s.stop().unwrap();
        assert!(matches!(s.stop(), Err(Error::NotRunning)));
        s.destroy().unwrap();
        assert_eq!(d.count("stop_stream"), 1);
        assert_eq!(d.count("destroy_stream"), 1);
    }

    #[test]
    fn rx_metadata_counts_samples() {
        let clock = ManualClock::new();
        let d = setup(&clock);
        let dev = Device::open(&d, "LimeSDR Mini").unwrap();
        let mut s = dev.setup_stream(StreamConfig::new(ChannelId::rx(0))).unwrap();
        let mut buf = s.buffer(100);
        let mut meta = StreamMeta::default();
        s.start().unwrap();
        assert_eq!(s.recv_with_meta(&mut buf, &mut meta, ms(10)).unwrap(), 100);
        assert_eq!(meta.timestamp, 0);
        s.recv_with_meta(&mut buf, &mut meta, ms(10)).unwrap();
        assert_eq!(meta.timestamp, 100);
    }

    #[test]
    fn tx_send_is_clamped_to_the_buffer() {
        let clock = ManualClock::new();
        let d = setup(&clock);
        let dev = Device::open(&d, "LimeSDR Mini").unwrap();
        let mut s = dev.setup_stream(StreamConfig::new(ChannelId::tx(0))).unwrap();
        let buf = s.buffer(64);
        s.start().unwrap();
        assert_eq!(s.send(&buf, 1000, None, ms(10)).unwrap(), 64);
        s.stop().unwrap();
        assert_eq!(s.send(&buf, 10, None, ms(10)).unwrap(), 0);
    }

    #[test]
    fn report_cadence_follows_clock() {
        for (latency, reads, reports) in [(100, 100, 9), (250, 40, 8)] {
            let clock = ManualClock::new();
            let d = setup(&clock);
            d.set_read_latency(ms(latency));
            let dev = Device::open(&d, "LimeSDR Mini").unwrap();
            let mut s = dev.setup_stream(StreamConfig::new(ChannelId::rx(0))).unwrap();
            let mut buf = s.buffer(1000);
            let mut out = Vec::new();
            s.start().unwrap();
            let r = s
                .receive_for(
                    &clock,
                    &mut buf,
                    ms(1000),
                    Duration::from_secs(10),
                    Duration::from_secs(1),
                    &mut out,
                )
                .unwrap();

            assert_eq!(r.reads, reads);
            assert_eq!(r.statuses.len(), reports);
            assert_eq!(r.samples, reads as u64 * 1000);
            assert_eq!(r.elapsed, Duration::from_secs(10));
            for w in r.statuses.windows(2) {
                assert!(w[1].0 - w[0].0 > Duration::from_secs(1));
            }

            let text = String::from_utf8(out).unwrap();
            assert_eq!(text.matches("RX data rate:").count(), reports);
            assert_eq!(text.matches("RX fifo:").count(), reports);
        }
    }

    #[test]
    fn timeouts_are_counted_not_fatal() {
        let clock = ManualClock::new();
        let d = setup(&clock);
        d.set_read_latency(ms(500));
        d.set_starved(true);
        let dev = Device::open(&d, "LimeSDR Mini").unwrap();
        let mut s = dev.setup_stream(StreamConfig::new(ChannelId::rx(0))).unwrap();
        let mut buf = s.buffer(16);
        s.start().unwrap();
        let r = s
            .receive_for(
                &clock,
                &mut buf,
                ms(500),
                Duration::from_secs(2),
                Duration::from_secs(1),
                &mut std::io::sink(),
            )
            .unwrap();
        assert_eq!(r.reads, 4);
        assert_eq!(r.timeouts, 4);
        assert_eq!(r.samples, 0);
    }

    #[test]
    fn read_failure_ends_the_loop() {
        let clock = ManualClock::new();
        let d = setup(&clock);
        d.set_read_latency(ms(100));
        let dev = Device::open(&d, "LimeSDR Mini").unwrap();
        let mut s = dev.setup_stream(StreamConfig::new(ChannelId::rx(0))).unwrap();
        let mut buf = s.buffer(16);
        s.start().unwrap();
        d.fail_on("recv_stream");
        let r = s.receive_for(
            &clock,
            &mut buf,
            ms(1000),
            Duration::from_secs(10),
            Duration::from_secs(1),
            &mut std::io::sink(),
        );
        assert!(matches!(r, Err(Error::Failed { op: "recv_stream", .. })));
    }
}
