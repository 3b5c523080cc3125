//! Scripted in-memory [`Driver`] for tests and dry runs.
//!
//! Every call is recorded by name. [`MockDriver::fail_on`] makes the next
//! call of a given name fail. Reads advance a shared [`ManualClock`] so that
//! timed loops run instantly.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::ChannelId;
use crate::DeviceHandle;
use crate::Direction;
use crate::Driver;
use crate::Error;
use crate::Gfir;
use crate::LogHandler;
use crate::LogLevel;
use crate::ManualClock;
use crate::NcoFrequencies;
use crate::NcoPhases;
use crate::Range;
use crate::Result;
use crate::SampleBuffer;
use crate::SampleRate;
use crate::StreamConfig;
use crate::StreamHandle;
use crate::StreamMeta;
use crate::StreamStatus;
use crate::TestSignal;
use crate::NCO_VAL_COUNT;

const ANTENNAS: [&str; 4] = ["NONE", "LNAH", "LNAL", "LNAW"];
const MAX_GAIN_DB: f64 = 73.0;
// mid-scale of the trim DAC
const VCTCXO_DEFAULT: u16 = 0x8000;

fn gfir_slot(filt: Gfir) -> usize {
    u32::from(filt) as usize
}

#[derive(Debug, Clone, Default)]
struct ChannelState {
    enabled: bool,
    lo: f64,
    antenna: usize,
    lpf_bw: f64,
    gain: f64,
    test_signal: Option<TestSignal>,
    nco_frequency: NcoFrequencies,
    nco_phase: NcoPhases,
    nco_index: usize,
    nco_downconvert: bool,
    gfir: [Vec<f64>; 3],
    gfir_enabled: [bool; 3],
}

#[derive(Debug, Clone)]
struct StreamState {
    config: StreamConfig,
    running: bool,
    received: u64,
}

#[derive(Default)]
struct State {
    calls: Vec<&'static str>,
    fail_on: BTreeSet<&'static str>,
    log_handler: Option<LogHandler>,
    next_handle: usize,
    devices: BTreeSet<DeviceHandle>,
    streams: BTreeMap<StreamHandle, StreamState>,
    channels: BTreeMap<(DeviceHandle, Direction, u32), ChannelState>,
    sample_rate: f64,
    oversample: usize,
    saved: Vec<PathBuf>,
    vctcxo: BTreeMap<DeviceHandle, u16>,
    read_latency: Duration,
    starved: bool,
}

pub struct MockDriver {
    clock: ManualClock,
    devices: Vec<String>,
    state: RefCell<State>,
}

impl MockDriver {
    /// A driver that enumerates `devices`.
    pub fn new(clock: ManualClock, devices: Vec<String>) -> Self {
        Self {
            clock,
            devices,
            state: RefCell::new(State {
                sample_rate: 30.72e6,
                oversample: 1,
                read_latency: Duration::from_millis(1),
                ..Default::default()
            }),
        }
    }

    /// Makes the next call named `op` fail.
    pub fn fail_on(&self, op: &'static str) {
        self.state.borrow_mut().fail_on.insert(op);
    }

    /// Clock time each successful read takes.
    pub fn set_read_latency(&self, latency: Duration) {
        self.state.borrow_mut().read_latency = latency;
    }

    /// When set, every read waits out its timeout and returns nothing.
    pub fn set_starved(&self, starved: bool) {
        self.state.borrow_mut().starved = starved;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.borrow().calls.clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.state.borrow().calls.iter().filter(|c| **c == op).count()
    }

    pub fn open_devices(&self) -> Vec<DeviceHandle> {
        self.state.borrow().devices.iter().copied().collect()
    }

    pub fn live_streams(&self) -> Vec<StreamHandle> {
        self.state.borrow().streams.keys().copied().collect()
    }

    pub fn log_handler_registered(&self) -> bool {
        self.state.borrow().log_handler.is_some()
    }

    pub fn channel_enabled(&self, dev: DeviceHandle, ch: ChannelId) -> bool {
        self.state
            .borrow()
            .channels
            .get(&(dev, ch.direction, ch.index))
            .is_some_and(|c| c.enabled)
    }

    pub fn gfir_enabled(&self, dev: DeviceHandle, ch: ChannelId, filt: Gfir) -> bool {
        self.state
            .borrow()
            .channels
            .get(&(dev, ch.direction, ch.index))
            .is_some_and(|c| c.gfir_enabled[gfir_slot(filt)])
    }

    pub fn nco_downconvert(&self, dev: DeviceHandle, ch: ChannelId) -> bool {
        self.state
            .borrow()
            .channels
            .get(&(dev, ch.direction, ch.index))
            .is_some_and(|c| c.nco_downconvert)
    }

    pub fn saved_configs(&self) -> Vec<PathBuf> {
        self.state.borrow().saved.clone()
    }

    fn call(&self, op: &'static str) -> Result {
        let mut s = self.state.borrow_mut();
        s.calls.push(op);
        if s.fail_on.remove(op) {
            let handler = s.log_handler;
            drop(s);
            let msg = format!("{op} rejected by device");
            if let Some(h) = handler {
                h(LogLevel::Error, &msg);
            }
            return Err(Error::failed(op, msg));
        }
        Ok(())
    }

    fn device(&self, op: &'static str, dev: DeviceHandle) -> Result {
        self.call(op)?;
        if self.state.borrow().devices.contains(&dev) {
            Ok(())
        } else {
            Err(Error::InvalidHandle)
        }
    }

    fn with_channel<T>(
        &self,
        op: &'static str,
        dev: DeviceHandle,
        ch: ChannelId,
        f: impl FnOnce(&mut ChannelState) -> T,
    ) -> Result<T> {
        self.device(op, dev)?;
        let mut s = self.state.borrow_mut();
        let state = s.channels.entry((dev, ch.direction, ch.index)).or_default();
        Ok(f(state))
    }

    fn with_stream<T>(
        &self,
        op: &'static str,
        stream: StreamHandle,
        f: impl FnOnce(&mut StreamState) -> T,
    ) -> Result<T> {
        self.call(op)?;
        let mut s = self.state.borrow_mut();
        let state = s.streams.get_mut(&stream).ok_or(Error::InvalidHandle)?;
        Ok(f(state))
    }
}

impl Driver for MockDriver {
    fn library_version(&self) -> String {
        "mock".to_string()
    }

    fn register_log_handler(&self, handler: Option<LogHandler>) {
        let mut s = self.state.borrow_mut();
        s.calls.push("register_log_handler");
        s.log_handler = handler;
    }

    fn device_list(&self) -> Result<Vec<String>> {
        self.call("device_list")?;
        Ok(self.devices.clone())
    }

    fn open(&self, info: &str) -> Result<DeviceHandle> {
        self.call("open")?;
        if !self.devices.iter().any(|d| d == info) {
            return Err(Error::failed("open", format!("no device matches {info}")));
        }
        let mut s = self.state.borrow_mut();
        let h = DeviceHandle(s.next_handle);
        s.next_handle += 1;
        s.devices.insert(h);
        Ok(h)
    }

    fn close(&self, dev: DeviceHandle) -> Result {
        self.call("close")?;
        let mut s = self.state.borrow_mut();
        if !s.devices.remove(&dev) {
            return Err(Error::InvalidHandle);
        }
        s.channels.retain(|(d, _, _), _| *d != dev);
        Ok(())
    }

    fn init(&self, dev: DeviceHandle) -> Result {
        self.device("init", dev)
    }

    fn reset(&self, dev: DeviceHandle) -> Result {
        self.device("reset", dev)?;
        self.state.borrow_mut().channels.retain(|(d, _, _), _| *d != dev);
        Ok(())
    }

    fn num_channels(&self, dev: DeviceHandle, _dir: Direction) -> Result<usize> {
        self.device("num_channels", dev)?;
        Ok(2)
    }

    fn load_config(&self, dev: DeviceHandle, _path: &Path) -> Result {
        self.device("load_config", dev)
    }

    fn save_config(&self, dev: DeviceHandle, path: &Path) -> Result {
        self.device("save_config", dev)?;
        self.state.borrow_mut().saved.push(path.to_path_buf());
        Ok(())
    }

    fn enable_channel(&self, dev: DeviceHandle, ch: ChannelId, enabled: bool) -> Result {
        self.with_channel("enable_channel", dev, ch, |c| c.enabled = enabled)
    }

    fn set_sample_rate(&self, dev: DeviceHandle, rate: f64, oversample: usize) -> Result {
        self.device("set_sample_rate", dev)?;
        let mut s = self.state.borrow_mut();
        s.sample_rate = rate;
        s.oversample = oversample.max(1);
        Ok(())
    }

    fn set_sample_rate_dir(
        &self,
        dev: DeviceHandle,
        _dir: Direction,
        rate: f64,
        oversample: usize,
    ) -> Result {
        self.device("set_sample_rate_dir", dev)?;
        let mut s = self.state.borrow_mut();
        s.sample_rate = rate;
        s.oversample = oversample.max(1);
        Ok(())
    }

    fn sample_rate(&self, dev: DeviceHandle, _ch: ChannelId) -> Result<SampleRate> {
        self.device("sample_rate", dev)?;
        let s = self.state.borrow();
        Ok(SampleRate {
            host: s.sample_rate,
            rf: s.sample_rate * s.oversample as f64,
        })
    }

    fn set_lo_frequency(&self, dev: DeviceHandle, ch: ChannelId, frequency: f64) -> Result {
        self.with_channel("set_lo_frequency", dev, ch, |c| c.lo = frequency)
    }

    fn lo_frequency(&self, dev: DeviceHandle, ch: ChannelId) -> Result<f64> {
        self.with_channel("lo_frequency", dev, ch, |c| c.lo)
    }

    fn antenna_list(&self, dev: DeviceHandle, _ch: ChannelId) -> Result<Vec<String>> {
        self.device("antenna_list", dev)?;
        Ok(ANTENNAS.iter().map(|a| a.to_string()).collect())
    }

    fn set_antenna(&self, dev: DeviceHandle, ch: ChannelId, index: usize) -> Result {
        if index >= ANTENNAS.len() {
            self.call("set_antenna")?;
            return Err(Error::failed("set_antenna", format!("no antenna {index}")));
        }
        self.with_channel("set_antenna", dev, ch, |c| c.antenna = index)
    }

    fn antenna(&self, dev: DeviceHandle, ch: ChannelId) -> Result<usize> {
        // the driver picks LNAH until told otherwise
        self.with_channel("antenna", dev, ch, |c| if c.antenna == 0 { 1 } else { c.antenna })
    }

    fn lpf_bw_range(&self, dev: DeviceHandle, _dir: Direction) -> Result<Range> {
        self.device("lpf_bw_range", dev)?;
        Ok(Range {
            min: 1.4001e6,
            max: 130e6,
            step: 1.0,
        })
    }

    fn set_lpf_bw(&self, dev: DeviceHandle, ch: ChannelId, bandwidth: f64) -> Result {
        self.with_channel("set_lpf_bw", dev, ch, |c| c.lpf_bw = bandwidth)
    }

    fn lpf_bw(&self, dev: DeviceHandle, ch: ChannelId) -> Result<f64> {
        self.with_channel("lpf_bw", dev, ch, |c| c.lpf_bw)
    }

    fn set_lpf(&self, dev: DeviceHandle, ch: ChannelId, _enabled: bool) -> Result {
        self.with_channel("set_lpf", dev, ch, |_| ())
    }

    fn set_gfir_lpf(
        &self,
        dev: DeviceHandle,
        ch: ChannelId,
        _enabled: bool,
        _bandwidth: f64,
    ) -> Result {
        self.with_channel("set_gfir_lpf", dev, ch, |_| ())
    }

    fn set_normalized_gain(&self, dev: DeviceHandle, ch: ChannelId, gain: f64) -> Result {
        self.with_channel("set_normalized_gain", dev, ch, |c| c.gain = gain.clamp(0.0, 1.0))
    }

    fn normalized_gain(&self, dev: DeviceHandle, ch: ChannelId) -> Result<f64> {
        self.with_channel("normalized_gain", dev, ch, |c| c.gain)
    }

    fn set_gain_db(&self, dev: DeviceHandle, ch: ChannelId, gain: u32) -> Result {
        self.with_channel("set_gain_db", dev, ch, |c| {
            c.gain = (gain as f64 / MAX_GAIN_DB).clamp(0.0, 1.0)
        })
    }

    fn gain_db(&self, dev: DeviceHandle, ch: ChannelId) -> Result<u32> {
        self.with_channel("gain_db", dev, ch, |c| (c.gain * MAX_GAIN_DB).round() as u32)
    }

    fn calibrate(&self, dev: DeviceHandle, ch: ChannelId, _bandwidth: f64, _flags: u32) -> Result {
        self.with_channel("calibrate", dev, ch, |_| ())
    }

    fn set_test_signal(
        &self,
        dev: DeviceHandle,
        ch: ChannelId,
        sig: TestSignal,
        _dc_i: i16,
        _dc_q: i16,
    ) -> Result {
        self.with_channel("set_test_signal", dev, ch, |c| c.test_signal = Some(sig))
    }

    fn test_signal(&self, dev: DeviceHandle, ch: ChannelId) -> Result<TestSignal> {
        self.with_channel("test_signal", dev, ch, |c| c.test_signal.unwrap_or(TestSignal::None))
    }

    fn set_nco_frequency(&self, dev: DeviceHandle, ch: ChannelId, nco: &NcoFrequencies) -> Result {
        self.with_channel("set_nco_frequency", dev, ch, |c| c.nco_frequency = *nco)
    }

    fn nco_frequency(&self, dev: DeviceHandle, ch: ChannelId) -> Result<NcoFrequencies> {
        self.with_channel("nco_frequency", dev, ch, |c| c.nco_frequency)
    }

    fn set_nco_phase(&self, dev: DeviceHandle, ch: ChannelId, nco: &NcoPhases) -> Result {
        self.with_channel("set_nco_phase", dev, ch, |c| c.nco_phase = *nco)
    }

    fn nco_phase(&self, dev: DeviceHandle, ch: ChannelId) -> Result<NcoPhases> {
        self.with_channel("nco_phase", dev, ch, |c| c.nco_phase)
    }

    fn set_nco_index(
        &self,
        dev: DeviceHandle,
        ch: ChannelId,
        index: usize,
        downconvert: bool,
    ) -> Result {
        self.with_channel("set_nco_index", dev, ch, |c| {
            if index >= NCO_VAL_COUNT {
                return Err(Error::failed("set_nco_index", "index out of range"));
            }
            c.nco_index = index;
            c.nco_downconvert = downconvert;
            Ok(())
        })?
    }

    fn nco_index(&self, dev: DeviceHandle, ch: ChannelId) -> Result<usize> {
        self.with_channel("nco_index", dev, ch, |c| c.nco_index)
    }

    fn set_gfir_coeff(&self, dev: DeviceHandle, ch: ChannelId, filt: Gfir, coef: &[f64]) -> Result {
        self.with_channel("set_gfir_coeff", dev, ch, |c| {
            if coef.len() > filt.coeff_count() {
                return Err(Error::failed("set_gfir_coeff", "too many coefficients"));
            }
            c.gfir[gfir_slot(filt)] = coef.to_vec();
            Ok(())
        })?
    }

    fn gfir_coeff(&self, dev: DeviceHandle, ch: ChannelId, filt: Gfir) -> Result<Vec<f64>> {
        self.with_channel("gfir_coeff", dev, ch, |c| {
            let mut coef = c.gfir[gfir_slot(filt)].clone();
            coef.resize(filt.coeff_count(), 0.0);
            coef
        })
    }

    fn set_gfir(&self, dev: DeviceHandle, ch: ChannelId, filt: Gfir, enabled: bool) -> Result {
        self.with_channel("set_gfir", dev, ch, |c| c.gfir_enabled[gfir_slot(filt)] = enabled)
    }

    fn vctcxo_write(&self, dev: DeviceHandle, value: u16) -> Result {
        self.device("vctcxo_write", dev)?;
        self.state.borrow_mut().vctcxo.insert(dev, value);
        Ok(())
    }

    fn vctcxo_read(&self, dev: DeviceHandle) -> Result<u16> {
        self.device("vctcxo_read", dev)?;
        Ok(self.state.borrow().vctcxo.get(&dev).copied().unwrap_or(VCTCXO_DEFAULT))
    }

    fn setup_stream(&self, dev: DeviceHandle, config: &StreamConfig) -> Result<StreamHandle> {
        self.device("setup_stream", dev)?;
        let mut s = self.state.borrow_mut();
        let h = StreamHandle(s.next_handle);
        s.next_handle += 1;
        s.streams.insert(
            h,
            StreamState {
                config: config.clone(),
                running: false,
                received: 0,
            },
        );
        Ok(h)
    }

    fn destroy_stream(&self, dev: DeviceHandle, stream: StreamHandle) -> Result {
        self.device("destroy_stream", dev)?;
        let mut s = self.state.borrow_mut();
        match s.streams.get(&stream) {
            None => Err(Error::InvalidHandle),
            Some(st) if st.running => Err(Error::failed("destroy_stream", "stream still running")),
            Some(_) => {
                s.streams.remove(&stream);
                Ok(())
            }
        }
    }

    fn start_stream(&self, stream: StreamHandle) -> Result {
        self.with_stream("start_stream", stream, |st| st.running = true)
    }

    fn stop_stream(&self, stream: StreamHandle) -> Result {
        self.with_stream("stop_stream", stream, |st| st.running = false)
    }

    fn recv_stream(
        &self,
        stream: StreamHandle,
        buf: &mut SampleBuffer,
        meta: Option<&mut StreamMeta>,
        timeout: Duration,
    ) -> Result<usize> {
        let (stream_state, starved, latency) = {
            let s = self.state.borrow();
            (
                s.streams.get(&stream).map(|st| (st.running, st.config.data_format)),
                s.starved,
                s.read_latency,
            )
        };
        self.call("recv_stream")?;
        match stream_state {
            None => return Err(Error::InvalidHandle),
            Some((_, format)) if format != buf.format() => {
                return Err(Error::failed("recv_stream", "buffer format does not match stream"))
            }
            Some((false, _)) => return Err(Error::NotRunning),
            Some((true, _)) => {}
        }

        if starved || latency > timeout {
            self.clock.advance(timeout);
            return Ok(0);
        }
        self.clock.advance(latency);

        let n = buf.capacity();
        let mut s = self.state.borrow_mut();
        let Some(st) = s.streams.get_mut(&stream) else {
            return Err(Error::InvalidHandle);
        };
        if let Some(m) = meta {
            m.timestamp = st.received;
        }
        st.received += n as u64;
        Ok(n)
    }

    fn send_stream(
        &self,
        stream: StreamHandle,
        buf: &SampleBuffer,
        count: usize,
        _meta: Option<&StreamMeta>,
        _timeout: Duration,
    ) -> Result<usize> {
        self.with_stream("send_stream", stream, |st| {
            if st.config.data_format != buf.format() {
                Err(Error::failed("send_stream", "buffer format does not match stream"))
            } else if st.config.channel.direction.is_tx() && st.running {
                Ok(count)
            } else {
                Ok(0)
            }
        })?
    }

    fn stream_status(&self, stream: StreamHandle) -> Result<StreamStatus> {
        self.call("stream_status")?;
        let s = self.state.borrow();
        let st = s.streams.get(&stream).ok_or(Error::InvalidHandle)?;
        let fifo_size = st.config.fifo_size;
        Ok(StreamStatus {
            active: st.running,
            fifo_filled_count: fifo_size / 4,
            fifo_size,
            sample_rate: s.sample_rate,
            // 12-bit I and Q on the wire
            link_rate: s.sample_rate * 3.0,
            timestamp: st.received,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Clock;

    fn mock() -> MockDriver {
        MockDriver::new(ManualClock::new(), vec!["LimeSDR Mini".to_string()])
    }

    #[test]
    fn failure_is_injected_once() {
        let d = mock();
        d.fail_on("device_list");
        assert!(d.device_list().is_err());
        assert_eq!(d.device_list().unwrap().len(), 1);
        assert_eq!(d.count("device_list"), 2);
    }

    #[test]
    fn calls_on_closed_device_are_rejected() {
        let d = mock();
        let h = d.open("LimeSDR Mini").unwrap();
        d.close(h).unwrap();
        assert!(matches!(d.init(h), Err(Error::InvalidHandle)));
        assert!(matches!(d.close(h), Err(Error::InvalidHandle)));
    }

    #[test]
    fn running_stream_cannot_be_destroyed() {
        let d = mock();
        let h = d.open("LimeSDR Mini").unwrap();
        let s = d.setup_stream(h, &StreamConfig::new(ChannelId::rx(0))).unwrap();
        d.start_stream(s).unwrap();
        assert!(d.destroy_stream(h, s).is_err());
        d.stop_stream(s).unwrap();
        d.destroy_stream(h, s).unwrap();
        assert!(d.live_streams().is_empty());
    }

    #[test]
    fn reads_advance_the_clock() {
        let clock = ManualClock::new();
        let d = MockDriver::new(clock.clone(), vec!["LimeSDR Mini".to_string()]);
        d.set_read_latency(Duration::from_millis(20));
        let h = d.open("LimeSDR Mini").unwrap();
        let s = d.setup_stream(h, &StreamConfig::new(ChannelId::rx(0))).unwrap();
        d.start_stream(s).unwrap();

        let mut buf = SampleBuffer::new(crate::DataFormat::F32, 64);
        let mut meta = StreamMeta::default();
        assert_eq!(d.recv_stream(s, &mut buf, None, Duration::from_secs(1)).unwrap(), 64);
        let n = d.recv_stream(s, &mut buf, Some(&mut meta), Duration::from_secs(1)).unwrap();
        assert_eq!(n, 64);
        assert_eq!(meta.timestamp, 64);
        assert_eq!(clock.now(), Duration::from_millis(40));
    }

    #[test]
    fn gain_db_tracks_normalized_gain() {
        let d = mock();
        let h = d.open("LimeSDR Mini").unwrap();
        let ch = ChannelId::rx(0);
        d.set_normalized_gain(h, ch, 0.7).unwrap();
        assert_eq!(d.gain_db(h, ch).unwrap(), 51);
    }

    #[test]
    fn buffer_format_must_match_the_stream() {
        let d = mock();
        let h = d.open("LimeSDR Mini").unwrap();
        let rx = d.setup_stream(h, &StreamConfig::new(ChannelId::rx(0))).unwrap();
        d.start_stream(rx).unwrap();
        let mut wrong = SampleBuffer::new(crate::DataFormat::I16, 64);
        let r = d.recv_stream(rx, &mut wrong, None, Duration::from_secs(1));
        assert!(matches!(r, Err(Error::Failed { op: "recv_stream", .. })));

        let tx = d.setup_stream(h, &StreamConfig::new(ChannelId::tx(0))).unwrap();
        d.start_stream(tx).unwrap();
        let r = d.send_stream(tx, &wrong, 64, None, Duration::from_secs(1));
        assert!(matches!(r, Err(Error::Failed { op: "send_stream", .. })));
        let right = SampleBuffer::new(crate::DataFormat::F32, 64);
        assert_eq!(d.send_stream(tx, &right, 64, None, Duration::from_secs(1)).unwrap(), 64);
    }
}
