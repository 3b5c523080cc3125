//! [`Driver`] backed by the native LimeSuite library.

use limesuite_sys as sys;
use std::cell::RefCell;
use std::ffi::CStr;
use std::ffi::CString;
use std::os::raw::c_char;
use std::os::raw::c_int;
use std::os::raw::c_uint;
use std::path::Path;
use std::ptr;
use std::sync::Mutex;
use std::time::Duration;

use crate::ChannelId;
use crate::DataFormat;
use crate::DeviceHandle;
use crate::Direction;
use crate::Driver;
use crate::Error;
use crate::Gfir;
use crate::LogHandler;
use crate::LogLevel;
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

// The enumeration writes every device it finds, however large the buffer.
const DEVICE_LIST_HEADROOM: usize = 16;
const GFIR_MAX_COEFFS: usize = 120;

pub fn version() -> String {
    unsafe { string(sys::LMS_GetLibraryVersion()) }
}

// The C API takes a bare function pointer, so the Rust handler is global.
static LOG_HANDLER: Mutex<Option<LogHandler>> = Mutex::new(None);

unsafe extern "C" fn log_trampoline(lvl: c_int, msg: *const c_char) {
    let handler = *LOG_HANDLER.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(h) = handler {
        if !msg.is_null() {
            let msg = CStr::from_ptr(msg).to_string_lossy();
            h(LogLevel::from(lvl), &msg);
        }
    }
}

/// # Safety
/// `p` must be null or point to a NUL-terminated string.
unsafe fn string(p: *const c_char) -> String {
    if p.is_null() {
        String::new()
    } else {
        CStr::from_ptr(p).to_string_lossy().into_owned()
    }
}

/// Reads a fixed-size, NUL-padded C string.
fn fixed_string(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// The first `count` entries of a list the library filled in.
fn names<const N: usize>(
    op: &'static str,
    mut list: Vec<[c_char; N]>,
    count: usize,
) -> Result<Vec<String>> {
    if count > list.len() {
        return Err(Error::failed(op, "list grew while it was being read"));
    }
    list.truncate(count);
    Ok(list.iter().map(|s| fixed_string(s)).collect())
}

fn c_path(path: &Path) -> Result<CString> {
    let s = path.to_str().ok_or(Error::InvalidString)?;
    CString::new(s).map_err(|_| Error::InvalidString)
}

fn timeout_ms(timeout: Duration) -> c_uint {
    timeout.as_millis().min(c_uint::MAX as u128) as c_uint
}

fn res(op: &'static str, r: c_int) -> Result {
    if r == sys::LMS_SUCCESS {
        Ok(())
    } else {
        Err(Error::failed(op, unsafe { string(sys::LMS_GetLastErrorMessage()) }))
    }
}

/// Negative returns are errors, anything else is a count or index.
fn checked(op: &'static str, r: c_int) -> Result<usize> {
    if r < 0 {
        Err(Error::failed(op, unsafe { string(sys::LMS_GetLastErrorMessage()) }))
    } else {
        Ok(r as usize)
    }
}

/// Stores `value` in the first free slot and returns its index.
fn insert_slot<T>(slots: &mut Vec<Option<T>>, value: T) -> usize {
    match slots.iter().position(Option::is_none) {
        Some(i) => {
            slots[i] = Some(value);
            i
        }
        None => {
            slots.push(Some(value));
            slots.len() - 1
        }
    }
}

fn raw_meta(m: &StreamMeta) -> sys::lms_stream_meta_t {
    sys::lms_stream_meta_t {
        timestamp: m.timestamp,
        waitForTimestamp: m.wait_for_timestamp,
        flushPartialPacket: m.flush_partial_packet,
    }
}

struct StreamSlot {
    device: DeviceHandle,
    format: DataFormat,
    running: bool,
    // boxed: the library keeps the address between calls
    inner: Box<sys::lms_stream_t>,
}

/// The native driver.
///
/// Handles index into tables owned by this value and are reused once
/// released. Anything still open when it is dropped is stopped, destroyed and
/// closed.
#[derive(Default)]
pub struct LimeSuite {
    devices: RefCell<Vec<Option<*mut sys::lms_device_t>>>,
    streams: RefCell<Vec<Option<StreamSlot>>>,
}

impl LimeSuite {
    pub fn new() -> Self {
        Self::default()
    }

    fn dev(&self, h: DeviceHandle) -> Result<*mut sys::lms_device_t> {
        self.devices.borrow().get(h.0).copied().flatten().ok_or(Error::InvalidHandle)
    }

    /// Device pointer, direction flag and channel index for a channel call.
    fn chan(
        &self,
        h: DeviceHandle,
        ch: ChannelId,
    ) -> Result<(*mut sys::lms_device_t, bool, usize)> {
        Ok((self.dev(h)?, ch.direction.is_tx(), ch.index as usize))
    }

    fn stream(&self, h: StreamHandle) -> Result<(*mut sys::lms_stream_t, DataFormat)> {
        let mut streams = self.streams.borrow_mut();
        let slot = streams.get_mut(h.0).and_then(Option::as_mut).ok_or(Error::InvalidHandle)?;
        Ok((&mut *slot.inner as *mut _, slot.format))
    }

    fn set_running(&self, h: StreamHandle, running: bool) {
        if let Some(Some(slot)) = self.streams.borrow_mut().get_mut(h.0) {
            slot.running = running;
        }
    }
}

impl Driver for LimeSuite {
    fn library_version(&self) -> String {
        version()
    }

    fn register_log_handler(&self, handler: Option<LogHandler>) {
        match handler {
            Some(h) => {
                *LOG_HANDLER.lock().unwrap_or_else(|e| e.into_inner()) = Some(h);
                unsafe { sys::LMS_RegisterLogHandler(Some(log_trampoline)) }
            }
            None => {
                unsafe { sys::LMS_RegisterLogHandler(None) }
                *LOG_HANDLER.lock().unwrap_or_else(|e| e.into_inner()) = None;
            }
        }
    }

    fn device_list(&self) -> Result<Vec<String>> {
        let n = checked("device_list", unsafe { sys::LMS_GetDeviceList(ptr::null_mut()) })?;
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut list: Vec<sys::lms_info_str_t> = vec![[0; 256]; n + DEVICE_LIST_HEADROOM];
        let m = checked("device_list", unsafe { sys::LMS_GetDeviceList(list.as_mut_ptr()) })?;
        names("device_list", list, m)
    }

    fn open(&self, info: &str) -> Result<DeviceHandle> {
        let info = CString::new(info).map_err(|_| Error::InvalidString)?;
        let mut dev = ptr::null_mut();
        res("open", unsafe { sys::LMS_Open(&mut dev, info.as_ptr(), ptr::null_mut()) })?;
        Ok(DeviceHandle(insert_slot(&mut self.devices.borrow_mut(), dev)))
    }

    fn close(&self, dev: DeviceHandle) -> Result {
        let d = self
            .devices
            .borrow_mut()
            .get_mut(dev.0)
            .and_then(Option::take)
            .ok_or(Error::InvalidHandle)?;
        res("close", unsafe { sys::LMS_Close(d) })
    }

    fn init(&self, dev: DeviceHandle) -> Result {
        res("init", unsafe { sys::LMS_Init(self.dev(dev)?) })
    }

    fn reset(&self, dev: DeviceHandle) -> Result {
        res("reset", unsafe { sys::LMS_Reset(self.dev(dev)?) })
    }

    fn num_channels(&self, dev: DeviceHandle, dir: Direction) -> Result<usize> {
        checked("num_channels", unsafe {
            sys::LMS_GetNumChannels(self.dev(dev)?, dir.is_tx())
        })
    }

    fn load_config(&self, dev: DeviceHandle, path: &Path) -> Result {
        let path = c_path(path)?;
        res("load_config", unsafe { sys::LMS_LoadConfig(self.dev(dev)?, path.as_ptr()) })
    }

    fn save_config(&self, dev: DeviceHandle, path: &Path) -> Result {
        let path = c_path(path)?;
        res("save_config", unsafe { sys::LMS_SaveConfig(self.dev(dev)?, path.as_ptr()) })
    }

    fn enable_channel(&self, dev: DeviceHandle, ch: ChannelId, enabled: bool) -> Result {
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("enable_channel", unsafe { sys::LMS_EnableChannel(d, tx, idx, enabled) })
    }

    fn set_sample_rate(&self, dev: DeviceHandle, rate: f64, oversample: usize) -> Result {
        res("set_sample_rate", unsafe {
            sys::LMS_SetSampleRate(self.dev(dev)?, rate, oversample)
        })
    }

    fn set_sample_rate_dir(
        &self,
        dev: DeviceHandle,
        dir: Direction,
        rate: f64,
        oversample: usize,
    ) -> Result {
        res("set_sample_rate_dir", unsafe {
            sys::LMS_SetSampleRateDir(self.dev(dev)?, dir.is_tx(), rate, oversample)
        })
    }

    fn sample_rate(&self, dev: DeviceHandle, ch: ChannelId) -> Result<SampleRate> {
        let (d, tx, idx) = self.chan(dev, ch)?;
        let mut host = 0.0;
        let mut rf = 0.0;
        res("sample_rate", unsafe {
            sys::LMS_GetSampleRate(d, tx, idx, &mut host, &mut rf)
        })?;
        Ok(SampleRate { host, rf })
    }

    fn set_lo_frequency(&self, dev: DeviceHandle, ch: ChannelId, frequency: f64) -> Result {
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("set_lo_frequency", unsafe { sys::LMS_SetLOFrequency(d, tx, idx, frequency) })
    }

    fn lo_frequency(&self, dev: DeviceHandle, ch: ChannelId) -> Result<f64> {
        let (d, tx, idx) = self.chan(dev, ch)?;
        let mut f = 0.0;
        res("lo_frequency", unsafe { sys::LMS_GetLOFrequency(d, tx, idx, &mut f) })?;
        Ok(f)
    }

    fn antenna_list(&self, dev: DeviceHandle, ch: ChannelId) -> Result<Vec<String>> {
        let (d, tx, idx) = self.chan(dev, ch)?;
        let n = checked("antenna_list", unsafe {
            sys::LMS_GetAntennaList(d, tx, idx, ptr::null_mut())
        })?;
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut list: Vec<sys::lms_name_t> = vec![[0; 16]; n];
        let m = checked("antenna_list", unsafe {
            sys::LMS_GetAntennaList(d, tx, idx, list.as_mut_ptr())
        })?;
        names("antenna_list", list, m)
    }

    fn set_antenna(&self, dev: DeviceHandle, ch: ChannelId, index: usize) -> Result {
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("set_antenna", unsafe { sys::LMS_SetAntenna(d, tx, idx, index) })
    }

    fn antenna(&self, dev: DeviceHandle, ch: ChannelId) -> Result<usize> {
        let (d, tx, idx) = self.chan(dev, ch)?;
        checked("antenna", unsafe { sys::LMS_GetAntenna(d, tx, idx) })
    }

    fn lpf_bw_range(&self, dev: DeviceHandle, dir: Direction) -> Result<Range> {
        let mut r = sys::lms_range_t::default();
        res("lpf_bw_range", unsafe {
            sys::LMS_GetLPFBWRange(self.dev(dev)?, dir.is_tx(), &mut r)
        })?;
        Ok(Range {
            min: r.min,
            max: r.max,
            step: r.step,
        })
    }

    fn set_lpf_bw(&self, dev: DeviceHandle, ch: ChannelId, bandwidth: f64) -> Result {
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("set_lpf_bw", unsafe { sys::LMS_SetLPFBW(d, tx, idx, bandwidth) })
    }

    fn lpf_bw(&self, dev: DeviceHandle, ch: ChannelId) -> Result<f64> {
        let (d, tx, idx) = self.chan(dev, ch)?;
        let mut bw = 0.0;
        res("lpf_bw", unsafe { sys::LMS_GetLPFBW(d, tx, idx, &mut bw) })?;
        Ok(bw)
    }

    fn set_lpf(&self, dev: DeviceHandle, ch: ChannelId, enabled: bool) -> Result {
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("set_lpf", unsafe { sys::LMS_SetLPF(d, tx, idx, enabled) })
    }

    fn set_gfir_lpf(
        &self,
        dev: DeviceHandle,
        ch: ChannelId,
        enabled: bool,
        bandwidth: f64,
    ) -> Result {
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("set_gfir_lpf", unsafe { sys::LMS_SetGFIRLPF(d, tx, idx, enabled, bandwidth) })
    }

    fn set_normalized_gain(&self, dev: DeviceHandle, ch: ChannelId, gain: f64) -> Result {
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("set_normalized_gain", unsafe { sys::LMS_SetNormalizedGain(d, tx, idx, gain) })
    }

    fn normalized_gain(&self, dev: DeviceHandle, ch: ChannelId) -> Result<f64> {
        let (d, tx, idx) = self.chan(dev, ch)?;
        let mut g = 0.0;
        res("normalized_gain", unsafe { sys::LMS_GetNormalizedGain(d, tx, idx, &mut g) })?;
        Ok(g)
    }

    fn set_gain_db(&self, dev: DeviceHandle, ch: ChannelId, gain: u32) -> Result {
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("set_gain_db", unsafe { sys::LMS_SetGaindB(d, tx, idx, gain) })
    }

    fn gain_db(&self, dev: DeviceHandle, ch: ChannelId) -> Result<u32> {
        let (d, tx, idx) = self.chan(dev, ch)?;
        let mut g: c_uint = 0;
        res("gain_db", unsafe { sys::LMS_GetGaindB(d, tx, idx, &mut g) })?;
        Ok(g)
    }

    fn calibrate(&self, dev: DeviceHandle, ch: ChannelId, bandwidth: f64, flags: u32) -> Result {
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("calibrate", unsafe { sys::LMS_Calibrate(d, tx, idx, bandwidth, flags) })
    }

    fn set_test_signal(
        &self,
        dev: DeviceHandle,
        ch: ChannelId,
        sig: TestSignal,
        dc_i: i16,
        dc_q: i16,
    ) -> Result {
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("set_test_signal", unsafe {
            sys::LMS_SetTestSignal(d, tx, idx, sig.into(), dc_i, dc_q)
        })
    }

    fn test_signal(&self, dev: DeviceHandle, ch: ChannelId) -> Result<TestSignal> {
        let (d, tx, idx) = self.chan(dev, ch)?;
        let mut sig: sys::lms_testsig_t = sys::LMS_TESTSIG_NONE;
        res("test_signal", unsafe { sys::LMS_GetTestSignal(d, tx, idx, &mut sig) })?;
        Ok(TestSignal::from(sig))
    }

    fn set_nco_frequency(&self, dev: DeviceHandle, ch: ChannelId, nco: &NcoFrequencies) -> Result {
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("set_nco_frequency", unsafe {
            sys::LMS_SetNCOFrequency(d, tx, idx, nco.frequencies.as_ptr(), nco.phase_offset)
        })
    }

    fn nco_frequency(&self, dev: DeviceHandle, ch: ChannelId) -> Result<NcoFrequencies> {
        let (d, tx, idx) = self.chan(dev, ch)?;
        let mut nco = NcoFrequencies::default();
        res("nco_frequency", unsafe {
            sys::LMS_GetNCOFrequency(
                d,
                tx,
                idx,
                nco.frequencies.as_mut_ptr(),
                &mut nco.phase_offset,
            )
        })?;
        Ok(nco)
    }

    fn set_nco_phase(&self, dev: DeviceHandle, ch: ChannelId, nco: &NcoPhases) -> Result {
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("set_nco_phase", unsafe {
            sys::LMS_SetNCOPhase(d, tx, idx, nco.phases.as_ptr(), nco.frequency)
        })
    }

    fn nco_phase(&self, dev: DeviceHandle, ch: ChannelId) -> Result<NcoPhases> {
        let (d, tx, idx) = self.chan(dev, ch)?;
        let mut nco = NcoPhases::default();
        res("nco_phase", unsafe {
            sys::LMS_GetNCOPhase(d, tx, idx, nco.phases.as_mut_ptr(), &mut nco.frequency)
        })?;
        Ok(nco)
    }

    fn set_nco_index(
        &self,
        dev: DeviceHandle,
        ch: ChannelId,
        index: usize,
        downconvert: bool,
    ) -> Result {
        if index >= NCO_VAL_COUNT {
            return Err(Error::InvalidArgument("NCO index out of range"));
        }
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("set_nco_index", unsafe {
            sys::LMS_SetNCOIndex(d, tx, idx, index as c_int, downconvert)
        })
    }

    fn nco_index(&self, dev: DeviceHandle, ch: ChannelId) -> Result<usize> {
        let (d, tx, idx) = self.chan(dev, ch)?;
        checked("nco_index", unsafe { sys::LMS_GetNCOIndex(d, tx, idx) })
    }

    fn set_gfir_coeff(&self, dev: DeviceHandle, ch: ChannelId, filt: Gfir, coef: &[f64]) -> Result {
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("set_gfir_coeff", unsafe {
            sys::LMS_SetGFIRCoeff(d, tx, idx, filt.into(), coef.as_ptr(), coef.len())
        })
    }

    fn gfir_coeff(&self, dev: DeviceHandle, ch: ChannelId, filt: Gfir) -> Result<Vec<f64>> {
        let (d, tx, idx) = self.chan(dev, ch)?;
        let mut coef = vec![0.0; GFIR_MAX_COEFFS];
        res("gfir_coeff", unsafe {
            sys::LMS_GetGFIRCoeff(d, tx, idx, filt.into(), coef.as_mut_ptr())
        })?;
        coef.truncate(filt.coeff_count());
        Ok(coef)
    }

    fn set_gfir(&self, dev: DeviceHandle, ch: ChannelId, filt: Gfir, enabled: bool) -> Result {
        let (d, tx, idx) = self.chan(dev, ch)?;
        res("set_gfir", unsafe { sys::LMS_SetGFIR(d, tx, idx, filt.into(), enabled) })
    }

    fn vctcxo_write(&self, dev: DeviceHandle, value: u16) -> Result {
        res("vctcxo_write", unsafe { sys::LMS_VCTCXOWrite(self.dev(dev)?, value) })
    }

    fn vctcxo_read(&self, dev: DeviceHandle) -> Result<u16> {
        let mut value = 0;
        res("vctcxo_read", unsafe { sys::LMS_VCTCXORead(self.dev(dev)?, &mut value) })?;
        Ok(value)
    }

    fn setup_stream(&self, dev: DeviceHandle, config: &StreamConfig) -> Result<StreamHandle> {
        let d = self.dev(dev)?;
        let mut inner = Box::new(sys::lms_stream_t {
            handle: 0,
            isTx: config.channel.direction.is_tx(),
            channel: config.channel.index,
            fifoSize: config.fifo_size,
            throughputVsLatency: config.throughput_vs_latency,
            dataFmt: config.data_format.into(),
            linkFmt: config.link_format.into(),
        });
        res("setup_stream", unsafe { sys::LMS_SetupStream(d, &mut *inner) })?;

        let slot = StreamSlot {
            device: dev,
            format: config.data_format,
            running: false,
            inner,
        };
        Ok(StreamHandle(insert_slot(&mut self.streams.borrow_mut(), slot)))
    }

    fn destroy_stream(&self, dev: DeviceHandle, stream: StreamHandle) -> Result {
        let d = self.dev(dev)?;
        let mut slot = self
            .streams
            .borrow_mut()
            .get_mut(stream.0)
            .and_then(Option::take)
            .ok_or(Error::InvalidHandle)?;
        res("destroy_stream", unsafe { sys::LMS_DestroyStream(d, &mut *slot.inner) })
    }

    fn start_stream(&self, stream: StreamHandle) -> Result {
        let (s, _) = self.stream(stream)?;
        res("start_stream", unsafe { sys::LMS_StartStream(s) })?;
        self.set_running(stream, true);
        Ok(())
    }

    fn stop_stream(&self, stream: StreamHandle) -> Result {
        let (s, _) = self.stream(stream)?;
        res("stop_stream", unsafe { sys::LMS_StopStream(s) })?;
        self.set_running(stream, false);
        Ok(())
    }

    fn recv_stream(
        &self,
        stream: StreamHandle,
        buf: &mut SampleBuffer,
        meta: Option<&mut StreamMeta>,
        timeout: Duration,
    ) -> Result<usize> {
        let (s, format) = self.stream(stream)?;
        // the library writes `format`-sized samples into the buffer
        if buf.format() != format {
            return Err(Error::failed("recv_stream", "buffer format does not match stream"));
        }

        let mut raw = meta.as_deref().map(raw_meta);
        let raw_ptr = raw.as_mut().map_or(ptr::null_mut(), |r| r as *mut _);
        let (samples, capacity) = (buf.as_mut_ptr(), buf.capacity());

        let n = checked("recv_stream", unsafe {
            sys::LMS_RecvStream(s, samples, capacity, raw_ptr, timeout_ms(timeout))
        })?;

        if let (Some(m), Some(r)) = (meta, raw) {
            m.timestamp = r.timestamp;
        }
        Ok(n)
    }

    fn send_stream(
        &self,
        stream: StreamHandle,
        buf: &SampleBuffer,
        count: usize,
        meta: Option<&StreamMeta>,
        timeout: Duration,
    ) -> Result<usize> {
        let (s, format) = self.stream(stream)?;
        if buf.format() != format {
            return Err(Error::failed("send_stream", "buffer format does not match stream"));
        }

        let raw = meta.map(raw_meta);
        let raw_ptr = raw.as_ref().map_or(ptr::null(), |r| r as *const _);
        let count = count.min(buf.capacity());

        checked("send_stream", unsafe {
            sys::LMS_SendStream(s, buf.as_ptr(), count, raw_ptr, timeout_ms(timeout))
        })
    }

    fn stream_status(&self, stream: StreamHandle) -> Result<StreamStatus> {
        let (s, _) = self.stream(stream)?;
        let mut st = sys::lms_stream_status_t::default();
        res("stream_status", unsafe { sys::LMS_GetStreamStatus(s, &mut st) })?;
        Ok(StreamStatus {
            active: st.active,
            fifo_filled_count: st.fifoFilledCount,
            fifo_size: st.fifoSize,
            underrun: st.underrun,
            overrun: st.overrun,
            dropped_packets: st.droppedPackets,
            sample_rate: st.sampleRate,
            link_rate: st.linkRate,
            timestamp: st.timestamp,
        })
    }
}

impl Drop for LimeSuite {
    fn drop(&mut self) {
        for (i, slot) in self.streams.get_mut().iter_mut().enumerate() {
            let Some(mut slot) = slot.take() else {
                continue;
            };
            let Some(d) = self.devices.get_mut().get(slot.device.0).copied().flatten() else {
                continue;
            };
            unsafe {
                if slot.running {
                    if let Err(e) = res("stop_stream", sys::LMS_StopStream(&mut *slot.inner)) {
                        log::warn!("stream {i}: {e}");
                    }
                }
                if let Err(e) = res("destroy_stream", sys::LMS_DestroyStream(d, &mut *slot.inner))
                {
                    log::warn!("stream {i}: {e}");
                }
            }
        }

        for d in self.devices.get_mut().iter_mut().filter_map(Option::take) {
            if let Err(e) = res("close", unsafe { sys::LMS_Close(d) }) {
                log::warn!("{e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_strings_stop_at_nul() {
        let mut buf: sys::lms_name_t = [0; 16];
        for (i, b) in b"LNAW".iter().enumerate() {
            buf[i] = *b as c_char;
        }
        assert_eq!(fixed_string(&buf), "LNAW");
        assert_eq!(fixed_string(&[0; 16]), "");
    }

    #[test]
    fn lists_keep_only_filled_entries() {
        let mut list: Vec<sys::lms_info_str_t> = vec![[0; 256]; 2 + DEVICE_LIST_HEADROOM];
        for (i, b) in b"LimeSDR Mini".iter().enumerate() {
            list[0][i] = *b as c_char;
        }
        list[1][0] = b'X' as c_char;

        let found = names("device_list", list.clone(), 2).unwrap();
        assert_eq!(found, vec!["LimeSDR Mini".to_string(), "X".to_string()]);

        // a device that showed up after the count query still fits
        assert_eq!(names("device_list", list.clone(), 3).unwrap().len(), 3);

        let overflow = names("device_list", list, 3 + DEVICE_LIST_HEADROOM);
        assert!(matches!(overflow, Err(Error::Failed { op: "device_list", .. })));
    }

    #[test]
    fn timeouts_saturate() {
        assert_eq!(timeout_ms(Duration::from_millis(1000)), 1000);
        assert_eq!(timeout_ms(Duration::from_secs(u64::MAX)), c_uint::MAX);
    }

    #[test]
    fn released_slots_are_reused() {
        let mut slots = Vec::new();
        assert_eq!(insert_slot(&mut slots, 'a'), 0);
        assert_eq!(insert_slot(&mut slots, 'b'), 1);
        assert_eq!(insert_slot(&mut slots, 'c'), 2);
        slots[1] = None;
        assert_eq!(insert_slot(&mut slots, 'd'), 1);
        assert_eq!(insert_slot(&mut slots, 'e'), 3);
        assert_eq!(slots, vec![Some('a'), Some('d'), Some('c'), Some('e')]);
    }

    #[test]
    fn unknown_handles_are_rejected() {
        let lime = LimeSuite::new();
        assert!(matches!(lime.init(DeviceHandle(0)), Err(Error::InvalidHandle)));
        assert!(matches!(lime.start_stream(StreamHandle(3)), Err(Error::InvalidHandle)));
    }
}
