use std::path::Path;
use std::time::Duration;

use crate::ChannelId;
use crate::DeviceHandle;
use crate::Direction;
use crate::Gfir;
use crate::LogHandler;
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

/// The call surface of the SDR driver library.
///
/// Handles are owned by the implementation; callers get them from [`open`]
/// and [`setup_stream`] and must hand them back through [`close`] and
/// [`destroy_stream`]. The RAII wrappers [`crate::Device`] and
/// [`crate::Stream`] do that bookkeeping.
///
/// [`open`]: Driver::open
/// [`setup_stream`]: Driver::setup_stream
/// [`close`]: Driver::close
/// [`destroy_stream`]: Driver::destroy_stream
pub trait Driver {
    fn library_version(&self) -> String;

    /// Process-wide; `None` unregisters.
    fn register_log_handler(&self, handler: Option<LogHandler>);

    fn device_list(&self) -> Result<Vec<String>>;
    fn open(&self, info: &str) -> Result<DeviceHandle>;
    fn close(&self, dev: DeviceHandle) -> Result;
    fn init(&self, dev: DeviceHandle) -> Result;
    fn reset(&self, dev: DeviceHandle) -> Result;
    fn num_channels(&self, dev: DeviceHandle, dir: Direction) -> Result<usize>;
    fn load_config(&self, dev: DeviceHandle, path: &Path) -> Result;
    fn save_config(&self, dev: DeviceHandle, path: &Path) -> Result;

    fn enable_channel(&self, dev: DeviceHandle, ch: ChannelId, enabled: bool) -> Result;

    /// Sets the rate of all channels in both directions.
    fn set_sample_rate(&self, dev: DeviceHandle, rate: f64, oversample: usize) -> Result;
    fn set_sample_rate_dir(
        &self,
        dev: DeviceHandle,
        dir: Direction,
        rate: f64,
        oversample: usize,
    ) -> Result;
    fn sample_rate(&self, dev: DeviceHandle, ch: ChannelId) -> Result<SampleRate>;

    fn set_lo_frequency(&self, dev: DeviceHandle, ch: ChannelId, frequency: f64) -> Result;
    fn lo_frequency(&self, dev: DeviceHandle, ch: ChannelId) -> Result<f64>;

    fn antenna_list(&self, dev: DeviceHandle, ch: ChannelId) -> Result<Vec<String>>;
    fn set_antenna(&self, dev: DeviceHandle, ch: ChannelId, index: usize) -> Result;
    fn antenna(&self, dev: DeviceHandle, ch: ChannelId) -> Result<usize>;

    fn lpf_bw_range(&self, dev: DeviceHandle, dir: Direction) -> Result<Range>;
    fn set_lpf_bw(&self, dev: DeviceHandle, ch: ChannelId, bandwidth: f64) -> Result;
    fn lpf_bw(&self, dev: DeviceHandle, ch: ChannelId) -> Result<f64>;
    fn set_lpf(&self, dev: DeviceHandle, ch: ChannelId, enabled: bool) -> Result;
    fn set_gfir_lpf(
        &self,
        dev: DeviceHandle,
        ch: ChannelId,
        enabled: bool,
        bandwidth: f64,
    ) -> Result;

    fn set_normalized_gain(&self, dev: DeviceHandle, ch: ChannelId, gain: f64) -> Result;
    fn normalized_gain(&self, dev: DeviceHandle, ch: ChannelId) -> Result<f64>;
    fn set_gain_db(&self, dev: DeviceHandle, ch: ChannelId, gain: u32) -> Result;
    fn gain_db(&self, dev: DeviceHandle, ch: ChannelId) -> Result<u32>;

    fn calibrate(&self, dev: DeviceHandle, ch: ChannelId, bandwidth: f64, flags: u32) -> Result;

    fn set_test_signal(
        &self,
        dev: DeviceHandle,
        ch: ChannelId,
        sig: TestSignal,
        dc_i: i16,
        dc_q: i16,
    ) -> Result;
    fn test_signal(&self, dev: DeviceHandle, ch: ChannelId) -> Result<TestSignal>;

    /// Loads the NCO table in frequency mode.
    fn set_nco_frequency(&self, dev: DeviceHandle, ch: ChannelId, nco: &NcoFrequencies) -> Result;
    fn nco_frequency(&self, dev: DeviceHandle, ch: ChannelId) -> Result<NcoFrequencies>;
    /// Loads the NCO table in phase mode.
    fn set_nco_phase(&self, dev: DeviceHandle, ch: ChannelId, nco: &NcoPhases) -> Result;
    fn nco_phase(&self, dev: DeviceHandle, ch: ChannelId) -> Result<NcoPhases>;
    /// Selects the active NCO table entry and the mixing direction.
    fn set_nco_index(
        &self,
        dev: DeviceHandle,
        ch: ChannelId,
        index: usize,
        downconvert: bool,
    ) -> Result;
    fn nco_index(&self, dev: DeviceHandle, ch: ChannelId) -> Result<usize>;

    /// Loads at most `filt.coeff_count()` coefficients, normalized to `[-1, 1]`.
    fn set_gfir_coeff(&self, dev: DeviceHandle, ch: ChannelId, filt: Gfir, coef: &[f64]) -> Result;
    /// Returns `filt.coeff_count()` coefficients.
    fn gfir_coeff(&self, dev: DeviceHandle, ch: ChannelId, filt: Gfir) -> Result<Vec<f64>>;
    fn set_gfir(&self, dev: DeviceHandle, ch: ChannelId, filt: Gfir, enabled: bool) -> Result;

    /// Writes the reference oscillator trim DAC.
    fn vctcxo_write(&self, dev: DeviceHandle, value: u16) -> Result;
    fn vctcxo_read(&self, dev: DeviceHandle) -> Result<u16>;

    fn setup_stream(&self, dev: DeviceHandle, config: &StreamConfig) -> Result<StreamHandle>;
    fn destroy_stream(&self, dev: DeviceHandle, stream: StreamHandle) -> Result;
    fn start_stream(&self, stream: StreamHandle) -> Result;
    fn stop_stream(&self, stream: StreamHandle) -> Result;

    /// Reads up to `buf.capacity()` samples, waiting at most `timeout`.
    /// Returns the number of samples read; zero means the wait timed out.
    fn recv_stream(
        &self,
        stream: StreamHandle,
        buf: &mut SampleBuffer,
        meta: Option<&mut StreamMeta>,
        timeout: Duration,
    ) -> Result<usize>;

    /// Writes up to `count` samples from `buf`. Returns the number accepted.
    fn send_stream(
        &self,
        stream: StreamHandle,
        buf: &SampleBuffer,
        count: usize,
        meta: Option<&StreamMeta>,
        timeout: Duration,
    ) -> Result<usize>;

    fn stream_status(&self, stream: StreamHandle) -> Result<StreamStatus>;
}
