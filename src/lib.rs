//! High-level access to LimeSuite SDR devices and an RX streaming smoke test.
//!
//! The driver library is reached through the [`Driver`] trait. With the
//! `limesuite` feature, [`lime::LimeSuite`] binds the native library; the
//! [`mock::MockDriver`] scripts the same surface for tests and dry runs.
//!
//! Resources are scoped: a [`Device`] closes itself, a [`Stream`] stops and
//! destroys itself, and a [`LogRegistration`] unregisters the driver log
//! handler when dropped.

pub mod clock;
mod device;
pub mod driver;
#[cfg(feature = "limesuite")]
pub mod lime;
mod logging;
pub mod mock;
pub mod orchestrator;
pub mod sequencer;
mod stream;

pub use clock::{Clock, ManualClock, Stopwatch, SystemClock};
pub use device::{Channel, Device};
pub use driver::Driver;
pub use logging::{forward_to_log, LogHandler, LogRegistration};
pub use orchestrator::{run, Outcome, RunConfig};
pub use stream::{Stream, StreamReport};

use num_complex::Complex;
use num_complex::Complex32;

pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{op} failed: {msg}")]
    Failed { op: &'static str, msg: String },
    #[error("Invalid Handle")]
    InvalidHandle,
    #[error("Invalid String")]
    InvalidString,
    #[error("Invalid Argument: {0}")]
    InvalidArgument(&'static str),
    #[error("Stream Not Running")]
    NotRunning,
    #[error("Output: {0}")]
    Output(#[from] std::io::Error),
}

impl Error {
    pub fn failed(op: &'static str, msg: impl Into<String>) -> Self {
        Error::Failed { op, msg: msg.into() }
    }
}

/// Opaque index of an open device, owned by the driver binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceHandle(pub usize);

/// Opaque index of a set-up stream, owned by the driver binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Rx,
    Tx,
}

impl Direction {
    pub fn is_tx(&self) -> bool {
        matches!(self, Direction::Tx)
    }
}

impl From<bool> for Direction {
    fn from(is_tx: bool) -> Self {
        if is_tx {
            Direction::Tx
        } else {
            Direction::Rx
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Rx => write!(f, "RX"),
            Direction::Tx => write!(f, "TX"),
        }
    }
}

/// One RF channel of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId {
    pub direction: Direction,
    pub index: u32,
}

impl ChannelId {
    pub fn rx(index: u32) -> Self {
        Self {
            direction: Direction::Rx,
            index,
        }
    }

    pub fn tx(index: u32) -> Self {
        Self {
            direction: Direction::Tx,
            index,
        }
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.direction, self.index)
    }
}

/// Antenna port index as understood by the driver.
///
/// RX and TX share index values, so the names overlap: `Lnah`/`Tx1` are both 1,
/// `Lnal`/`Tx2` are both 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntennaPath {
    None,
    Lnah,
    Lnal,
    Lnaw,
    Auto,
    Other(usize),
}

impl AntennaPath {
    pub const TX1: AntennaPath = AntennaPath::Lnah;
    pub const TX2: AntennaPath = AntennaPath::Lnal;
}

impl From<usize> for AntennaPath {
    fn from(value: usize) -> Self {
        match value {
            0 => AntennaPath::None,
            1 => AntennaPath::Lnah,
            2 => AntennaPath::Lnal,
            3 => AntennaPath::Lnaw,
            255 => AntennaPath::Auto,
            n => AntennaPath::Other(n),
        }
    }
}

impl From<AntennaPath> for usize {
    fn from(value: AntennaPath) -> Self {
        match value {
            AntennaPath::None => 0,
            AntennaPath::Lnah => 1,
            AntennaPath::Lnal => 2,
            AntennaPath::Lnaw => 3,
            AntennaPath::Auto => 255,
            AntennaPath::Other(n) => n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestSignal {
    None,
    NcoDiv8,
    NcoDiv4,
    NcoDiv8F,
    NcoDiv4F,
    Dc,
}

impl From<u32> for TestSignal {
    fn from(value: u32) -> Self {
        match value {
            1 => TestSignal::NcoDiv8,
            2 => TestSignal::NcoDiv4,
            3 => TestSignal::NcoDiv8F,
            4 => TestSignal::NcoDiv4F,
            5 => TestSignal::Dc,
            _ => TestSignal::None,
        }
    }
}

impl From<TestSignal> for u32 {
    fn from(value: TestSignal) -> Self {
        match value {
            TestSignal::None => 0,
            TestSignal::NcoDiv8 => 1,
            TestSignal::NcoDiv4 => 2,
            TestSignal::NcoDiv8F => 3,
            TestSignal::NcoDiv4F => 4,
            TestSignal::Dc => 5,
        }
    }
}

/// Number of frequency or phase entries in a channel's NCO table.
pub const NCO_VAL_COUNT: usize = 16;

/// NCO table in frequency mode: one frequency per entry and a shared phase
/// offset in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NcoFrequencies {
    pub frequencies: [f64; NCO_VAL_COUNT],
    pub phase_offset: f64,
}

/// NCO table in phase mode: one phase per entry and a shared frequency.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NcoPhases {
    pub phases: [f64; NCO_VAL_COUNT],
    pub frequency: f64,
}

/// One of the three programmable FIR filters of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gfir {
    Gfir1,
    Gfir2,
    Gfir3,
}

impl Gfir {
    /// Number of coefficients the filter takes.
    pub fn coeff_count(&self) -> usize {
        match self {
            Gfir::Gfir1 | Gfir::Gfir2 => 40,
            Gfir::Gfir3 => 120,
        }
    }
}

impl From<Gfir> for u32 {
    fn from(value: Gfir) -> Self {
        match value {
            Gfir::Gfir1 => 0,
            Gfir::Gfir2 => 1,
            Gfir::Gfir3 => 2,
        }
    }
}

/// Host-side sample format of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    F32,
    I16,
    I12,
}

impl DataFormat {
    /// Bytes taken by one complex sample in host memory.
    pub fn sample_size(&self) -> usize {
        match self {
            DataFormat::F32 => 2 * std::mem::size_of::<f32>(),
            DataFormat::I16 => 2 * std::mem::size_of::<i16>(),
            DataFormat::I12 => 3,
        }
    }
}

impl From<u32> for DataFormat {
    fn from(value: u32) -> Self {
        match value {
            1 => DataFormat::I16,
            2 => DataFormat::I12,
            _ => DataFormat::F32,
        }
    }
}

impl From<DataFormat> for u32 {
    fn from(value: DataFormat) -> Self {
        match value {
            DataFormat::F32 => 0,
            DataFormat::I16 => 1,
            DataFormat::I12 => 2,
        }
    }
}

/// Sample format on the USB/PCIe link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkFormat {
    #[default]
    Default,
    I16,
    I12,
}

impl From<LinkFormat> for u32 {
    fn from(value: LinkFormat) -> Self {
        match value {
            LinkFormat::Default => 0,
            LinkFormat::I16 => 1,
            LinkFormat::I12 => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Range {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRate {
    /// Rate of the host interface.
    pub host: f64,
    /// Rate of the RF ADC/DAC.
    pub rf: f64,
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub channel: ChannelId,
    /// FIFO size in samples.
    pub fifo_size: u32,
    /// 0.0 optimizes for latency, 1.0 for throughput.
    pub throughput_vs_latency: f32,
    pub data_format: DataFormat,
    pub link_format: LinkFormat,
}

impl StreamConfig {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            fifo_size: 1024 * 1024,
            throughput_vs_latency: 1.0,
            data_format: DataFormat::F32,
            link_format: LinkFormat::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamMeta {
    pub timestamp: u64,
    pub wait_for_timestamp: bool,
    pub flush_partial_packet: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamStatus {
    pub active: bool,
    pub fifo_filled_count: u32,
    pub fifo_size: u32,
    pub underrun: u32,
    pub overrun: u32,
    pub dropped_packets: u32,
    pub sample_rate: f64,
    /// Link data rate in bytes per second.
    pub link_rate: f64,
    pub timestamp: u64,
}

impl StreamStatus {
    pub fn fifo_fill_percent(&self) -> f64 {
        if self.fifo_size == 0 {
            0.0
        } else {
            100.0 * self.fifo_filled_count as f64 / self.fifo_size as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl From<i32> for LogLevel {
    fn from(value: i32) -> Self {
        match value {
            0 => LogLevel::Critical,
            1 => LogLevel::Error,
            2 => LogLevel::Warning,
            3 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }
}

/// Host buffer for one read or write, typed by the stream's data format.
#[derive(Debug, Clone)]
pub enum SampleBuffer {
    F32(Vec<Complex32>),
    I16(Vec<Complex<i16>>),
    /// Packed 12-bit samples, three bytes per complex sample.
    I12(Vec<u8>),
}

impl SampleBuffer {
    pub fn new(format: DataFormat, samples: usize) -> Self {
        match format {
            DataFormat::F32 => SampleBuffer::F32(vec![Complex32::new(0.0, 0.0); samples]),
            DataFormat::I16 => SampleBuffer::I16(vec![Complex::new(0, 0); samples]),
            DataFormat::I12 => SampleBuffer::I12(vec![0; samples * 3]),
        }
    }

    pub fn format(&self) -> DataFormat {
        match self {
            SampleBuffer::F32(_) => DataFormat::F32,
            SampleBuffer::I16(_) => DataFormat::I16,
            SampleBuffer::I12(_) => DataFormat::I12,
        }
    }

    /// Capacity in complex samples.
    pub fn capacity(&self) -> usize {
        match self {
            SampleBuffer::F32(v) => v.len(),
            SampleBuffer::I16(v) => v.len(),
            SampleBuffer::I12(v) => v.len() / 3,
        }
    }

    pub fn as_mut_ptr(&mut self) -> *mut std::ffi::c_void {
        match self {
            SampleBuffer::F32(v) => v.as_mut_ptr().cast(),
            SampleBuffer::I16(v) => v.as_mut_ptr().cast(),
            SampleBuffer::I12(v) => v.as_mut_ptr().cast(),
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_void {
        match self {
            SampleBuffer::F32(v) => v.as_ptr().cast(),
            SampleBuffer::I16(v) => v.as_ptr().cast(),
            SampleBuffer::I12(v) => v.as_ptr().cast(),
        }
    }
}
