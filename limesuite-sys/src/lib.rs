//! Raw declarations for the subset of `LimeSuite.h` used by `limesuite-rx`.
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::os::raw::{c_char, c_double, c_int, c_uint, c_void};

pub type float_type = c_double;
pub type lms_device_t = c_void;
pub type lms_info_str_t = [c_char; 256];
pub type lms_name_t = [c_char; 16];

pub const LMS_SUCCESS: c_int = 0;

pub const LMS_CH_TX: bool = true;
pub const LMS_CH_RX: bool = false;

pub const LMS_PATH_NONE: usize = 0;
pub const LMS_PATH_LNAH: usize = 1;
pub const LMS_PATH_LNAL: usize = 2;
pub const LMS_PATH_LNAW: usize = 3;
pub const LMS_PATH_TX1: usize = 1;
pub const LMS_PATH_TX2: usize = 2;
pub const LMS_PATH_AUTO: usize = 255;

pub const LMS_LOG_CRITICAL: c_int = 0;
pub const LMS_LOG_ERROR: c_int = 1;
pub const LMS_LOG_WARNING: c_int = 2;
pub const LMS_LOG_INFO: c_int = 3;
pub const LMS_LOG_DEBUG: c_int = 4;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct lms_range_t {
    pub min: float_type,
    pub max: float_type,
    pub step: float_type,
}

pub type lms_testsig_t = c_uint;
pub const LMS_TESTSIG_NONE: lms_testsig_t = 0;
pub const LMS_TESTSIG_NCODIV8: lms_testsig_t = 1;
pub const LMS_TESTSIG_NCODIV4: lms_testsig_t = 2;
pub const LMS_TESTSIG_NCODIV8F: lms_testsig_t = 3;
pub const LMS_TESTSIG_NCODIV4F: lms_testsig_t = 4;
pub const LMS_TESTSIG_DC: lms_testsig_t = 5;

pub const LMS_NCO_VAL_COUNT: usize = 16;

pub type lms_gfir_t = c_uint;
pub const LMS_GFIR1: lms_gfir_t = 0;
pub const LMS_GFIR2: lms_gfir_t = 1;
pub const LMS_GFIR3: lms_gfir_t = 2;

pub type lms_stream_data_fmt_t = c_uint;
pub const LMS_FMT_F32: lms_stream_data_fmt_t = 0;
pub const LMS_FMT_I16: lms_stream_data_fmt_t = 1;
pub const LMS_FMT_I12: lms_stream_data_fmt_t = 2;

pub type lms_stream_link_fmt_t = c_uint;
pub const LMS_LINK_FMT_DEFAULT: lms_stream_link_fmt_t = 0;
pub const LMS_LINK_FMT_I16: lms_stream_link_fmt_t = 1;
pub const LMS_LINK_FMT_I12: lms_stream_link_fmt_t = 2;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct lms_stream_t {
    pub handle: usize,
    pub isTx: bool,
    pub channel: u32,
    pub fifoSize: u32,
    pub throughputVsLatency: f32,
    pub dataFmt: lms_stream_data_fmt_t,
    pub linkFmt: lms_stream_link_fmt_t,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct lms_stream_meta_t {
    pub timestamp: u64,
    pub waitForTimestamp: bool,
    pub flushPartialPacket: bool,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct lms_stream_status_t {
    pub active: bool,
    pub fifoFilledCount: u32,
    pub fifoSize: u32,
    pub underrun: u32,
    pub overrun: u32,
    pub droppedPackets: u32,
    pub sampleRate: float_type,
    pub linkRate: float_type,
    pub timestamp: u64,
}

pub type LMS_LogHandler = Option<unsafe extern "C" fn(lvl: c_int, msg: *const c_char)>;

extern "C" {
    pub fn LMS_GetLibraryVersion() -> *const c_char;
    pub fn LMS_GetLastErrorMessage() -> *const c_char;
    pub fn LMS_RegisterLogHandler(handler: LMS_LogHandler);

    pub fn LMS_GetDeviceList(dev_list: *mut lms_info_str_t) -> c_int;
    pub fn LMS_Open(
        device: *mut *mut lms_device_t,
        info: *const c_char,
        args: *mut c_void,
    ) -> c_int;
    pub fn LMS_Close(device: *mut lms_device_t) -> c_int;
    pub fn LMS_Init(device: *mut lms_device_t) -> c_int;
    pub fn LMS_Reset(device: *mut lms_device_t) -> c_int;
    pub fn LMS_GetNumChannels(device: *mut lms_device_t, dir_tx: bool) -> c_int;
    pub fn LMS_LoadConfig(device: *mut lms_device_t, filename: *const c_char) -> c_int;
    pub fn LMS_SaveConfig(device: *mut lms_device_t, filename: *const c_char) -> c_int;

    pub fn LMS_EnableChannel(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        enabled: bool,
    ) -> c_int;
    pub fn LMS_SetSampleRate(
        device: *mut lms_device_t,
        rate: float_type,
        oversample: usize,
    ) -> c_int;
    pub fn LMS_SetSampleRateDir(
        device: *mut lms_device_t,
        dir_tx: bool,
        rate: float_type,
        oversample: usize,
    ) -> c_int;
    pub fn LMS_GetSampleRate(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        host_Hz: *mut float_type,
        rf_Hz: *mut float_type,
    ) -> c_int;
    pub fn LMS_SetLOFrequency(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        frequency: float_type,
    ) -> c_int;
    pub fn LMS_GetLOFrequency(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        frequency: *mut float_type,
    ) -> c_int;
    pub fn LMS_GetAntennaList(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        list: *mut lms_name_t,
    ) -> c_int;
    pub fn LMS_SetAntenna(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        index: usize,
    ) -> c_int;
    pub fn LMS_GetAntenna(device: *mut lms_device_t, dir_tx: bool, chan: usize) -> c_int;
    pub fn LMS_GetLPFBWRange(
        device: *mut lms_device_t,
        dir_tx: bool,
        range: *mut lms_range_t,
    ) -> c_int;
    pub fn LMS_SetLPFBW(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        bandwidth: float_type,
    ) -> c_int;
    pub fn LMS_GetLPFBW(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        bandwidth: *mut float_type,
    ) -> c_int;
    pub fn LMS_SetLPF(device: *mut lms_device_t, dir_tx: bool, chan: usize, enable: bool) -> c_int;
    pub fn LMS_SetGFIRLPF(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        enabled: bool,
        bandwidth: float_type,
    ) -> c_int;
    pub fn LMS_SetNormalizedGain(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        gain: float_type,
    ) -> c_int;
    pub fn LMS_GetNormalizedGain(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        gain: *mut float_type,
    ) -> c_int;
    pub fn LMS_SetGaindB(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        gain: c_uint,
    ) -> c_int;
    pub fn LMS_GetGaindB(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        gain: *mut c_uint,
    ) -> c_int;
    pub fn LMS_Calibrate(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        bw: c_double,
        flags: c_uint,
    ) -> c_int;
    pub fn LMS_SetTestSignal(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        sig: lms_testsig_t,
        dc_i: i16,
        dc_q: i16,
    ) -> c_int;
    pub fn LMS_GetTestSignal(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        sig: *mut lms_testsig_t,
    ) -> c_int;

    pub fn LMS_SetNCOFrequency(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        freq: *const float_type,
        pho: float_type,
    ) -> c_int;
    pub fn LMS_GetNCOFrequency(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        freq: *mut float_type,
        pho: *mut float_type,
    ) -> c_int;
    pub fn LMS_SetNCOPhase(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        phases: *const float_type,
        fcw: float_type,
    ) -> c_int;
    pub fn LMS_GetNCOPhase(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        phases: *mut float_type,
        fcw: *mut float_type,
    ) -> c_int;
    pub fn LMS_SetNCOIndex(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        index: c_int,
        downconv: bool,
    ) -> c_int;
    pub fn LMS_GetNCOIndex(device: *mut lms_device_t, dir_tx: bool, chan: usize) -> c_int;

    pub fn LMS_SetGFIRCoeff(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        filt: lms_gfir_t,
        coef: *const float_type,
        count: usize,
    ) -> c_int;
    pub fn LMS_GetGFIRCoeff(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        filt: lms_gfir_t,
        coef: *mut float_type,
    ) -> c_int;
    pub fn LMS_SetGFIR(
        device: *mut lms_device_t,
        dir_tx: bool,
        chan: usize,
        filt: lms_gfir_t,
        enabled: bool,
    ) -> c_int;

    pub fn LMS_VCTCXOWrite(device: *mut lms_device_t, val: u16) -> c_int;
    pub fn LMS_VCTCXORead(device: *mut lms_device_t, val: *mut u16) -> c_int;

    pub fn LMS_SetupStream(device: *mut lms_device_t, stream: *mut lms_stream_t) -> c_int;
    pub fn LMS_DestroyStream(device: *mut lms_device_t, stream: *mut lms_stream_t) -> c_int;
    pub fn LMS_StartStream(stream: *mut lms_stream_t) -> c_int;
    pub fn LMS_StopStream(stream: *mut lms_stream_t) -> c_int;
    pub fn LMS_RecvStream(
        stream: *mut lms_stream_t,
        samples: *mut c_void,
        sample_count: usize,
        meta: *mut lms_stream_meta_t,
        timeout_ms: c_uint,
    ) -> c_int;
    pub fn LMS_SendStream(
        stream: *mut lms_stream_t,
        samples: *const c_void,
        sample_count: usize,
        meta: *const lms_stream_meta_t,
        timeout_ms: c_uint,
    ) -> c_int;
    pub fn LMS_GetStreamStatus(
        stream: *mut lms_stream_t,
        status: *mut lms_stream_status_t,
    ) -> c_int;
}
