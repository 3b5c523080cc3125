use std::path::Path;

use crate::AntennaPath;
use crate::ChannelId;
use crate::DeviceHandle;
use crate::Direction;
use crate::Driver;
use crate::Error;
use crate::Gfir;
use crate::NcoFrequencies;
use crate::NcoPhases;
use crate::Range;
use crate::Result;
use crate::SampleRate;
use crate::Stream;
use crate::StreamConfig;
use crate::TestSignal;
use crate::NCO_VAL_COUNT;

/// An open device. Closed on [`close`](Device::close) or drop.
pub struct Device<'d, D: Driver + ?Sized> {
    driver: &'d D,
    handle: Option<DeviceHandle>,
    info: String,
}

impl<'d, D: Driver + ?Sized> Device<'d, D> {
    pub fn open(driver: &'d D, info: &str) -> Result<Self> {
        let handle = driver.open(info)?;
        log::debug!("opened {info} as {handle:?}");
        Ok(Self {
            driver,
            handle: Some(handle),
            info: info.to_string(),
        })
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Result<DeviceHandle> {
        self.handle.ok_or(Error::InvalidHandle)
    }

    pub fn driver(&self) -> &'d D {
        self.driver
    }

    /// Loads the default configuration into the device.
    pub fn init(&self) -> Result {
        self.driver.init(self.handle()?)
    }

    pub fn reset(&self) -> Result {
        self.driver.reset(self.handle()?)
    }

    pub fn num_channels(&self, dir: Direction) -> Result<usize> {
        self.driver.num_channels(self.handle()?, dir)
    }

    pub fn load_config(&self, path: &Path) -> Result {
        self.driver.load_config(self.handle()?, path)
    }

    pub fn save_config(&self, path: &Path) -> Result {
        self.driver.save_config(self.handle()?, path)
    }

    pub fn set_sample_rate(&self, rate: f64, oversample: usize) -> Result {
        self.driver.set_sample_rate(self.handle()?, rate, oversample)
    }

    pub fn set_sample_rate_dir(&self, dir: Direction, rate: f64, oversample: usize) -> Result {
        self.driver.set_sample_rate_dir(self.handle()?, dir, rate, oversample)
    }

    pub fn lpf_bw_range(&self, dir: Direction) -> Result<Range> {
        self.driver.lpf_bw_range(self.handle()?, dir)
    }

    /// Trims the reference oscillator.
    pub fn vctcxo_write(&self, value: u16) -> Result {
        self.driver.vctcxo_write(self.handle()?, value)
    }

    pub fn vctcxo_read(&self) -> Result<u16> {
        self.driver.vctcxo_read(self.handle()?)
    }

    pub fn channel(&self, id: ChannelId) -> Channel<'_, D> {
        Channel { device: self, id }
    }

    pub fn setup_stream(&self, config: StreamConfig) -> Result<Stream<'_, D>> {
        Stream::setup(self, config)
    }

    pub fn close(mut self) -> Result {
        match self.handle.take() {
            Some(h) => {
                log::debug!("closing {}", self.info);
                self.driver.close(h)
            }
            None => Err(Error::InvalidHandle),
        }
    }
}

impl<D: Driver + ?Sized> Drop for Device<'_, D> {
    fn drop(&mut self) {
        if let Some(h) = self.handle.take() {
            if let Err(e) = self.driver.close(h) {
                log::warn!("error closing {}: {e}", self.info);
            }
        }
    }
}

/// One RF channel of an open device.
pub struct Channel<'a, D: Driver + ?Sized> {
    device: &'a Device<'a, D>,
    id: ChannelId,
}

impl<D: Driver + ?Sized> Channel<'_, D> {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    fn driver(&self) -> &D {
        self.device.driver
    }

    pub fn enable(&self, enabled: bool) -> Result {
        self.driver().enable_channel(self.device.handle()?, self.id, enabled)
    }

    pub fn sample_rate(&self) -> Result<SampleRate> {
        self.driver().sample_rate(self.device.handle()?, self.id)
    }

    pub fn set_lo_frequency(&self, frequency: f64) -> Result {
        self.driver().set_lo_frequency(self.device.handle()?, self.id, frequency)
    }

    pub fn lo_frequency(&self) -> Result<f64> {
        self.driver().lo_frequency(self.device.handle()?, self.id)
    }

    pub fn antenna_list(&self) -> Result<Vec<String>> {
        self.driver().antenna_list(self.device.handle()?, self.id)
    }

    pub fn set_antenna(&self, path: AntennaPath) -> Result {
        self.driver().set_antenna(self.device.handle()?, self.id, path.into())
    }

    /// Index into [`antenna_list`](Channel::antenna_list).
    pub fn antenna(&self) -> Result<usize> {
        self.driver().antenna(self.device.handle()?, self.id)
    }

    pub fn set_lpf_bw(&self, bandwidth: f64) -> Result {
        self.driver().set_lpf_bw(self.device.handle()?, self.id, bandwidth)
    }

    pub fn lpf_bw(&self) -> Result<f64> {
        self.driver().lpf_bw(self.device.handle()?, self.id)
    }

    pub fn set_lpf(&self, enabled: bool) -> Result {
        self.driver().set_lpf(self.device.handle()?, self.id, enabled)
    }

    pub fn set_gfir_lpf(&self, enabled: bool, bandwidth: f64) -> Result {
        self.driver().set_gfir_lpf(self.device.handle()?, self.id, enabled, bandwidth)
    }

    /// Gain in the range 0.0..=1.0.
    pub fn set_normalized_gain(&self, gain: f64) -> Result {
        self.driver().set_normalized_gain(self.device.handle()?, self.id, gain)
    }

    pub fn normalized_gain(&self) -> Result<f64> {
        self.driver().normalized_gain(self.device.handle()?, self.id)
    }

    pub fn set_gain_db(&self, gain: u32) -> Result {
        self.driver().set_gain_db(self.device.handle()?, self.id, gain)
    }

    pub fn gain_db(&self) -> Result<u32> {
        self.driver().gain_db(self.device.handle()?, self.id)
    }

    pub fn calibrate(&self, bandwidth: f64, flags: u32) -> Result {
        self.driver().calibrate(self.device.handle()?, self.id, bandwidth, flags)
    }

    pub fn set_test_signal(&self, sig: TestSignal, dc_i: i16, dc_q: i16) -> Result {
        self.driver().set_test_signal(self.device.handle()?, self.id, sig, dc_i, dc_q)
    }

    pub fn test_signal(&self) -> Result<TestSignal> {
        self.driver().test_signal(self.device.handle()?, self.id)
    }

    pub fn set_nco_frequency(&self, nco: &NcoFrequencies) -> Result {
        self.driver().set_nco_frequency(self.device.handle()?, self.id, nco)
    }

    pub fn nco_frequency(&self) -> Result<NcoFrequencies> {
        self.driver().nco_frequency(self.device.handle()?, self.id)
    }

    pub fn set_nco_phase(&self, nco: &NcoPhases) -> Result {
        self.driver().set_nco_phase(self.device.handle()?, self.id, nco)
    }

    pub fn nco_phase(&self) -> Result<NcoPhases> {
        self.driver().nco_phase(self.device.handle()?, self.id)
    }

    /// `index` must be below [`NCO_VAL_COUNT`].
    pub fn set_nco_index(&self, index: usize, downconvert: bool) -> Result {
        if index >= NCO_VAL_COUNT {
            return Err(Error::InvalidArgument("NCO index out of range"));
        }
        self.driver().set_nco_index(self.device.handle()?, self.id, index, downconvert)
    }

    pub fn nco_index(&self) -> Result<usize> {
        self.driver().nco_index(self.device.handle()?, self.id)
    }

    pub fn set_gfir_coeff(&self, filt: Gfir, coef: &[f64]) -> Result {
        if coef.len() > filt.coeff_count() {
            return Err(Error::InvalidArgument("too many GFIR coefficients"));
        }
        self.driver().set_gfir_coeff(self.device.handle()?, self.id, filt, coef)
    }

    pub fn gfir_coeff(&self, filt: Gfir) -> Result<Vec<f64>> {
        self.driver().gfir_coeff(self.device.handle()?, self.id, filt)
    }

    pub fn set_gfir(&self, filt: Gfir, enabled: bool) -> Result {
        self.driver().set_gfir(self.device.handle()?, self.id, filt, enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use crate::ManualClock;

    fn driver() -> MockDriver {
        MockDriver::new(ManualClock::new(), vec!["LimeSDR Mini".to_string()])
    }

    #[test]
    fn drop_closes_device() {
        let d = driver();
        {
            let dev = Device::open(&d, "LimeSDR Mini").unwrap();
            assert!(dev.is_open());
            assert_eq!(d.open_devices().len(), 1);
        }
        assert!(d.open_devices().is_empty());
        assert_eq!(d.count("close"), 1);
    }

    #[test]
    fn explicit_close_is_not_repeated_on_drop() {
        let d = driver();
        let dev = Device::open(&d, "LimeSDR Mini").unwrap();
        dev.close().unwrap();
        assert_eq!(d.count("close"), 1);
        assert!(d.open_devices().is_empty());
    }

    #[test]
    fn channel_settings_read_back() {
        let d = driver();
        let dev = Device::open(&d, "LimeSDR Mini").unwrap();
        let ch = dev.channel(ChannelId::rx(0));
        ch.set_lo_frequency(433.92e6).unwrap();
        assert_eq!(ch.lo_frequency().unwrap(), 433.92e6);

        ch.set_antenna(AntennaPath::Lnal).unwrap();
        assert_eq!(ch.antenna().unwrap(), 2);
        assert_eq!(ch.antenna_list().unwrap()[2], "LNAL");

        ch.set_test_signal(TestSignal::NcoDiv4, 0, 0).unwrap();
        assert_eq!(ch.test_signal().unwrap(), TestSignal::NcoDiv4);

        ch.set_gain_db(30).unwrap();
        assert_eq!(ch.gain_db().unwrap(), 30);
    }

    #[test]
    fn reset_drops_channel_settings() {
        let d = driver();
        let dev = Device::open(&d, "LimeSDR Mini").unwrap();
        let ch = dev.channel(ChannelId::rx(0));
        ch.enable(true).unwrap();
        ch.set_lpf(true).unwrap();
        ch.set_gfir_lpf(true, 5e6).unwrap();
        assert!(d.channel_enabled(dev.handle().unwrap(), ch.id()));

        dev.reset().unwrap();
        assert!(!d.channel_enabled(dev.handle().unwrap(), ch.id()));
        assert_eq!(dev.num_channels(Direction::Rx).unwrap(), 2);
        dev.load_config(Path::new("LimeMini.ini")).unwrap();
    }

    #[test]
    fn per_direction_rate_reads_back() {
        let d = driver();
        let dev = Device::open(&d, "LimeSDR Mini").unwrap();
        dev.set_sample_rate_dir(Direction::Tx, 10e6, 4).unwrap();
        let rate = dev.channel(ChannelId::tx(0)).sample_rate().unwrap();
        assert_eq!(rate.host, 10e6);
        assert_eq!(rate.rf, 40e6);
    }

    #[test]
    fn nco_tables_read_back() {
        let d = driver();
        let dev = Device::open(&d, "LimeSDR Mini").unwrap();
        let ch = dev.channel(ChannelId::tx(0));

        let mut freq = NcoFrequencies::default();
        for (i, f) in freq.frequencies.iter_mut().enumerate() {
            *f = i as f64 * 1e6;
        }
        freq.phase_offset = 90.0;
        ch.set_nco_frequency(&freq).unwrap();
        assert_eq!(ch.nco_frequency().unwrap(), freq);

        let phases = NcoPhases {
            phases: [45.0; NCO_VAL_COUNT],
            frequency: 2e6,
        };
        ch.set_nco_phase(&phases).unwrap();
        assert_eq!(ch.nco_phase().unwrap(), phases);

        ch.set_nco_index(5, true).unwrap();
        assert_eq!(ch.nco_index().unwrap(), 5);
        assert!(d.nco_downconvert(dev.handle().unwrap(), ch.id()));

        let r = ch.set_nco_index(NCO_VAL_COUNT, false);
        assert!(matches!(r, Err(Error::InvalidArgument(_))));
        assert_eq!(d.count("set_nco_index"), 1);
        assert_eq!(ch.nco_index().unwrap(), 5);
    }

    #[test]
    fn gfir_coefficients_read_back() {
        let d = driver();
        let dev = Device::open(&d, "LimeSDR Mini").unwrap();
        let h = dev.handle().unwrap();
        let ch = dev.channel(ChannelId::rx(0));

        let coef: Vec<f64> = (0..10).map(|i| i as f64 / 10.0).collect();
        ch.set_gfir_coeff(Gfir::Gfir3, &coef).unwrap();
        let back = ch.gfir_coeff(Gfir::Gfir3).unwrap();
        assert_eq!(back.len(), Gfir::Gfir3.coeff_count());
        assert_eq!(&back[..10], &coef[..]);
        assert!(back[10..].iter().all(|&c| c == 0.0));
        assert_eq!(ch.gfir_coeff(Gfir::Gfir1).unwrap(), vec![0.0; 40]);

        let r = ch.set_gfir_coeff(Gfir::Gfir1, &[0.5; 41]);
        assert!(matches!(r, Err(Error::InvalidArgument(_))));

        ch.set_gfir(Gfir::Gfir3, true).unwrap();
        assert!(d.gfir_enabled(h, ch.id(), Gfir::Gfir3));
        assert!(!d.gfir_enabled(h, ch.id(), Gfir::Gfir1));
        ch.set_gfir(Gfir::Gfir3, false).unwrap();
        assert!(!d.gfir_enabled(h, ch.id(), Gfir::Gfir3));
    }

    #[test]
    fn vctcxo_trim_reads_back() {
        let d = driver();
        let dev = Device::open(&d, "LimeSDR Mini").unwrap();
        assert_eq!(dev.vctcxo_read().unwrap(), 0x8000);
        dev.vctcxo_write(0x7f12).unwrap();
        assert_eq!(dev.vctcxo_read().unwrap(), 0x7f12);
    }

    #[test]
    fn failing_open_leaves_nothing_behind() {
        let d = driver();
        d.fail_on("open");
        assert!(Device::open(&d, "LimeSDR Mini").is_err());
        assert!(d.open_devices().is_empty());
        assert_eq!(d.count("close"), 0);
    }
}
