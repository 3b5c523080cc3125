use crate::Driver;
use crate::LogLevel;

/// Receives the driver's diagnostic messages.
pub type LogHandler = fn(LogLevel, &str);

/// Forwards driver messages into the `log` facade.
pub fn forward_to_log(level: LogLevel, msg: &str) {
    match level {
        LogLevel::Critical | LogLevel::Error => log::error!(target: "limesuite", "{msg}"),
        LogLevel::Warning => log::warn!(target: "limesuite", "{msg}"),
        LogLevel::Info => log::info!(target: "limesuite", "{msg}"),
        LogLevel::Debug => log::debug!(target: "limesuite", "{msg}"),
    }
}

/// Keeps a log handler registered with the driver until dropped.
pub struct LogRegistration<'d, D: Driver + ?Sized> {
    driver: &'d D,
}

impl<'d, D: Driver + ?Sized> LogRegistration<'d, D> {
    pub fn new(driver: &'d D, handler: LogHandler) -> Self {
        // drop whatever an earlier user left behind
        driver.register_log_handler(None);
        driver.register_log_handler(Some(handler));
        Self { driver }
    }
}

impl<D: Driver + ?Sized> Drop for LogRegistration<'_, D> {
    fn drop(&mut self) {
        self.driver.register_log_handler(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use crate::ManualClock;

    #[test]
    fn registration_is_undone_on_drop() {
        let driver = MockDriver::new(ManualClock::new(), vec![]);
        {
            let _reg = LogRegistration::new(&driver, forward_to_log);
            assert!(driver.log_handler_registered());
        }
        assert!(!driver.log_handler_registered());
        assert_eq!(driver.count("register_log_handler"), 3);
    }
}
