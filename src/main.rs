use std::process::ExitCode;

use limesuite_rx::lime::LimeSuite;
use limesuite_rx::run;
use limesuite_rx::Outcome;
use limesuite_rx::RunConfig;
use limesuite_rx::SystemClock;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let driver = LimeSuite::new();
    let config = RunConfig::default();
    match run(&driver, &SystemClock::new(), &config, &mut std::io::stdout()) {
        Ok(Outcome::Completed { .. }) => ExitCode::SUCCESS,
        Ok(Outcome::NoDevices) => {
            log::error!("no LimeSuite devices found");
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
