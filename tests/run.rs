use std::time::Duration;

use limesuite_rx::mock::MockDriver;
use limesuite_rx::run;
use limesuite_rx::Clock;
use limesuite_rx::ManualClock;
use limesuite_rx::Outcome;
use limesuite_rx::RunConfig;

fn mini(clock: &ManualClock) -> MockDriver {
    let d = MockDriver::new(clock.clone(), vec!["LimeSDR Mini, media=USB 3.0".to_string()]);
    d.set_read_latency(Duration::from_millis(10));
    d
}

fn assert_released(d: &MockDriver) {
    assert!(d.open_devices().is_empty(), "device left open");
    assert!(d.live_streams().is_empty(), "stream left alive");
    assert!(!d.log_handler_registered(), "log handler left registered");
}

#[test]
fn one_device_runs_to_completion() {
    let clock = ManualClock::new();
    let d = mini(&clock);
    let mut out = Vec::new();

    let outcome = run(&d, &clock, &RunConfig::default(), &mut out).unwrap();
    let Outcome::Completed { applied, report } = outcome else {
        panic!("device was not used");
    };

    assert_eq!(applied.lo_frequency, 800e6);
    assert_eq!(applied.antenna, 3);
    assert_eq!(report.reads, 1000);
    assert_eq!(report.timeouts, 0);
    assert_eq!(report.samples, 1000 * 10_000);

    assert_eq!(d.count("open"), 1);
    assert_eq!(d.count("close"), 1);
    assert_eq!(d.count("start_stream"), 1);
    assert_eq!(d.count("stop_stream"), 1);
    assert_eq!(d.count("destroy_stream"), 1);
    assert_eq!(d.saved_configs(), vec![RunConfig::default().config_snapshot]);
    assert_released(&d);

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("Lime API Version: "));
    assert!(text.contains("1 devices"));
    assert!(text.contains("Device: LimeSDR Mini, media=USB 3.0"));
    assert!(text.contains("RX data rate: 63 MB/s"));
    assert!(text.contains("RX fifo: 25%"));
    assert!(text.trim_end().ends_with("All Done"));
}

#[test]
fn no_devices_returns_without_opening() {
    let clock = ManualClock::new();
    let d = MockDriver::new(clock.clone(), vec![]);
    let mut out = Vec::new();

    let outcome = run(&d, &clock, &RunConfig::default(), &mut out).unwrap();
    assert!(matches!(outcome, Outcome::NoDevices));
    assert_eq!(d.count("open"), 0);
    assert_eq!(d.count("enable_channel"), 0);
    assert_eq!(d.count("setup_stream"), 0);
    assert_released(&d);
    assert!(String::from_utf8(out).unwrap().contains("0 devices"));
}

#[test]
fn failures_release_everything_and_close_once() {
    let ops = [
        "init",
        "enable_channel",
        "set_lo_frequency",
        "antenna_list",
        "set_antenna",
        "set_sample_rate",
        "lpf_bw_range",
        "set_lpf_bw",
        "set_normalized_gain",
        "gain_db",
        "calibrate",
        "set_test_signal",
        "setup_stream",
        "start_stream",
        "recv_stream",
        "stream_status",
        "stop_stream",
    ];
    for op in ops {
        let clock = ManualClock::new();
        let d = mini(&clock);
        d.fail_on(op);

        let r = run(&d, &clock, &RunConfig::default(), &mut std::io::sink());
        assert!(r.is_err(), "{op} failure was swallowed");
        assert_eq!(d.count("close"), 1, "close count after {op} failed");
        assert_released(&d);
    }
}

#[test]
fn configuration_failure_skips_streaming() {
    let clock = ManualClock::new();
    let d = mini(&clock);
    d.fail_on("calibrate");

    assert!(run(&d, &clock, &RunConfig::default(), &mut std::io::sink()).is_err());
    assert_eq!(d.count("set_test_signal"), 0);
    assert_eq!(d.count("setup_stream"), 0);
    assert_eq!(clock.now(), Duration::ZERO);
}

#[test]
fn status_reports_about_once_a_second() {
    for latency in [1, 10, 100, 250] {
        let clock = ManualClock::new();
        let d = mini(&clock);
        d.set_read_latency(Duration::from_millis(latency));

        let outcome = run(&d, &clock, &RunConfig::default(), &mut std::io::sink()).unwrap();
        let Outcome::Completed { report, .. } = outcome else {
            panic!("device was not used");
        };

        assert!((8..=9).contains(&report.statuses.len()), "{latency} ms reads");
        let mut last = Duration::ZERO;
        for (at, _) in &report.statuses {
            let gap = *at - last;
            assert!(gap > Duration::from_secs(1), "report after {gap:?}");
            assert!(gap <= Duration::from_secs(1) + Duration::from_millis(latency));
            last = *at;
        }
    }
}

#[test]
fn streaming_stops_after_the_run_duration() {
    let clock = ManualClock::new();
    let d = mini(&clock);
    d.set_starved(true);
    let config = RunConfig {
        duration: Duration::from_secs(3),
        ..RunConfig::default()
    };

    let outcome = run(&d, &clock, &config, &mut std::io::sink()).unwrap();
    let Outcome::Completed { report, .. } = outcome else {
        panic!("device was not used");
    };

    // every read waits out the full timeout
    assert_eq!(report.reads, 3);
    assert_eq!(report.timeouts, 3);
    assert_eq!(report.samples, 0);
    assert_eq!(report.elapsed, Duration::from_secs(3));
    assert_released(&d);
}
