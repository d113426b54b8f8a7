//! Integration tests for the serial console: parse → execute → reply text,
//! and the configuration edits it makes.

use futures_lite::future::block_on;

use growbox::app::console::Console;
use growbox::app::shared::{SharedConfig, StatusCell};
use growbox::config::{DimmerMode, SystemConfig};
use growbox::fixed::Fixed;
use growbox::schedule::{LightMode, TimeOfDay};
use growbox::sensors::capture::CaptureSample;

use crate::mock_hw::{MockClock, MockFan, MockStore, reading};

type TestConsole<'a> = Console<'a, MockFan, MockClock, MockStore>;

fn console<'a>(shared: &'a SharedConfig, status: &'a StatusCell) -> TestConsole<'a> {
    Console::new(shared, status, MockFan::default(), MockClock::default(), MockStore::default())
}

fn run(console: &mut TestConsole<'_>, line: &str) -> String {
    let mut out = String::new();
    block_on(console.handle_line(line, &mut out)).unwrap();
    out
}

fn config(shared: &SharedConfig) -> SystemConfig {
    shared.try_snapshot().unwrap()
}

#[test]
fn temp_reports_last_reading_and_errors() {
    let shared = SharedConfig::new(SystemConfig::default());
    let status = StatusCell::new();
    let mut c = console(&shared, &status);

    assert_eq!(run(&mut c, "temp"), "no reading yet (0 read errors)\n");

    status.record(reading(-45, 873), 0);
    status.fail();
    let out = run(&mut c, "temp");
    assert!(out.starts_with("T=-4.5C RH=87.3%"), "{out}");
    assert!(out.contains("1 read errors"), "{out}");
}

#[test]
fn set_then_get_parameter() {
    let shared = SharedConfig::new(SystemConfig::default());
    let status = StatusCell::new();
    let mut c = console(&shared, &status);
    let rev = shared.revision();

    assert_eq!(run(&mut c, "set pid.kp -2.5"), "pid.kp = -2.5000\n");
    assert_eq!(run(&mut c, "get pid.kp"), "-2.5000\n");
    assert_eq!(config(&shared).gains.kp, "-2.5".parse::<Fixed>().unwrap());
    assert_eq!(shared.revision(), rev + 1);
}

#[test]
fn invalid_set_is_rejected_without_change() {
    let shared = SharedConfig::new(SystemConfig::default());
    let status = StatusCell::new();
    let mut c = console(&shared, &status);
    let rev = shared.revision();

    assert!(run(&mut c, "set pid.low 150").starts_with("error: validation failed"));
    assert!(run(&mut c, "set pid.kp abc").starts_with("error:"));
    assert!(run(&mut c, "set no.such 1").starts_with("error:"));
    assert_eq!(shared.revision(), rev);
    assert_eq!(config(&shared), SystemConfig::default());
}

#[test]
fn get_without_name_lists_every_parameter() {
    let shared = SharedConfig::new(SystemConfig::default());
    let status = StatusCell::new();
    let mut c = console(&shared, &status);

    let out = run(&mut c, "get");
    assert_eq!(out.lines().count(), growbox::params::PARAMS.len());
    assert!(out.contains("setpoint.day"));
    assert!(out.contains("light.mode"));
}

#[test]
fn dim_switches_to_manual() {
    let shared = SharedConfig::new(SystemConfig::default());
    let status = StatusCell::new();
    let mut c = console(&shared, &status);

    assert_eq!(run(&mut c, "dim 35"), "fan level 35 (manual)\n");
    let cfg = config(&shared);
    assert_eq!(cfg.dimmer_mode, DimmerMode::Manual);
    assert_eq!(cfg.manual_level, 35);
    assert_eq!(c.fan().level, 35);

    assert!(run(&mut c, "dim 101").starts_with("error:"));
    assert_eq!(config(&shared).manual_level, 35);
}

#[test]
fn light_commands_edit_schedule() {
    let shared = SharedConfig::new(SystemConfig::default());
    let status = StatusCell::new();
    let mut c = console(&shared, &status);

    let out = run(&mut c, "light on");
    assert!(out.starts_with("light: on"), "{out}");
    assert!(out.trim_end().ends_with("-> on"), "{out}");

    run(&mut c, "light 18:00 06:00");
    let light = config(&shared).light;
    assert_eq!(light.mode, LightMode::Daytime);
    assert_eq!(light.start, TimeOfDay::new(18, 0, 0).unwrap());
    assert_eq!(light.end, TimeOfDay::new(6, 0, 0).unwrap());
    assert!(run(&mut c, "light").contains("clock not set"));

    run(&mut c, "date 19:30");
    assert!(run(&mut c, "light").trim_end().ends_with("-> on"));
    run(&mut c, "light off");
    assert_eq!(config(&shared).light.mode, LightMode::Off);
}

#[test]
fn date_shows_and_sets_clock() {
    let shared = SharedConfig::new(SystemConfig::default());
    let status = StatusCell::new();
    let mut c = console(&shared, &status);

    assert_eq!(run(&mut c, "date"), "clock not set\n");
    assert_eq!(run(&mut c, "date 7:05"), "07:05:00\n");
    assert_eq!(run(&mut c, "date"), "07:05:00\n");
    assert!(run(&mut c, "date 24:00").starts_with("error: usage: date"));
}

#[test]
fn save_persists_current_config() {
    let shared = SharedConfig::new(SystemConfig::default());
    let status = StatusCell::new();
    let mut c = console(&shared, &status);

    run(&mut c, "set setpoint.day 55");
    assert_eq!(run(&mut c, "save"), "saved\n");
    let saved = c.store().saved.borrow().clone().unwrap();
    assert_eq!(saved.setpoint_day, Fixed::from_int(55));
}

#[test]
fn save_failure_is_reported() {
    let shared = SharedConfig::new(SystemConfig::default());
    let status = StatusCell::new();
    let store = MockStore { fail: true, ..MockStore::default() };
    let mut c = Console::new(&shared, &status, MockFan::default(), MockClock::default(), store);

    assert_eq!(run(&mut c, "save"), "error: I/O error\n");
}

#[test]
fn zc_reports_mains_frequency_or_absence() {
    let shared = SharedConfig::new(SystemConfig::default());
    let status = StatusCell::new();
    let mut c = console(&shared, &status);

    assert_eq!(run(&mut c, "zc"), "zero-cross: no zero-cross signal\n");

    let fan = MockFan { zero_cross: Some(CaptureSample::new(20_000, 600)), ..MockFan::default() };
    let mut c = Console::new(&shared, &status, fan, MockClock::default(), MockStore::default());
    assert_eq!(run(&mut c, "zc"), "zero-cross: period 20000 us, offset 600 us, 50.00 Hz\n");
}

#[test]
fn help_and_unknown() {
    let shared = SharedConfig::new(SystemConfig::default());
    let status = StatusCell::new();
    let mut c = console(&shared, &status);

    let help = run(&mut c, "help");
    for verb in ["temp", "date", "light", "get", "set", "dim", "zc", "save"] {
        assert!(help.contains(verb), "help is missing {verb}");
    }
    assert_eq!(run(&mut c, "reboot"), "error: unknown command, try 'help'\n");
    assert_eq!(run(&mut c, ""), "");
}
