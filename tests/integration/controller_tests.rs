//! Integration tests for the sensor → PID → fan pipeline and the light
//! schedule, against mock ports.

use std::cell::Cell;

use embassy_time::{Duration, with_timeout};
use futures_lite::future::{block_on, zip};

use growbox::app::events::AppEvent;
use growbox::app::ports::{ClockPort, ConfigError, FanPort, SensorPort};
use growbox::app::service::{ClimateController, CycleOutcome, LightController};
use growbox::app::shared::{SharedConfig, StatusCell};
use growbox::config::{DimmerMode, ProcessVariable, SystemConfig};
use growbox::control::pid::PidGains;
use growbox::drivers::sensor_line::SimSensorLine;
use growbox::error::SensorError;
use growbox::fixed::Fixed;
use growbox::schedule::{LightMode, LightSchedule, TimeOfDay};
use growbox::sensors::SensorLink;
use growbox::sensors::am2302::Reading;

use crate::mock_hw::{MockClock, MockFan, MockLights, MockSensor, RecordingSink, reading};

/// Proportional-only, reverse-acting: 4 % fan per %RH above setpoint.
fn p_only() -> SystemConfig {
    SystemConfig {
        gains: PidGains { kp: Fixed::from_int(-4), ki: Fixed::ZERO, kd: Fixed::ZERO },
        ..SystemConfig::default()
    }
}

/// State shared between the controller and the rest of the firmware.
struct Shared {
    config: SharedConfig,
    status: StatusCell,
}

impl Shared {
    fn new(cfg: SystemConfig) -> Self {
        Self { config: SharedConfig::new(cfg), status: StatusCell::new() }
    }

    fn controller(&self) -> ClimateController<'_> {
        let initial = self.config.try_snapshot().unwrap();
        ClimateController::new(&self.config, &self.status, &initial)
    }

    fn edit(&self, f: impl FnOnce(&mut SystemConfig)) {
        block_on(self.config.apply(Duration::from_millis(100), |c| {
            f(c);
            Ok::<(), ConfigError>(())
        }))
        .unwrap();
    }
}

/// Ports the controller drives.
#[derive(Default)]
struct Io {
    fan: MockFan,
    clock: MockClock,
    sink: RecordingSink,
}

/// One cycle, 2 s after the previous one.
fn cycle(ctl: &mut ClimateController<'_>, sensor: &mut impl SensorPort, io: &mut Io) -> CycleOutcome {
    io.clock.advance(2000);
    block_on(ctl.cycle(sensor, &mut io.fan, &io.clock, &mut io.sink))
}

// ── Regulation ───────────────────────────────────────────────

#[test]
fn humid_air_speeds_up_the_fan() {
    let shared = Shared::new(p_only());
    let mut io = Io::default();
    let mut ctl = shared.controller();
    let mut sensor = MockSensor::with([Ok(reading(250, 800))]);

    // Light off → night setpoint 70 %RH; 80 %RH is 10 over → 40 %.
    let out = cycle(&mut ctl, &mut sensor, &mut io);
    assert_eq!(out, CycleOutcome::Regulated(40));
    assert_eq!(io.fan.level, 40);
    assert!(!ctl.daytime());
    assert_eq!(shared.status.get().last, Some(reading(250, 800)));
    assert_eq!(io.sink.count(|e| matches!(e, AppEvent::SensorRead(_))), 1);
    assert!(io.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::ControlUpdated { level: 40, .. }
    )));
}

#[test]
fn output_is_clamped_to_limits() {
    let shared = Shared::new(p_only());
    let mut io = Io::default();
    let mut ctl = shared.controller();
    let mut sensor = MockSensor::with([Ok(reading(250, 999)), Ok(reading(250, 400))]);

    assert_eq!(cycle(&mut ctl, &mut sensor, &mut io), CycleOutcome::Regulated(100));
    assert_eq!(cycle(&mut ctl, &mut sensor, &mut io), CycleOutcome::Regulated(0));
}

#[test]
fn failed_read_holds_level_and_counts_error() {
    let shared = Shared::new(p_only());
    let mut io = Io::default();
    let mut ctl = shared.controller();
    let mut sensor = MockSensor::with([Ok(reading(250, 800)), Err(SensorError::ChecksumError)]);

    cycle(&mut ctl, &mut sensor, &mut io);
    let writes = io.fan.writes.len();
    assert_eq!(cycle(&mut ctl, &mut sensor, &mut io), CycleOutcome::Held);
    assert_eq!(io.fan.writes.len(), writes, "fan must not be rewritten on a failed read");
    assert_eq!(io.fan.level, 40);

    let status = shared.status.get();
    assert_eq!(status.read_errors, 1);
    assert_eq!(status.last, Some(reading(250, 800)), "last good reading stays published");
    assert!(io.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::SensorFailed { error: SensorError::ChecksumError, errors: 1 }
    )));
}

#[test]
fn daytime_uses_day_setpoint() {
    let mut cfg = p_only();
    cfg.light.mode = LightMode::On;
    let shared = Shared::new(cfg);
    let mut io = Io::default();
    let mut ctl = shared.controller();
    let mut sensor = MockSensor::with([Ok(reading(250, 800))]);

    // Day setpoint 60 %RH → 20 over → 80 %.
    assert_eq!(cycle(&mut ctl, &mut sensor, &mut io), CycleOutcome::Regulated(80));
    assert!(ctl.daytime());
}

#[test]
fn unset_clock_keeps_previous_phase() {
    let mut cfg = p_only();
    cfg.light = LightSchedule {
        mode: LightMode::Daytime,
        start: "06:00".parse().unwrap(),
        end: "22:00".parse().unwrap(),
    };
    let shared = Shared::new(cfg);
    let mut io = Io::default();
    let mut ctl = shared.controller();
    let mut sensor = MockSensor::with([Ok(reading(250, 800)), Ok(reading(250, 800))]);

    // Boot assumes day until the clock says otherwise.
    assert_eq!(cycle(&mut ctl, &mut sensor, &mut io), CycleOutcome::Regulated(80));

    io.clock.now.set(Some("23:30".parse().unwrap()));
    assert_eq!(cycle(&mut ctl, &mut sensor, &mut io), CycleOutcome::Regulated(40));
    assert!(!ctl.daytime());
}

#[test]
fn temperature_as_process_variable() {
    let mut cfg = p_only();
    cfg.process_variable = ProcessVariable::Temperature;
    cfg.setpoint_night = Fixed::from_int(25);
    let shared = Shared::new(cfg);
    let mut io = Io::default();
    let mut ctl = shared.controller();
    let mut sensor = MockSensor::with([Ok(reading(300, 500))]);

    assert_eq!(cycle(&mut ctl, &mut sensor, &mut io), CycleOutcome::Regulated(20));
}

// ── Runtime reconfiguration ──────────────────────────────────

#[test]
fn gain_change_is_applied_once() {
    let shared = Shared::new(p_only());
    let mut io = Io::default();
    let mut ctl = shared.controller();
    let mut sensor = MockSensor::with((0..3).map(|_| Ok(reading(250, 800))));

    assert_eq!(cycle(&mut ctl, &mut sensor, &mut io), CycleOutcome::Regulated(40));
    shared.edit(|c| c.gains.kp = Fixed::from_int(-2));

    assert_eq!(cycle(&mut ctl, &mut sensor, &mut io), CycleOutcome::Regulated(20));
    assert_eq!(ctl.pid().gains().kp, Fixed::from_int(-2));
    cycle(&mut ctl, &mut sensor, &mut io);
    assert_eq!(io.sink.count(|e| matches!(e, AppEvent::TuningApplied)), 1);
}

/// Clock that commits a gain edit the first time the wall time is asked
/// for, which the controller does after taking its config snapshot.
struct EditingClock<'a> {
    clock: MockClock,
    shared: &'a Shared,
    kp: Cell<Option<Fixed>>,
}

impl ClockPort for EditingClock<'_> {
    fn uptime_ms(&self) -> u32 {
        self.clock.uptime_ms()
    }

    fn time_of_day(&self) -> Option<TimeOfDay> {
        if let Some(kp) = self.kp.take() {
            self.shared.edit(|c| c.gains.kp = kp);
        }
        self.clock.time_of_day()
    }

    fn set_time_of_day(&mut self, time: TimeOfDay) -> bool {
        self.clock.set_time_of_day(time)
    }
}

#[test]
fn gain_edit_during_a_cycle_is_picked_up_next_cycle() {
    let shared = Shared::new(p_only());
    let mut fan = MockFan::default();
    let mut sink = RecordingSink::default();
    let clock = EditingClock { clock: MockClock::default(), shared: &shared, kp: Cell::new(Some(Fixed::from_int(-8))) };
    let mut ctl = shared.controller();
    let mut sensor = MockSensor::with((0..3).map(|_| Ok(reading(250, 800))));

    // The edit lands mid-cycle; this cycle still runs on the old gains.
    clock.clock.advance(2000);
    assert_eq!(block_on(ctl.cycle(&mut sensor, &mut fan, &clock, &mut sink)), CycleOutcome::Regulated(40));
    assert_eq!(shared.config.revision(), 1);
    assert_eq!(ctl.pid().gains().kp, Fixed::from_int(-4));

    clock.clock.advance(2000);
    assert_eq!(block_on(ctl.cycle(&mut sensor, &mut fan, &clock, &mut sink)), CycleOutcome::Regulated(80));
    assert_eq!(ctl.pid().gains().kp, Fixed::from_int(-8));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::TuningApplied)), 1);
}

#[test]
fn limit_change_reclamps_output() {
    let shared = Shared::new(p_only());
    let mut io = Io::default();
    let mut ctl = shared.controller();
    let mut sensor = MockSensor::with([Ok(reading(250, 800))]);

    shared.edit(|c| c.limits.high = Fixed::from_int(30));
    assert_eq!(cycle(&mut ctl, &mut sensor, &mut io), CycleOutcome::Regulated(30));
}

#[test]
fn manual_mode_overrides_pid() {
    let shared = Shared::new(p_only());
    let mut io = Io::default();
    let mut ctl = shared.controller();
    let mut sensor = MockSensor::with([Ok(reading(250, 800)), Err(SensorError::Timeout)]);

    shared.edit(|c| {
        c.dimmer_mode = DimmerMode::Manual;
        c.manual_level = 25;
    });
    assert_eq!(cycle(&mut ctl, &mut sensor, &mut io), CycleOutcome::Manual(25));
    // Manual drive does not depend on the sensor.
    assert_eq!(cycle(&mut ctl, &mut sensor, &mut io), CycleOutcome::Manual(25));
    assert_eq!(io.fan.level, 25);
    assert_eq!(io.sink.count(|e| matches!(e, AppEvent::ControlUpdated { .. })), 0);
}

#[test]
fn rejected_edit_leaves_controller_untouched() {
    let shared = Shared::new(p_only());
    let before = shared.config.revision();
    let r = block_on(shared.config.apply(Duration::from_millis(100), |c| {
        c.limits.low = Fixed::from_int(90);
        c.limits.high = Fixed::from_int(10);
        Ok::<(), ConfigError>(())
    }));
    assert!(r.is_err());
    assert_eq!(shared.config.revision(), before);
    assert_eq!(shared.config.try_snapshot().unwrap(), p_only());
}

// ── Task loop ────────────────────────────────────────────────

#[test]
fn run_cycles_on_poll_interval() {
    let cfg = SystemConfig { poll_interval_ms: 20, ..p_only() };
    let shared = Shared::new(cfg);
    let mut io = Io::default();
    let mut ctl = shared.controller();
    let mut sensor = MockSensor::with((0..100).map(|_| Ok(reading(250, 800))));

    let _ = block_on(with_timeout(
        Duration::from_millis(150),
        ctl.run(&mut sensor, &mut io.fan, &io.clock, &mut io.sink),
    ));
    assert!(sensor.reads >= 2, "only {} cycles ran", sensor.reads);
    assert!(sensor.reads <= 10, "{} cycles ran, schedule is bursting", sensor.reads);
    assert_eq!(io.sink.count(|e| matches!(e, AppEvent::Started)), 1);
}

/// The real link and decoder between a simulated AM2302 and the
/// controller.
#[test]
fn simulated_sensor_through_link_reaches_fan() {
    struct LinkSensor<'a>(&'a SensorLink);

    impl SensorPort for LinkSensor<'_> {
        async fn read(&mut self) -> Result<Reading, SensorError> {
            self.0.read(Duration::from_millis(200)).await
        }
    }

    let link = SensorLink::new();
    let mut line = SimSensorLine::new(Some(reading(-52, 755)));
    let shared = Shared::new(p_only());
    let mut io = Io::default();
    let mut ctl = shared.controller();
    let mut sensor = LinkSensor(&link);

    let (out, ()) = block_on(zip(
        ctl.cycle(&mut sensor, &mut io.fan, &io.clock, &mut io.sink),
        link.serve_one(&mut line),
    ));
    // 75.5 %RH against 70 → 5.5 over → 22 %.
    assert_eq!(out, CycleOutcome::Regulated(22));
    assert_eq!(shared.status.get().last, Some(reading(-52, 755)));
    assert_eq!(io.fan.fan_level(), 22);
    assert!(link.is_idle());
}

// ── Light schedule ───────────────────────────────────────────

#[test]
fn relay_written_only_on_change() {
    let mut light = LightController::new();
    let mut hw = MockLights::default();
    let mut sink = RecordingSink::default();
    let sched = LightSchedule { mode: LightMode::On, ..LightSchedule::default() };

    for _ in 0..3 {
        light.tick(Some(&sched), None, &mut hw, &mut sink);
    }
    assert_eq!(hw.relay_writes, vec![true]);
    assert_eq!(hw.heartbeat, vec![true, false, true]);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::LightChanged(true))), 1);
    assert_eq!(light.light_on(), Some(true));
}

#[test]
fn cross_midnight_window_switches_light() {
    let mut light = LightController::new();
    let mut hw = MockLights::default();
    let mut sink = RecordingSink::default();
    let sched = LightSchedule {
        mode: LightMode::Daytime,
        start: "18:00".parse().unwrap(),
        end: "06:00".parse().unwrap(),
    };

    light.tick(Some(&sched), Some("17:59:59".parse().unwrap()), &mut hw, &mut sink);
    light.tick(Some(&sched), Some("18:00".parse().unwrap()), &mut hw, &mut sink);
    light.tick(Some(&sched), Some("02:00".parse().unwrap()), &mut hw, &mut sink);
    light.tick(Some(&sched), Some("06:00".parse().unwrap()), &mut hw, &mut sink);
    assert_eq!(hw.relay_writes, vec![false, true, false]);
}

#[test]
fn unknown_schedule_or_clock_holds_relay() {
    let mut light = LightController::new();
    let mut hw = MockLights::default();
    let mut sink = RecordingSink::default();
    let daytime = LightSchedule { mode: LightMode::Daytime, ..LightSchedule::default() };

    light.tick(Some(&LightSchedule { mode: LightMode::On, ..daytime }), None, &mut hw, &mut sink);
    light.tick(None, None, &mut hw, &mut sink);
    light.tick(Some(&daytime), None, &mut hw, &mut sink);
    assert_eq!(hw.relay_writes, vec![true]);
    assert_eq!(hw.heartbeat.len(), 3);
}

#[test]
fn telemetry_reports_status_and_outputs() {
    let status = StatusCell::new();
    status.record(reading(231, 644), 1234);
    status.fail();
    let fan = MockFan { level: 35, ..MockFan::default() };
    let light = LightController::new();

    let t = light.telemetry(&status, &fan, false);
    assert_eq!(t.sensor.last, Some(reading(231, 644)));
    assert_eq!(t.sensor.timestamp_ms, 1234);
    assert_eq!(t.sensor.read_errors, 1);
    assert_eq!(t.fan_level, 35);
    assert_eq!(t.light_on, None);
    assert!(!t.daytime);
}
