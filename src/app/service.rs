//! Application services: the hexagonal core.
//!
//! [`ClimateController`] owns the PID and runs the sensor → fan loop on the
//! control task.  [`LightController`] runs the grow-light schedule and the
//! heartbeat LEDs from the main loop's one-second tick.  Both talk to the
//! outside world only through port traits injected at call sites.
//!
//! ```text
//!   SensorPort ──▶ ┌────────────────────┐ ──▶ EventSink
//!                  │ ClimateController  │
//!      FanPort ◀── │  PID · setpoint    │ ◀── SharedConfig (bounded wait)
//!                  └────────────────────┘
//!
//!    ClockPort ──▶ ┌────────────────────┐ ──▶ LightPort
//!                  │  LightController   │
//!                  └────────────────────┘
//! ```

use embassy_time::{Duration, Instant, Timer};
use log::{debug, info, warn};

use crate::config::{DimmerMode, ProcessVariable, SystemConfig};
use crate::control::pid::{IntegralPolicy, PidController};
use crate::fixed::Fixed;
use crate::schedule::{LightSchedule, TimeOfDay};
use crate::sensors::am2302::Reading;

use super::events::{AppEvent, TelemetryData};
use super::ports::{ClockPort, EventSink, FanPort, LightPort, SensorPort};
use super::shared::{SharedConfig, StatusCell};

/// Sensor value selected as the process variable, in °C or %RH.
pub fn process_value(reading: Reading, pv: ProcessVariable) -> Fixed {
    match pv {
        ProcessVariable::Humidity => Fixed::from_tenths(i32::from(reading.humidity)),
        ProcessVariable::Temperature => Fixed::from_tenths(i32::from(reading.temperature)),
    }
}

/// PID output → dimmer level.  Negative outputs mean off.
fn output_level(output: Fixed) -> u16 {
    u16::try_from(output.round().max(0)).unwrap_or(u16::MAX)
}

// ───────────────────────────────────────────────────────────────
// Climate loop
// ───────────────────────────────────────────────────────────────

/// What one control cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// PID ran on a fresh reading and set this level.
    Regulated(u16),
    /// Manual mode: the configured level was applied.
    Manual(u16),
    /// PID mode but no fresh reading: the fan level was left alone.
    Held,
    /// The configuration lock timed out: nothing after the read ran.
    ConfigBusy,
}

pub struct ClimateController<'a> {
    config: &'a SharedConfig,
    status: &'a StatusCell,
    pid: PidController,
    /// Revision whose gains and limits the PID currently carries.
    applied_revision: u32,
    config_wait: Duration,
    poll_interval: Duration,
    /// Last known light phase; kept while the wall clock is unset.
    daytime: bool,
}

impl<'a> ClimateController<'a> {
    /// Build the controller from the configuration in effect at boot.
    pub fn new(config: &'a SharedConfig, status: &'a StatusCell, initial: &SystemConfig) -> Self {
        Self {
            config,
            status,
            pid: PidController::new(initial.gains, initial.limits),
            applied_revision: config.revision(),
            config_wait: Duration::from_millis(u64::from(initial.config_wait_ms)),
            poll_interval: Duration::from_millis(u64::from(initial.poll_interval_ms)),
            daytime: true,
        }
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    pub fn daytime(&self) -> bool {
        self.daytime
    }

    /// Run one cycle: read → publish → tuning → regulate.
    pub async fn cycle(
        &mut self,
        sensor: &mut impl SensorPort,
        fan: &mut impl FanPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> CycleOutcome {
        let now = clock.uptime_ms();

        // 1. Read, publish success or count the failure
        let reading = match sensor.read().await {
            Ok(r) => {
                self.status.record(r, now);
                sink.emit(&AppEvent::SensorRead(r));
                Some(r)
            }
            Err(error) => {
                let s = self.status.fail();
                sink.emit(&AppEvent::SensorFailed {
                    error,
                    errors: s.read_errors,
                });
                None
            }
        };

        // 2. Bounded configuration snapshot
        let Some((cfg, revision)) = self.config.versioned_snapshot(self.config_wait).await else {
            warn!("climate: config lock timed out, skipping cycle");
            return CycleOutcome::ConfigBusy;
        };
        self.config_wait = Duration::from_millis(u64::from(cfg.config_wait_ms));
        self.poll_interval = Duration::from_millis(u64::from(cfg.poll_interval_ms));
        if let Some(on) = cfg.light.is_on(clock.time_of_day()) {
            self.daytime = on;
        }

        // 3. Pick up new tuning
        if revision != self.applied_revision {
            self.apply_tuning(&cfg, sink);
            self.applied_revision = revision;
        }

        // 4. Drive the fan
        match cfg.dimmer_mode {
            DimmerMode::Manual => {
                let level = u16::from(cfg.manual_level);
                fan.set_fan_level(level);
                // Start the PID from scratch when switched back.
                self.pid.reset();
                CycleOutcome::Manual(level)
            }
            DimmerMode::Pid => {
                let Some(r) = reading else {
                    debug!("climate: no fresh reading, holding level {}", fan.fan_level());
                    return CycleOutcome::Held;
                };
                let input = process_value(r, cfg.process_variable);
                let setpoint = cfg.setpoint(self.daytime);
                let output = self.pid.compute(input, setpoint, now);
                let level = output_level(output);
                fan.set_fan_level(level);
                sink.emit(&AppEvent::ControlUpdated {
                    input,
                    setpoint,
                    output,
                    level,
                });
                CycleOutcome::Regulated(level)
            }
        }
    }

    /// Control-task body: one cycle every `poll_interval`, on a fixed
    /// schedule that follows interval changes.
    pub async fn run(
        &mut self,
        sensor: &mut impl SensorPort,
        fan: &mut impl FanPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> ! {
        sink.emit(&AppEvent::Started);
        let mut next = Instant::now();
        loop {
            self.cycle(sensor, fan, clock, sink).await;
            next += self.poll_interval;
            let now = Instant::now();
            if next < now {
                // Overran: restart the schedule instead of bursting.
                next = now;
            }
            Timer::at(next).await;
        }
    }

    fn apply_tuning(&mut self, cfg: &SystemConfig, sink: &mut impl EventSink) {
        let mut changed = false;
        if cfg.gains != self.pid.gains() {
            self.pid.set_coef_with(cfg.gains, IntegralPolicy::Bumpless);
            changed = true;
        }
        if cfg.limits != self.pid.limits() {
            self.pid.set_limits(cfg.limits);
            changed = true;
        }
        if changed {
            info!(
                "climate: tuning kp={} ki={} kd={} limits={}..{}",
                cfg.gains.kp, cfg.gains.ki, cfg.gains.kd, cfg.limits.low, cfg.limits.high
            );
            sink.emit(&AppEvent::TuningApplied);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Light schedule
// ───────────────────────────────────────────────────────────────

/// Grow-light relay and heartbeat, driven once per second.
#[derive(Debug, Default)]
pub struct LightController {
    /// Relay state last written; `None` before the first switch.
    light_on: Option<bool>,
    heartbeat: bool,
}

impl LightController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn light_on(&self) -> Option<bool> {
        self.light_on
    }

    /// Toggle the heartbeat and evaluate the schedule.
    ///
    /// `schedule` is `None` when the configuration could not be read in
    /// time; the relay then keeps its state.  The relay is only written
    /// when the desired state changes.
    pub fn tick(
        &mut self,
        schedule: Option<&LightSchedule>,
        now: Option<TimeOfDay>,
        hw: &mut impl LightPort,
        sink: &mut impl EventSink,
    ) {
        self.heartbeat = !self.heartbeat;
        hw.set_heartbeat(self.heartbeat);

        let Some(on) = schedule.and_then(|s| s.is_on(now)) else {
            return;
        };
        if self.light_on != Some(on) {
            hw.set_light(on);
            self.light_on = Some(on);
            sink.emit(&AppEvent::LightChanged(on));
        }
    }

    /// Telemetry snapshot for the periodic report.
    pub fn telemetry(&self, status: &StatusCell, fan: &impl FanPort, daytime: bool) -> TelemetryData {
        TelemetryData {
            sensor: status.get(),
            fan_level: fan.fan_level(),
            light_on: self.light_on,
            daytime,
        }
    }
}
