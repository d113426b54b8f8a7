//! Mock adapters for integration tests.
//!
//! Each mock implements one port trait and records every call so tests
//! can assert on the full command history without touching real
//! GPIO/capture registers.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use growbox::app::events::AppEvent;
use growbox::app::ports::{ClockPort, ConfigError, ConfigPort, EventSink, FanPort, LightPort, SensorPort};
use growbox::config::SystemConfig;
use growbox::error::{DimmerError, SensorError};
use growbox::schedule::TimeOfDay;
use growbox::sensors::am2302::Reading;
use growbox::sensors::capture::CaptureSample;

pub fn reading(temp_tenths: i16, rh_tenths: u16) -> Reading {
    Reading { temperature: temp_tenths, humidity: rh_tenths }
}

// ── Sensor ────────────────────────────────────────────────────

/// Serves queued results in order; an empty queue reads as a timeout.
#[derive(Default)]
pub struct MockSensor {
    pub results: VecDeque<Result<Reading, SensorError>>,
    pub reads: u32,
}

#[allow(dead_code)]
impl MockSensor {
    pub fn with(results: impl IntoIterator<Item = Result<Reading, SensorError>>) -> Self {
        Self { results: results.into_iter().collect(), reads: 0 }
    }

    pub fn push(&mut self, result: Result<Reading, SensorError>) {
        self.results.push_back(result);
    }
}

impl SensorPort for MockSensor {
    async fn read(&mut self) -> Result<Reading, SensorError> {
        self.reads += 1;
        self.results.pop_front().unwrap_or(Err(SensorError::RcvTimeout))
    }
}

// ── Fan ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockFan {
    pub level: u16,
    pub writes: Vec<u16>,
    pub zero_cross: Option<CaptureSample>,
}

impl FanPort for MockFan {
    fn set_fan_level(&mut self, level: u16) {
        self.level = level.min(100);
        self.writes.push(level);
    }

    fn fan_level(&self) -> u16 {
        self.level
    }

    async fn zero_cross(&mut self) -> Result<CaptureSample, DimmerError> {
        self.zero_cross.ok_or(DimmerError::NoSignal)
    }
}

// ── Light ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockLights {
    pub relay_writes: Vec<bool>,
    pub heartbeat: Vec<bool>,
}

impl LightPort for MockLights {
    fn set_light(&mut self, on: bool) {
        self.relay_writes.push(on);
    }

    fn set_heartbeat(&mut self, phase: bool) {
        self.heartbeat.push(phase);
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Manually advanced clock.
#[derive(Default)]
pub struct MockClock {
    pub uptime_ms: Cell<u32>,
    pub now: Cell<Option<TimeOfDay>>,
    pub reject_set: bool,
}

#[allow(dead_code)]
impl MockClock {
    pub fn at(time: &str) -> Self {
        let clock = Self::default();
        clock.now.set(Some(time.parse().unwrap()));
        clock
    }

    pub fn advance(&self, ms: u32) {
        self.uptime_ms.set(self.uptime_ms.get().wrapping_add(ms));
    }
}

impl ClockPort for MockClock {
    fn uptime_ms(&self) -> u32 {
        self.uptime_ms.get()
    }

    fn time_of_day(&self) -> Option<TimeOfDay> {
        self.now.get()
    }

    fn set_time_of_day(&mut self, time: TimeOfDay) -> bool {
        if self.reject_set {
            return false;
        }
        self.now.set(Some(time));
        true
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Config store ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockStore {
    pub saved: RefCell<Option<SystemConfig>>,
    pub fail: bool,
}

impl ConfigPort for MockStore {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        Ok(self.saved.borrow().clone().unwrap_or_default())
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        if self.fail {
            return Err(ConfigError::IoError);
        }
        config.validate()?;
        *self.saved.borrow_mut() = Some(config.clone());
        Ok(())
    }
}
