//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ClimateController / LightController (domain)
//! ```
//!
//! Driven adapters (sensor link, dimmer, relays, clock, event sinks,
//! storage) implement these traits.  The controllers consume them via
//! generics, so the domain core never touches hardware directly.

use crate::config::SystemConfig;
use crate::error::{DimmerError, SensorError};
use crate::schedule::TimeOfDay;
use crate::sensors::am2302::Reading;
use crate::sensors::capture::CaptureSample;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: one bounded humidity/temperature read.
#[allow(async_fn_in_trait)]
pub trait SensorPort {
    async fn read(&mut self) -> Result<Reading, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator ports (driven adapters: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Ventilation fan behind the phase-control dimmer.
#[allow(async_fn_in_trait)]
pub trait FanPort {
    /// Request a fan level; out-of-range values clamp to off / full on.
    fn set_fan_level(&mut self, level: u16);

    fn fan_level(&self) -> u16;

    /// Wait for one mains zero-cross measurement.
    async fn zero_cross(&mut self) -> Result<CaptureSample, DimmerError>;
}

/// Grow-light relay and the two heartbeat LEDs.
pub trait LightPort {
    fn set_light(&mut self, on: bool);

    /// Drive the heartbeat LEDs in opposite phase.
    fn set_heartbeat(&mut self, phase: bool);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Monotonic milliseconds since boot (wraps).
    fn uptime_ms(&self) -> u32;

    /// Local wall-clock time, `None` until the clock has been set.
    fn time_of_day(&self) -> Option<TimeOfDay>;

    /// Set the local wall-clock time.  Returns `false` if the platform
    /// clock rejected it.
    fn set_time_of_day(&mut self, time: TimeOfDay) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate before persisting: invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], never silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// The configuration lock was not acquired within the bounded wait.
    Busy,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Busy => write!(f, "config locked"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
