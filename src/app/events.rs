//! Outbound application events.
//!
//! The [`ClimateController`](super::service::ClimateController) and
//! [`LightController`](super::service::LightController) emit these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use crate::error::SensorError;
use crate::fixed::Fixed;
use crate::sensors::am2302::Reading;

use super::shared::SensorStatus;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// A sensor read succeeded.
    SensorRead(Reading),

    /// A sensor read failed; `errors` is the running failure count.
    SensorFailed { error: SensorError, errors: u32 },

    /// The PID produced a new fan level.
    ControlUpdated {
        input: Fixed,
        setpoint: Fixed,
        output: Fixed,
        level: u16,
    },

    /// New gains or output limits were picked up from the configuration.
    TuningApplied,

    /// The grow-light relay switched.
    LightChanged(bool),

    /// The climate loop has started.
    Started,
}

/// A point-in-time telemetry snapshot suitable for logging.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryData {
    pub sensor: SensorStatus,
    pub fan_level: u16,
    /// `None` until the light has been switched once.
    pub light_on: Option<bool>,
    pub daytime: bool,
}
