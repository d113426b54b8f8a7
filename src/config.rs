//! System configuration parameters
//!
//! All tunable parameters for the GrowBox climate controller.
//! Values are persisted through the [`ConfigPort`](crate::app::ports::ConfigPort)
//! and edited at runtime from the console parameter registry.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::control::pid::{OutputLimits, PidGains};
use crate::fixed::Fixed;
use crate::schedule::LightSchedule;
use crate::sensors::am2302::COLLECTION_PERIOD_MS;

/// Highest manual fan level (percent).
pub const MAX_FAN_LEVEL: u8 = 100;

/// Which sensor value the PID regulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessVariable {
    /// Relative humidity, %RH.
    Humidity,
    /// Air temperature, °C.
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimmerMode {
    /// Fan runs at `manual_level`.
    Manual,
    /// Fan level follows the PID output.
    Pid,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Climate loop ---
    pub process_variable: ProcessVariable,
    /// Setpoint while the light window is on.
    pub setpoint_day: Fixed,
    /// Setpoint while the light window is off.
    pub setpoint_night: Fixed,
    pub gains: PidGains,
    /// PID output bounds, in fan percent.
    pub limits: OutputLimits,

    // --- Fan ---
    pub dimmer_mode: DimmerMode,
    /// Fan level (0-100%) in manual mode.
    pub manual_level: u8,

    // --- Light ---
    pub light: LightSchedule,

    // --- Timing ---
    /// Sensor poll / control period (milliseconds).
    pub poll_interval_ms: u32,
    /// Longest wait for the configuration lock (milliseconds).
    pub config_wait_ms: u32,
    /// Telemetry report interval (seconds)
    pub telemetry_interval_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Humidity above setpoint → negative error → more fan, hence
            // reverse-acting (negative) gains.
            process_variable: ProcessVariable::Humidity,
            setpoint_day: Fixed::from_int(60),
            setpoint_night: Fixed::from_int(70),
            gains: PidGains {
                kp: Fixed::from_int(-4),
                ki: Fixed::from_ratio(-1, 10),
                kd: Fixed::ZERO,
            },
            limits: OutputLimits::new(Fixed::ZERO, Fixed::from_int(i32::from(MAX_FAN_LEVEL))),

            dimmer_mode: DimmerMode::Pid,
            manual_level: 0,

            light: LightSchedule::default(),

            poll_interval_ms: COLLECTION_PERIOD_MS,
            config_wait_ms: 1000,
            telemetry_interval_secs: 10,
        }
    }
}

impl SystemConfig {
    /// Setpoint for the current light phase.
    pub fn setpoint(&self, daytime: bool) -> Fixed {
        if daytime { self.setpoint_day } else { self.setpoint_night }
    }

    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let setpoint_range = Fixed::from_int(-40)..=Fixed::from_int(100);
        if !setpoint_range.contains(&self.setpoint_day) || !setpoint_range.contains(&self.setpoint_night) {
            return Err(ConfigError::ValidationFailed("setpoints must be -40–100"));
        }
        let gain_range = Fixed::from_int(-1000)..=Fixed::from_int(1000);
        let PidGains { kp, ki, kd } = self.gains;
        if ![kp, ki, kd].iter().all(|g| gain_range.contains(g)) {
            return Err(ConfigError::ValidationFailed("gains must be -1000–1000"));
        }
        let level_range = Fixed::ZERO..=Fixed::from_int(i32::from(MAX_FAN_LEVEL));
        if !level_range.contains(&self.limits.low) || !level_range.contains(&self.limits.high) {
            return Err(ConfigError::ValidationFailed("output limits must be 0–100"));
        }
        if self.limits.low > self.limits.high {
            return Err(ConfigError::ValidationFailed("output low limit must be <= high limit"));
        }
        if self.manual_level > MAX_FAN_LEVEL {
            return Err(ConfigError::ValidationFailed("manual_level must be 0–100"));
        }
        if !(COLLECTION_PERIOD_MS..=60_000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::ValidationFailed("poll_interval_ms must be 2000–60000"));
        }
        if !(10..=5000).contains(&self.config_wait_ms) {
            return Err(ConfigError::ValidationFailed("config_wait_ms must be 10–5000"));
        }
        if !(1..=3600).contains(&self.telemetry_interval_secs) {
            return Err(ConfigError::ValidationFailed("telemetry_interval_secs must be 1–3600"));
        }
        Ok(())
    }
}
