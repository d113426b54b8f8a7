//! Named runtime parameters.
//!
//! Every tunable field of [`SystemConfig`] is reachable by a dotted name
//! from the console (`get pid.kp`, `set light.start 07:30`).  The table is
//! static; each entry carries a formatter and a parser for its field.

use core::fmt::{self, Write};
use core::str::FromStr;

use crate::config::{DimmerMode, ProcessVariable, SystemConfig};
use crate::fixed::Fixed;
use crate::schedule::{LightMode, TimeOfDay};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamError {
    Unknown,
    /// The value did not parse for this parameter.
    Invalid,
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown parameter"),
            Self::Invalid => write!(f, "invalid value"),
        }
    }
}

type Getter = fn(&SystemConfig, &mut dyn Write) -> fmt::Result;
type Setter = fn(&mut SystemConfig, &str) -> Result<(), ParamError>;

pub struct Param {
    pub name: &'static str,
    pub help: &'static str,
    get: Getter,
    set: Setter,
}

impl Param {
    pub fn write_value(&self, cfg: &SystemConfig, out: &mut dyn Write) -> fmt::Result {
        (self.get)(cfg, out)
    }

    /// Parse `value` into `cfg`.  Range checks are left to
    /// [`SystemConfig::validate`].
    pub fn set(&self, cfg: &mut SystemConfig, value: &str) -> Result<(), ParamError> {
        (self.set)(cfg, value.trim())
    }
}

fn parse<T: FromStr>(value: &str) -> Result<T, ParamError> {
    value.parse().map_err(|_| ParamError::Invalid)
}

fn parse_pv(value: &str) -> Result<ProcessVariable, ParamError> {
    match value {
        "humidity" | "rh" => Ok(ProcessVariable::Humidity),
        "temperature" | "temp" => Ok(ProcessVariable::Temperature),
        _ => Err(ParamError::Invalid),
    }
}

fn parse_dimmer_mode(value: &str) -> Result<DimmerMode, ParamError> {
    match value {
        "manual" => Ok(DimmerMode::Manual),
        "pid" => Ok(DimmerMode::Pid),
        _ => Err(ParamError::Invalid),
    }
}

fn parse_light_mode(value: &str) -> Result<LightMode, ParamError> {
    match value {
        "off" | "0" => Ok(LightMode::Off),
        "on" | "1" => Ok(LightMode::On),
        "daytime" | "auto" => Ok(LightMode::Daytime),
        _ => Err(ParamError::Invalid),
    }
}

fn pv_name(pv: ProcessVariable) -> &'static str {
    match pv {
        ProcessVariable::Humidity => "humidity",
        ProcessVariable::Temperature => "temperature",
    }
}

fn dimmer_mode_name(mode: DimmerMode) -> &'static str {
    match mode {
        DimmerMode::Manual => "manual",
        DimmerMode::Pid => "pid",
    }
}

pub fn light_mode_name(mode: LightMode) -> &'static str {
    match mode {
        LightMode::Off => "off",
        LightMode::On => "on",
        LightMode::Daytime => "daytime",
    }
}

pub static PARAMS: [Param; 15] = [
    Param {
        name: "pv",
        help: "process variable: humidity | temperature",
        get: |c, o| o.write_str(pv_name(c.process_variable)),
        set: |c, v| {
            c.process_variable = parse_pv(v)?;
            Ok(())
        },
    },
    Param {
        name: "setpoint.day",
        help: "setpoint while the light window is on",
        get: |c, o| write!(o, "{}", c.setpoint_day),
        set: |c, v| {
            c.setpoint_day = parse::<Fixed>(v)?;
            Ok(())
        },
    },
    Param {
        name: "setpoint.night",
        help: "setpoint while the light window is off",
        get: |c, o| write!(o, "{}", c.setpoint_night),
        set: |c, v| {
            c.setpoint_night = parse::<Fixed>(v)?;
            Ok(())
        },
    },
    Param {
        name: "pid.kp",
        help: "proportional gain",
        get: |c, o| write!(o, "{}", c.gains.kp),
        set: |c, v| {
            c.gains.kp = parse::<Fixed>(v)?;
            Ok(())
        },
    },
    Param {
        name: "pid.ki",
        help: "integral gain (per second)",
        get: |c, o| write!(o, "{}", c.gains.ki),
        set: |c, v| {
            c.gains.ki = parse::<Fixed>(v)?;
            Ok(())
        },
    },
    Param {
        name: "pid.kd",
        help: "derivative gain (seconds)",
        get: |c, o| write!(o, "{}", c.gains.kd),
        set: |c, v| {
            c.gains.kd = parse::<Fixed>(v)?;
            Ok(())
        },
    },
    Param {
        name: "pid.low",
        help: "lowest PID output (fan %)",
        get: |c, o| write!(o, "{}", c.limits.low),
        set: |c, v| {
            c.limits.low = parse::<Fixed>(v)?;
            Ok(())
        },
    },
    Param {
        name: "pid.high",
        help: "highest PID output (fan %)",
        get: |c, o| write!(o, "{}", c.limits.high),
        set: |c, v| {
            c.limits.high = parse::<Fixed>(v)?;
            Ok(())
        },
    },
    Param {
        name: "dimmer.mode",
        help: "fan control: manual | pid",
        get: |c, o| o.write_str(dimmer_mode_name(c.dimmer_mode)),
        set: |c, v| {
            c.dimmer_mode = parse_dimmer_mode(v)?;
            Ok(())
        },
    },
    Param {
        name: "dimmer.level",
        help: "fan level in manual mode (0-100)",
        get: |c, o| write!(o, "{}", c.manual_level),
        set: |c, v| {
            c.manual_level = parse(v)?;
            Ok(())
        },
    },
    Param {
        name: "light.mode",
        help: "grow light: off | on | daytime",
        get: |c, o| o.write_str(light_mode_name(c.light.mode)),
        set: |c, v| {
            c.light.mode = parse_light_mode(v)?;
            Ok(())
        },
    },
    Param {
        name: "light.start",
        help: "start of the light window (hh:mm[:ss])",
        get: |c, o| write!(o, "{}", c.light.start),
        set: |c, v| {
            c.light.start = parse::<TimeOfDay>(v)?;
            Ok(())
        },
    },
    Param {
        name: "light.end",
        help: "end of the light window (hh:mm[:ss])",
        get: |c, o| write!(o, "{}", c.light.end),
        set: |c, v| {
            c.light.end = parse::<TimeOfDay>(v)?;
            Ok(())
        },
    },
    Param {
        name: "poll.ms",
        help: "sensor poll period (2000-60000 ms)",
        get: |c, o| write!(o, "{}", c.poll_interval_ms),
        set: |c, v| {
            c.poll_interval_ms = parse(v)?;
            Ok(())
        },
    },
    Param {
        name: "telemetry.s",
        help: "telemetry report period (1-3600 s)",
        get: |c, o| write!(o, "{}", c.telemetry_interval_secs),
        set: |c, v| {
            c.telemetry_interval_secs = parse(v)?;
            Ok(())
        },
    },
];

pub fn find(name: &str) -> Option<&'static Param> {
    PARAMS.iter().find(|p| p.name == name)
}
