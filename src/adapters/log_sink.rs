//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::fixed::Fixed;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn tenths(v: impl Into<i32>) -> Fixed {
    Fixed::from_tenths(v.into())
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                let light = match t.light_on {
                    Some(true) => "on",
                    Some(false) => "off",
                    None => "-",
                };
                match t.sensor.last {
                    Some(r) => info!(
                        "TELEM | T={:.1}\u{00b0}C RH={:.1}% | fan={}% | light={} | {} | errors={}",
                        tenths(r.temperature),
                        tenths(r.humidity),
                        t.fan_level,
                        light,
                        if t.daytime { "day" } else { "night" },
                        t.sensor.read_errors,
                    ),
                    None => info!(
                        "TELEM | no reading | fan={}% | light={} | {} | errors={}",
                        t.fan_level,
                        light,
                        if t.daytime { "day" } else { "night" },
                        t.sensor.read_errors,
                    ),
                }
            }
            AppEvent::SensorRead(r) => {
                debug!("SENSOR | T={:.1} RH={:.1}", tenths(r.temperature), tenths(r.humidity));
            }
            AppEvent::SensorFailed { error, errors } => {
                warn!("SENSOR | read failed: {} (total {})", error, errors);
            }
            AppEvent::ControlUpdated { input, setpoint, output, level } => {
                debug!(
                    "PID | pv={:.2} sp={:.2} out={:.2} -> fan={}%",
                    input, setpoint, output, level
                );
            }
            AppEvent::TuningApplied => {
                info!("PID | new tuning applied");
            }
            AppEvent::LightChanged(on) => {
                info!("LIGHT | {}", if *on { "on" } else { "off" });
            }
            AppEvent::Started => {
                info!("START | climate loop running");
            }
        }
    }
}
