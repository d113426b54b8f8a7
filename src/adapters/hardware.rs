//! Hardware adapters: bridge the sensor link, the dimmer and the relay
//! outputs to the domain port traits.
//!
//! [`SensorHardware`] and [`FanHardware`] are thin handles on the shared
//! sensor link and dimmer, so the control task and the console can each
//! hold their own.  [`LightHardware`] lives in the main loop and owns the
//! relay and heartbeat outputs.  All three are target-agnostic: the cfg-gated
//! drivers underneath supply the real or simulated peripherals.

use embedded_hal::digital::OutputPin;

use crate::app::ports::{FanPort, LightPort, SensorPort};
use crate::drivers::dimmer::{DimmerState, READ_WINDOW};
use crate::error::{DimmerError, SensorError};
use crate::sensors::SensorLink;
use crate::sensors::am2302::{READ_DEADLINE, Reading};
use crate::sensors::capture::CaptureSample;

/// The AM2302 link behind [`SensorPort`].
#[derive(Clone, Copy)]
pub struct SensorHardware<'a> {
    link: &'a SensorLink,
}

impl<'a> SensorHardware<'a> {
    pub fn new(link: &'a SensorLink) -> Self {
        Self { link }
    }
}

/// The fan dimmer behind [`FanPort`].
#[derive(Clone, Copy)]
pub struct FanHardware<'a> {
    dimmer: &'a DimmerState,
}

impl<'a> FanHardware<'a> {
    pub fn new(dimmer: &'a DimmerState) -> Self {
        Self { dimmer }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for SensorHardware<'_> {
    async fn read(&mut self) -> Result<Reading, SensorError> {
        self.link.read(READ_DEADLINE).await
    }
}

// ── FanPort implementation ────────────────────────────────────

impl FanPort for FanHardware<'_> {
    fn set_fan_level(&mut self, level: u16) {
        self.dimmer.set(level);
    }

    fn fan_level(&self) -> u16 {
        self.dimmer.level()
    }

    async fn zero_cross(&mut self) -> Result<CaptureSample, DimmerError> {
        self.dimmer.read(READ_WINDOW).await
    }
}

/// Grow-light relay and heartbeat LEDs.
pub struct LightHardware<P: OutputPin> {
    relay: P,
    leds: [P; 2],
}

impl<P: OutputPin> LightHardware<P> {
    pub fn new(relay: P, leds: [P; 2]) -> Self {
        Self { relay, leds }
    }

    pub fn relay(&self) -> &P {
        &self.relay
    }

    pub fn leds(&self) -> &[P; 2] {
        &self.leds
    }
}

fn drive<P: OutputPin>(pin: &mut P, high: bool) {
    let result = if high { pin.set_high() } else { pin.set_low() };
    if result.is_err() {
        log::warn!("light: output pin write failed");
    }
}

// ── LightPort implementation ──────────────────────────────────

impl<P: OutputPin> LightPort for LightHardware<P> {
    fn set_light(&mut self, on: bool) {
        drive(&mut self.relay, on);
    }

    fn set_heartbeat(&mut self, phase: bool) {
        let [a, b] = &mut self.leds;
        drive(a, phase);
        drive(b, !phase);
    }
}
