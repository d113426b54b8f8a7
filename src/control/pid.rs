//! Fixed-point PID controller for fan speed.
//!
//! Anti-windup clamps the integral accumulator itself: after every update
//! `Ki · integral` lies within the output limits, so a long saturation
//! never leaves a reservoir that has to drain before the output moves.
//!
//! Precondition for all setters: `limits.low <= limits.high`.

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: Fixed,
    pub ki: Fixed,
    pub kd: Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLimits {
    pub low: Fixed,
    pub high: Fixed,
}

impl OutputLimits {
    pub const fn new(low: Fixed, high: Fixed) -> Self {
        Self { low, high }
    }
}

/// What a gain change does to the integral accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegralPolicy {
    /// Keep the raw accumulator; the integral term jumps with `Ki`.
    Keep,
    /// Rescale so `Ki · integral` is unchanged across the switch.
    Bumpless,
    /// Zero the accumulator.
    Reset,
}

#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    limits: OutputLimits,
    integral: Fixed,
    prev_error: Fixed,
    prev_timestamp: Option<u32>,
}

impl PidController {
    pub fn new(gains: PidGains, limits: OutputLimits) -> Self {
        debug_assert!(limits.low <= limits.high);
        Self {
            gains,
            limits,
            integral: Fixed::ZERO,
            prev_error: Fixed::ZERO,
            prev_timestamp: None,
        }
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn limits(&self) -> OutputLimits {
        self.limits
    }

    pub fn integral(&self) -> Fixed {
        self.integral
    }

    /// One controller step.  `timestamp_ms` is a monotonic millisecond
    /// counter; wrap-around is tolerated.
    pub fn compute(&mut self, input: Fixed, setpoint: Fixed, timestamp_ms: u32) -> Fixed {
        let error = setpoint.saturating_sub(input);

        let mut derivative = Fixed::ZERO;
        if let Some(prev) = self.prev_timestamp {
            let dt = Fixed::from_millis(timestamp_ms.wrapping_sub(prev));
            self.integral = self.integral.saturating_add(error.mul(dt));
            self.clamp_integral();
            if dt != Fixed::ZERO {
                derivative = error.saturating_sub(self.prev_error).saturating_div(dt);
            }
        }

        self.prev_error = error;
        self.prev_timestamp = Some(timestamp_ms);

        let p = self.gains.kp.mul(error);
        let i = self.gains.ki.mul(self.integral);
        let d = self.gains.kd.mul(derivative);
        p.saturating_add(i)
            .saturating_add(d)
            .clamp(self.limits.low, self.limits.high)
    }

    /// Replace the gains, keeping the raw accumulator (reclamped to the
    /// new `Ki`).
    pub fn set_coef(&mut self, gains: PidGains) {
        self.set_coef_with(gains, IntegralPolicy::Keep);
    }

    pub fn set_coef_with(&mut self, gains: PidGains, policy: IntegralPolicy) {
        match policy {
            IntegralPolicy::Keep => {}
            IntegralPolicy::Reset => self.integral = Fixed::ZERO,
            IntegralPolicy::Bumpless => {
                let term = self.gains.ki.mul(self.integral);
                self.integral = term.checked_div(gains.ki).unwrap_or(Fixed::ZERO);
            }
        }
        self.gains = gains;
        self.clamp_integral();
    }

    /// Replace the output bounds and reclamp the accumulator immediately.
    pub fn set_limits(&mut self, limits: OutputLimits) {
        debug_assert!(limits.low <= limits.high);
        self.limits = limits;
        self.clamp_integral();
    }

    pub fn reset(&mut self) {
        self.integral = Fixed::ZERO;
        self.prev_error = Fixed::ZERO;
        self.prev_timestamp = None;
    }

    /// Keep `Ki · integral` within `[low, high]`; with `Ki = 0` the
    /// accumulator is held at zero.
    fn clamp_integral(&mut self) {
        let ki = self.gains.ki;
        let (Some(a), Some(b)) = (
            self.limits.low.checked_div(ki),
            self.limits.high.checked_div(ki),
        ) else {
            self.integral = Fixed::ZERO;
            return;
        };
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.integral = self.integral.clamp(lo, hi);
    }
}
