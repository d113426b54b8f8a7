//! Zero-cross capture and triac gate timing for the fan dimmer.
//!
//! ```text
//!   GPIO5 ── MCPWM1 capture, both edges ──▶ EdgeTracker ──▶ DIMMER.on_zero_cross
//!                                                              │
//!   gptimer ◀── delay alarm ◀── set_phase_delay ◀──────────────┘
//!      │
//!      ├─ alarm 1: gate HIGH, re-arm at delay + width
//!      └─ alarm 2: gate LOW
//! ```
//!
//! The gate pulse is clipped so it ends before the trigger period (half
//! cycle − 1 tick) runs out.  On non-espidf targets [`SimPhaseTimers`]
//! records the register values, and [`simulate_zero_cross`] runs the
//! interrupt body against them.

use crate::drivers::dimmer::{DimmerState, PULSE_CONTINUOUS, PhaseTimers};
use crate::sensors::capture::CaptureSample;

/// Where the gate pulse should end, clipped to the trigger period.
/// `None` when the pulse would start at or after the period end.
pub fn pulse_end(delay: u16, width: u16, trigger_period: u16) -> Option<u32> {
    let start = u32::from(delay);
    let limit = u32::from(trigger_period);
    if start >= limit {
        return None;
    }
    Some((start + u32::from(width)).min(limit))
}

// ═══════════════════════════════════════════════════════════════
//  ESP-IDF
// ═══════════════════════════════════════════════════════════════

#[cfg(target_os = "espidf")]
mod hw {
    use core::cell::RefCell;
    use core::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

    use esp_idf_svc::sys::*;

    use super::*;
    use crate::drivers::dimmer::DIMMER;
    use crate::drivers::hw_init::{self, HwInitError};
    use crate::pins;
    use crate::sensors::capture::{EdgeTracker, IsrShared};

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Stage {
        Idle,
        Delay,
        Pulse,
    }

    /// Register image shared by the capture and gate-timer interrupts.
    struct GateState {
        tracker: EdgeTracker,
        trigger_period: u16,
        width: u16,
        pulse_end: u32,
        stage: Stage,
    }

    static GATE: IsrShared<GateState> = IsrShared::new(RefCell::new(GateState {
        tracker: EdgeTracker::new(),
        trigger_period: 0,
        width: 0,
        pulse_end: 0,
        stage: Stage::Idle,
    }));
    static TICKS_PER_US: AtomicU32 = AtomicU32::new(1);
    static GATE_TIMER: AtomicPtr<gptimer_t> = AtomicPtr::new(core::ptr::null_mut());

    /// [`PhaseTimers`] over the gate gptimer and GPIO.
    struct EspPhaseTimers<'a> {
        state: &'a mut GateState,
        timer: gptimer_handle_t,
    }

    impl PhaseTimers for EspPhaseTimers<'_> {
        fn set_trigger_period(&mut self, ticks: u16) {
            self.state.trigger_period = ticks;
        }

        fn set_pulse_width(&mut self, ticks: u16) {
            self.state.width = ticks;
        }

        fn set_phase_delay(&mut self, ticks: u16) {
            let s = &mut *self.state;
            match s.width {
                0 => {
                    hw_init::disarm(self.timer);
                    hw_init::gpio_write(pins::TRIAC_GATE_GPIO, false);
                    s.stage = Stage::Idle;
                }
                PULSE_CONTINUOUS => {
                    hw_init::disarm(self.timer);
                    hw_init::gpio_write(pins::TRIAC_GATE_GPIO, true);
                    s.stage = Stage::Idle;
                }
                width => match pulse_end(ticks, width, s.trigger_period) {
                    Some(end) => {
                        hw_init::gpio_write(pins::TRIAC_GATE_GPIO, false);
                        s.pulse_end = end;
                        s.stage = Stage::Delay;
                        hw_init::arm_oneshot(self.timer, u32::from(ticks));
                    }
                    None => {
                        hw_init::disarm(self.timer);
                        s.stage = Stage::Idle;
                    }
                },
            }
        }
    }

    unsafe extern "C" fn on_zero_cross(
        _chan: mcpwm_cap_channel_handle_t,
        edata: *const mcpwm_capture_event_data_t,
        _ctx: *mut core::ffi::c_void,
    ) -> bool {
        // SAFETY: the driver passes a valid event record.
        let ev = unsafe { &*edata };
        GATE.lock(|cell| {
            let mut guard = cell.borrow_mut();
            let state = &mut *guard;
            if ev.cap_edge == mcpwm_capture_edge_t_MCPWM_CAP_EDGE_NEG {
                state.tracker.trail(ev.cap_value);
                return;
            }
            let Some(s) = state.tracker.lead(ev.cap_value) else {
                return;
            };
            let tpu = TICKS_PER_US.load(Ordering::Relaxed);
            let sample = CaptureSample::new((s.period / tpu).max(1), s.sub / tpu);
            let mut timers = EspPhaseTimers {
                state,
                timer: GATE_TIMER.load(Ordering::Relaxed),
            };
            DIMMER.on_zero_cross(sample, &mut timers);
        });
        false
    }

    unsafe extern "C" fn on_gate_alarm(
        timer: gptimer_handle_t,
        _edata: *const gptimer_alarm_event_data_t,
        _ctx: *mut core::ffi::c_void,
    ) -> bool {
        GATE.lock(|cell| {
            let mut state = cell.borrow_mut();
            match state.stage {
                Stage::Delay => {
                    hw_init::gpio_write(pins::TRIAC_GATE_GPIO, true);
                    state.stage = Stage::Pulse;
                    hw_init::rearm_at(timer, state.pulse_end);
                }
                Stage::Pulse | Stage::Idle => {
                    hw_init::gpio_write(pins::TRIAC_GATE_GPIO, false);
                    state.stage = Stage::Idle;
                    hw_init::disarm(timer);
                }
            }
        });
        false
    }

    /// Start zero-cross capture; from here on the dimmer follows [`DIMMER`].
    pub fn init_zero_cross() -> Result<(), HwInitError> {
        let timer = hw_init::new_oneshot_timer(Some(on_gate_alarm))?;
        GATE_TIMER.store(timer, Ordering::Relaxed);
        let (cap_timer, tpu) = hw_init::new_capture_timer(pins::ZERO_CROSS_MCPWM_GROUP)?;
        TICKS_PER_US.store(tpu, Ordering::Relaxed);
        let chan = hw_init::new_capture_channel(cap_timer, pins::ZERO_CROSS_GPIO, false, Some(on_zero_cross))?;
        // SAFETY: channel handle just created; enabled once.
        let ret = unsafe { mcpwm_capture_channel_enable(chan) };
        if ret != ESP_OK as esp_err_t {
            return Err(HwInitError::CaptureInitFailed(ret));
        }
        log::info!(
            "dimmer: zero-cross on GPIO{}, gate on GPIO{}",
            pins::ZERO_CROSS_GPIO,
            pins::TRIAC_GATE_GPIO
        );
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
pub use hw::init_zero_cross;

// ═══════════════════════════════════════════════════════════════
//  Simulation
// ═══════════════════════════════════════════════════════════════

/// Register image for host runs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimPhaseTimers {
    pub trigger_period: u16,
    pub pulse_width: u16,
    pub phase_delay: u16,
}

impl SimPhaseTimers {
    /// Gate pulse `[start, end)` this image would produce, if any.
    pub fn pulse(&self) -> Option<(u32, u32)> {
        match self.pulse_width {
            0 => None,
            PULSE_CONTINUOUS => Some((0, u32::from(self.trigger_period))),
            w => pulse_end(self.phase_delay, w, self.trigger_period)
                .map(|end| (u32::from(self.phase_delay), end)),
        }
    }
}

impl PhaseTimers for SimPhaseTimers {
    fn set_trigger_period(&mut self, ticks: u16) {
        self.trigger_period = ticks;
    }

    fn set_pulse_width(&mut self, ticks: u16) {
        self.pulse_width = ticks;
    }

    fn set_phase_delay(&mut self, ticks: u16) {
        self.phase_delay = ticks;
    }
}

/// Run the zero-cross interrupt body of `dimmer` once, as the capture ISR
/// would, and return the resulting register image.
pub fn simulate_zero_cross(dimmer: &DimmerState, sample: CaptureSample) -> SimPhaseTimers {
    let mut timers = SimPhaseTimers::default();
    dimmer.on_zero_cross(sample, &mut timers);
    timers
}

#[cfg(not(target_os = "espidf"))]
pub fn init_zero_cross() -> Result<(), crate::drivers::hw_init::HwInitError> {
    log::info!("dimmer(sim): no mains, zero-cross capture skipped");
    Ok(())
}
