//! AM2302 data line: open-drain pin, edge capture and silence timeout.
//!
//! ```text
//!   GPIO4 ──┬── open-drain out (start pulse)
//!           └── MCPWM0 capture, both edges ──▶ EdgeTracker ──▶ SENSOR_EDGES
//!   gptimer one-shot, 320 µs, restarted on every edge ──▶ TIMEOUT sample
//! ```
//!
//! The capture interrupt seeds its tracker with the first edge after
//! arming (the line release), so the sensor's response edge yields the
//! short preamble sample the decoder discards.
//!
//! On non-espidf targets [`SimSensorLine`] replays the nominal pulse train
//! of a configurable reading.

use crate::sensors::am2302::SensorLine;
use crate::sensors::capture::{CaptureSample, CaptureSignal};

#[cfg(target_os = "espidf")]
use crate::sensors::am2302::EDGE_TIMEOUT_US;
#[cfg(target_os = "espidf")]
use crate::sensors::capture::{EdgeTracker, IsrShared};

/// Capture samples from the sensor-line interrupts.
pub static SENSOR_EDGES: CaptureSignal = CaptureSignal::new();

// ═══════════════════════════════════════════════════════════════
//  ESP-IDF
// ═══════════════════════════════════════════════════════════════

#[cfg(target_os = "espidf")]
mod hw {
    use core::cell::RefCell;
    use core::sync::atomic::{AtomicBool, AtomicPtr, AtomicU32, Ordering};

    use esp_idf_svc::sys::*;

    use super::*;
    use crate::drivers::hw_init::{self, HwInitError};
    use crate::pins;

    struct EdgeState {
        tracker: EdgeTracker,
        seed_pending: bool,
    }

    /// Shared by the capture interrupt and `arm_capture`; every access holds
    /// the critical section, so the two cores never interleave.
    static EDGE_STATE: IsrShared<EdgeState> = IsrShared::new(RefCell::new(EdgeState {
        tracker: EdgeTracker::new(),
        seed_pending: false,
    }));
    static ARMED: AtomicBool = AtomicBool::new(false);
    static TICKS_PER_US: AtomicU32 = AtomicU32::new(1);
    static TIMEOUT_TIMER: AtomicPtr<gptimer_t> = AtomicPtr::new(core::ptr::null_mut());

    unsafe extern "C" fn on_edge(
        _chan: mcpwm_cap_channel_handle_t,
        edata: *const mcpwm_capture_event_data_t,
        _ctx: *mut core::ffi::c_void,
    ) -> bool {
        if !ARMED.load(Ordering::Acquire) {
            return false;
        }
        // SAFETY: the driver passes a valid event record.
        let ev = unsafe { &*edata };
        let ts = ev.cap_value;

        hw_init::arm_oneshot(TIMEOUT_TIMER.load(Ordering::Relaxed), EDGE_TIMEOUT_US);

        let sample = EDGE_STATE.lock(|cell| {
            let mut state = cell.borrow_mut();
            if state.seed_pending {
                state.tracker.seed(ts);
                state.seed_pending = false;
                None
            } else if ev.cap_edge == mcpwm_capture_edge_t_MCPWM_CAP_EDGE_POS {
                state.tracker.trail(ts);
                None
            } else {
                state.tracker.lead(ts)
            }
        });
        if let Some(s) = sample {
            let tpu = TICKS_PER_US.load(Ordering::Relaxed);
            SENSOR_EDGES.signal(CaptureSample::new((s.period / tpu).max(1), s.sub / tpu));
        }
        false
    }

    unsafe extern "C" fn on_timeout(
        timer: gptimer_handle_t,
        _edata: *const gptimer_alarm_event_data_t,
        _ctx: *mut core::ffi::c_void,
    ) -> bool {
        hw_init::disarm(timer);
        if ARMED.load(Ordering::Acquire) {
            SENSOR_EDGES.signal(CaptureSample::TIMEOUT);
        }
        false
    }

    /// The sensor line, owned by the decode task.
    pub struct Am2302Line {
        chan: mcpwm_cap_channel_handle_t,
    }

    // SAFETY: the handles are only used from the owning task.
    unsafe impl Send for Am2302Line {}

    impl Am2302Line {
        pub fn new() -> Result<Self, HwInitError> {
            hw_init::init_sensor_pin()?;
            let (timer, tpu) = hw_init::new_capture_timer(pins::AM2302_MCPWM_GROUP)?;
            TICKS_PER_US.store(tpu, Ordering::Relaxed);
            let chan = hw_init::new_capture_channel(timer, pins::AM2302_GPIO, true, Some(on_edge))?;
            // Capture setup reroutes the pin as input; restore the open-drain driver.
            // SAFETY: pin owned by this driver.
            unsafe {
                gpio_set_direction(pins::AM2302_GPIO, gpio_mode_t_GPIO_MODE_INPUT_OUTPUT_OD);
                gpio_set_level(pins::AM2302_GPIO, 1);
            }
            let timeout = hw_init::new_oneshot_timer(Some(on_timeout))?;
            TIMEOUT_TIMER.store(timeout, Ordering::Relaxed);
            log::info!("sensor: AM2302 line on GPIO{}", pins::AM2302_GPIO);
            Ok(Self { chan })
        }
    }

    impl SensorLine for Am2302Line {
        fn drive_low(&mut self) {
            hw_init::gpio_write(pins::AM2302_GPIO, false);
        }

        fn release(&mut self) {
            hw_init::gpio_write(pins::AM2302_GPIO, true);
        }

        fn arm_capture(&mut self) {
            EDGE_STATE.lock(|cell| {
                let mut state = cell.borrow_mut();
                state.tracker.reset();
                state.seed_pending = true;
            });
            SENSOR_EDGES.reset();
            ARMED.store(true, Ordering::Release);
            // SAFETY: channel handle owned by this driver.
            unsafe { mcpwm_capture_channel_enable(self.chan) };
        }

        fn disarm_capture(&mut self) {
            ARMED.store(false, Ordering::Release);
            // SAFETY: as above.
            unsafe { mcpwm_capture_channel_disable(self.chan) };
            hw_init::disarm(TIMEOUT_TIMER.load(Ordering::Relaxed));
        }

        async fn next_edge(&mut self) -> CaptureSample {
            SENSOR_EDGES.wait().await
        }
    }
}

#[cfg(target_os = "espidf")]
pub use hw::Am2302Line;

// ═══════════════════════════════════════════════════════════════
//  Simulation
// ═══════════════════════════════════════════════════════════════

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::collections::VecDeque;

    use super::*;
    use crate::sensors::am2302::{Packet, Reading, pulse_train};

    /// Host stand-in: every exchange replays the pulse train of `reading`.
    /// With no reading the line stays silent.
    #[derive(Debug, Default)]
    pub struct SimSensorLine {
        reading: Option<Reading>,
        pending: VecDeque<CaptureSample>,
        exchanges: u32,
    }

    impl SimSensorLine {
        pub fn new(reading: Option<Reading>) -> Self {
            Self {
                reading,
                ..Self::default()
            }
        }

        /// Number of start pulses seen.
        pub fn exchanges(&self) -> u32 {
            self.exchanges
        }
    }

    impl SensorLine for SimSensorLine {
        fn drive_low(&mut self) {
            self.exchanges += 1;
        }

        fn release(&mut self) {}

        fn arm_capture(&mut self) {
            self.pending.clear();
            if let Some(r) = self.reading {
                self.pending.extend(pulse_train(&Packet::from_reading(r)));
            }
        }

        fn disarm_capture(&mut self) {
            self.pending.clear();
        }

        async fn next_edge(&mut self) -> CaptureSample {
            match self.pending.pop_front() {
                Some(s) => s,
                None => core::future::pending().await,
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::SimSensorLine;
