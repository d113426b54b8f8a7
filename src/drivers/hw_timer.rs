//! Periodic ticks for the main loop, using ESP-IDF's esp_timer API.
//!
//! - 1 Hz daytime tick: light schedule and heartbeat
//! - telemetry tick at the configured interval
//!
//! Timer callbacks execute in the ESP timer task context (not ISR) and
//! only push into the lock-free event queue.  On simulation targets a
//! background thread sleeps between pushes.

use crate::events::{Event, push_event};

/// Daytime tick period.
pub const DAYTIME_TICK_US: u64 = 1_000_000;

#[cfg(target_os = "espidf")]
mod hw {
    use core::sync::atomic::{AtomicPtr, Ordering};

    use esp_idf_svc::sys::*;
    use log::{error, info};

    use super::*;

    static DAYTIME_TIMER: AtomicPtr<esp_timer> = AtomicPtr::new(core::ptr::null_mut());
    static TELEMETRY_TIMER: AtomicPtr<esp_timer> = AtomicPtr::new(core::ptr::null_mut());

    unsafe extern "C" fn daytime_tick_cb(_arg: *mut core::ffi::c_void) {
        push_event(Event::DaytimeTick);
    }

    unsafe extern "C" fn telemetry_tick_cb(_arg: *mut core::ffi::c_void) {
        push_event(Event::TelemetryTick);
    }

    fn start_periodic(
        slot: &AtomicPtr<esp_timer>,
        name: &'static [u8],
        cb: unsafe extern "C" fn(*mut core::ffi::c_void),
        period_us: u64,
    ) -> bool {
        let args = esp_timer_create_args_t {
            callback: Some(cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: name.as_ptr().cast(),
            skip_unhandled_events: true,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: args outlive the call; the callback only pushes events.
        let ret = unsafe { esp_timer_create(&args, &mut handle) };
        if ret != ESP_OK as esp_err_t {
            error!("hw_timer: create failed (rc={})", ret);
            return false;
        }
        // SAFETY: handle just created.
        let ret = unsafe { esp_timer_start_periodic(handle, period_us) };
        if ret != ESP_OK as esp_err_t {
            error!("hw_timer: start failed (rc={})", ret);
            return false;
        }
        slot.store(handle, Ordering::Release);
        true
    }

    /// Start the daytime and telemetry ticks.  Failures are logged and the
    /// loop runs without that tick.
    pub fn start_timers(telemetry_secs: u32) {
        let day = start_periodic(&DAYTIME_TIMER, b"daytime\0", daytime_tick_cb, DAYTIME_TICK_US);
        let tel = start_periodic(
            &TELEMETRY_TIMER,
            b"telemetry\0",
            telemetry_tick_cb,
            u64::from(telemetry_secs.max(1)) * 1_000_000,
        );
        if day && tel {
            info!("hw_timer: daytime@1Hz + telemetry every {}s started", telemetry_secs);
        }
    }

    /// Change the telemetry period in place.
    pub fn set_telemetry_interval(secs: u32) {
        let handle = TELEMETRY_TIMER.load(Ordering::Acquire);
        if handle.is_null() {
            return;
        }
        // SAFETY: handle created by start_timers and never deleted.
        let ret = unsafe { esp_timer_restart(handle, u64::from(secs.max(1)) * 1_000_000) };
        if ret != ESP_OK as esp_err_t {
            error!("hw_timer: telemetry restart failed (rc={})", ret);
        }
    }
}

#[cfg(target_os = "espidf")]
pub use hw::{set_telemetry_interval, start_timers};

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    static TELEMETRY_SECS: AtomicU32 = AtomicU32::new(10);

    pub fn start_timers(telemetry_secs: u32) {
        TELEMETRY_SECS.store(telemetry_secs.max(1), Ordering::Relaxed);
        let spawned = std::thread::Builder::new()
            .name("sim-ticks".into())
            .spawn(|| {
                let mut secs = 0u32;
                loop {
                    std::thread::sleep(Duration::from_micros(DAYTIME_TICK_US));
                    push_event(Event::DaytimeTick);
                    secs += 1;
                    if secs >= TELEMETRY_SECS.load(Ordering::Relaxed) {
                        secs = 0;
                        push_event(Event::TelemetryTick);
                    }
                }
            });
        match spawned {
            Ok(_) => log::info!("hw_timer(sim): tick thread started"),
            Err(e) => log::error!("hw_timer(sim): tick thread failed: {}", e),
        }
    }

    pub fn set_telemetry_interval(secs: u32) {
        TELEMETRY_SECS.store(secs.max(1), Ordering::Relaxed);
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::{set_telemetry_interval, start_timers};
