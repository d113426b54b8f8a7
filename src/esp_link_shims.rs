//! ESP-IDF runtime symbol providers for third-party crates.
//!
//! embassy-time links against `_embassy_time_now` and
//! `_embassy_time_schedule_wake`.  Time comes from `esp_timer`; wakeups are
//! served by one background thread that sleeps until the earliest pending
//! deadline.  The critical-section implementation comes from esp-idf-hal.

#[cfg(target_os = "espidf")]
use esp_idf_hal as _;

#[cfg(target_os = "espidf")]
mod time_driver {
    use core::task::Waker;
    use core::time::Duration;
    use std::sync::{Condvar, Mutex, Once, PoisonError};

    struct WakeQueue {
        pending: Mutex<Vec<(u64, Waker)>>,
        changed: Condvar,
    }

    static QUEUE: WakeQueue = WakeQueue {
        pending: Mutex::new(Vec::new()),
        changed: Condvar::new(),
    };
    static START: Once = Once::new();

    #[unsafe(no_mangle)]
    pub fn _embassy_time_now() -> u64 {
        // SAFETY: esp_timer is running before app_main.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Register `waker` to be woken at `at` (µs since boot).  A waker that
    /// is already registered keeps the earlier of the two deadlines.
    #[unsafe(no_mangle)]
    pub fn _embassy_time_schedule_wake(at: u64, waker: &Waker) {
        START.call_once(|| {
            let spawned = std::thread::Builder::new()
                .name("time-wake".into())
                .stack_size(4096)
                .spawn(wake_loop);
            if let Err(e) = spawned {
                log::error!("time: wake thread failed: {}", e);
            }
        });

        let mut pending = QUEUE.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.iter_mut().find(|(_, w)| w.will_wake(waker)) {
            Some(entry) => entry.0 = entry.0.min(at),
            None => pending.push((at, waker.clone())),
        }
        QUEUE.changed.notify_one();
    }

    fn wake_loop() {
        let mut pending = QUEUE.pending.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            let now = _embassy_time_now();
            let mut due = Vec::new();
            pending.retain(|(at, w)| {
                if *at <= now {
                    due.push(w.clone());
                    false
                } else {
                    true
                }
            });
            if !due.is_empty() {
                drop(pending);
                due.into_iter().for_each(Waker::wake);
                pending = QUEUE.pending.lock().unwrap_or_else(PoisonError::into_inner);
                continue;
            }

            pending = match pending.iter().map(|(at, _)| *at).min() {
                Some(next) => {
                    let wait = Duration::from_micros(next.saturating_sub(now));
                    QUEUE
                        .changed
                        .wait_timeout(pending, wait)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => QUEUE.changed.wait(pending).unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}
