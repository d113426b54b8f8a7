//! ESP32 time adapter.
//!
//! Implements [`ClockPort`]: monotonic uptime plus a local wall clock that
//! the console sets by hand (there is no network time source).
//!
//! - **`target_os = "espidf"`**: uptime from `esp_timer_get_time()`; the
//!   wall clock is the libc system time (`gettimeofday`/`settimeofday`),
//!   so it survives a task restart but not a reboot.
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.

use crate::app::ports::ClockPort;
use crate::schedule::TimeOfDay;

/// Time adapter for the ESP32-S3 platform.
///
/// All instances share one wall clock, as they do on target.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

/// Simulated wall clock: the instant it was set and the time set.
#[cfg(not(target_os = "espidf"))]
static WALL_ANCHOR: std::sync::Mutex<Option<(std::time::Instant, TimeOfDay)>> = std::sync::Mutex::new(None);

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything before 2020-01-01 is an unset clock.
#[cfg(target_os = "espidf")]
const EPOCH_2020: i64 = 1_577_836_800;

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic, wraps at `u64::MAX`).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic, wraps at `u64::MAX`).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    #[cfg(target_os = "espidf")]
    fn local_tm(secs: i64) -> Option<esp_idf_svc::sys::tm> {
        let secs = secs as esp_idf_svc::sys::time_t;
        // SAFETY: zeroed tm is a valid out-parameter.
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        Some(tm)
    }

    #[cfg(target_os = "espidf")]
    fn system_secs() -> Option<i64> {
        let mut tv = esp_idf_svc::sys::timeval { tv_sec: 0, tv_usec: 0 };
        // SAFETY: tv is a valid out-parameter; no timezone requested.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        Some(tv.tv_sec as i64)
    }
}

impl ClockPort for Esp32TimeAdapter {
    fn uptime_ms(&self) -> u32 {
        (self.uptime_us() / 1000) as u32
    }

    #[cfg(target_os = "espidf")]
    fn time_of_day(&self) -> Option<TimeOfDay> {
        let secs = Self::system_secs()?;
        if secs < EPOCH_2020 {
            return None;
        }
        let tm = Self::local_tm(secs)?;
        TimeOfDay::new(
            u8::try_from(tm.tm_hour).ok()?,
            u8::try_from(tm.tm_min).ok()?,
            u8::try_from(tm.tm_sec.min(59)).ok()?,
        )
    }

    #[cfg(not(target_os = "espidf"))]
    fn time_of_day(&self) -> Option<TimeOfDay> {
        let anchor = *WALL_ANCHOR.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (at, base) = anchor?;
        let elapsed = at.elapsed().as_secs() % 86_400;
        Some(TimeOfDay::from_seconds(base.seconds() + elapsed as u32))
    }

    /// Keeps the current date when the clock is already set; otherwise
    /// the date becomes 2020-01-02.
    #[cfg(target_os = "espidf")]
    fn set_time_of_day(&mut self, time: TimeOfDay) -> bool {
        use esp_idf_svc::sys::*;

        let mut tm = match Self::system_secs().filter(|s| *s >= EPOCH_2020).and_then(Self::local_tm) {
            Some(tm) => tm,
            None => {
                // SAFETY: all-zero tm is valid; the date fields are set below.
                let mut tm: tm = unsafe { core::mem::zeroed() };
                tm.tm_year = 120;
                tm.tm_mon = 0;
                tm.tm_mday = 2;
                tm
            }
        };
        tm.tm_hour = i32::from(time.hour());
        tm.tm_min = i32::from(time.minute());
        tm.tm_sec = i32::from(time.second());
        tm.tm_isdst = -1;

        // SAFETY: tm fully initialised above.
        let secs = unsafe { mktime(&mut tm) };
        if secs < 0 {
            return false;
        }
        let tv = timeval { tv_sec: secs, tv_usec: 0 };
        // SAFETY: tv is valid; no timezone argument.
        let ok = unsafe { settimeofday(&tv, core::ptr::null()) } == 0;
        if ok {
            log::info!("clock: set to {}", time);
        } else {
            log::warn!("clock: settimeofday rejected {}", time);
        }
        ok
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_time_of_day(&mut self, time: TimeOfDay) -> bool {
        *WALL_ANCHOR.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
            Some((std::time::Instant::now(), time));
        log::info!("clock(sim): set to {}", time);
        true
    }
}
