//! State shared between the control task, the main loop and the console.
//!
//! ```text
//!   console ── apply() ──▶ ┌──────────────┐ ◀── versioned_snapshot() ── control task
//!                          │ SharedConfig │ ◀── snapshot() ── light tick
//!                          └──────────────┘
//!   control task ── record()/fail() ──▶ StatusCell ──▶ get() ── telemetry, `temp`
//! ```
//!
//! Configuration sits behind one async mutex.  Every acquisition is
//! bounded: a reader that cannot get the lock in time skips its update
//! instead of stalling.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, with_timeout};

use super::ports::ConfigError;
use crate::config::SystemConfig;
use crate::sensors::am2302::Reading;

// ───────────────────────────────────────────────────────────────
// Configuration
// ───────────────────────────────────────────────────────────────

pub struct SharedConfig {
    inner: Mutex<CriticalSectionRawMutex, SystemConfig>,
    revision: AtomicU32,
}

impl SharedConfig {
    pub const fn new(config: SystemConfig) -> Self {
        Self {
            inner: Mutex::new(config),
            revision: AtomicU32::new(0),
        }
    }

    /// Incremented on every committed change.
    pub fn revision(&self) -> u32 {
        self.revision.load(Ordering::Acquire)
    }

    /// Copy of the current configuration, or `None` if the lock was not
    /// acquired within `wait`.
    pub async fn snapshot(&self, wait: Duration) -> Option<SystemConfig> {
        let guard = with_timeout(wait, self.inner.lock()).await.ok()?;
        Some(guard.clone())
    }

    /// Like [`snapshot`](Self::snapshot), paired with the revision the copy
    /// belongs to.  Both are read under the lock, and `apply` bumps the
    /// revision before releasing it, so the pair is always consistent.
    pub async fn versioned_snapshot(&self, wait: Duration) -> Option<(SystemConfig, u32)> {
        let guard = with_timeout(wait, self.inner.lock()).await.ok()?;
        Some((guard.clone(), self.revision()))
    }

    /// Non-blocking snapshot.
    pub fn try_snapshot(&self) -> Option<SystemConfig> {
        self.inner.try_lock().ok().map(|g| g.clone())
    }

    /// Edit a candidate copy, validate it and commit it atomically.
    ///
    /// The stored configuration is untouched if `edit` or validation fails.
    pub async fn apply<F, E>(&self, wait: Duration, edit: F) -> Result<(), E>
    where
        F: FnOnce(&mut SystemConfig) -> Result<(), E>,
        E: From<ConfigError>,
    {
        let mut guard = with_timeout(wait, self.inner.lock())
            .await
            .map_err(|_| ConfigError::Busy)?;
        let mut candidate = guard.clone();
        edit(&mut candidate)?;
        candidate.validate()?;
        *guard = candidate;
        self.revision.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Published sensor status
// ───────────────────────────────────────────────────────────────

/// Last good reading plus the running failure count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorStatus {
    /// Most recent successful reading; kept across failed reads.
    pub last: Option<Reading>,
    /// Uptime (ms) of `last`.
    pub timestamp_ms: u32,
    pub read_errors: u32,
}

impl SensorStatus {
    pub const EMPTY: Self = Self {
        last: None,
        timestamp_ms: 0,
        read_errors: 0,
    };
}

/// Copy-in/copy-out cell, safe to read from any thread.
pub struct StatusCell(BlockingMutex<CriticalSectionRawMutex, Cell<SensorStatus>>);

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCell {
    pub const fn new() -> Self {
        Self(BlockingMutex::new(Cell::new(SensorStatus::EMPTY)))
    }

    pub fn get(&self) -> SensorStatus {
        self.0.lock(Cell::get)
    }

    /// Publish a good reading.
    pub fn record(&self, reading: Reading, timestamp_ms: u32) -> SensorStatus {
        self.0.lock(|c| {
            let mut s = c.get();
            s.last = Some(reading);
            s.timestamp_ms = timestamp_ms;
            c.set(s);
            s
        })
    }

    /// Count a failed read; the previous reading stays published.
    pub fn fail(&self) -> SensorStatus {
        self.0.lock(|c| {
            let mut s = c.get();
            s.read_errors = s.read_errors.wrapping_add(1);
            c.set(s);
            s
        })
    }
}

/// Status published by the control task.
pub static SENSOR_STATUS: StatusCell = StatusCell::new();
