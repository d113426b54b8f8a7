//! Capture samples and the interrupt → task handoff.
//!
//! A capture interrupt produces one [`CaptureSample`] per edge.  The sample
//! is handed to exactly one waiting task through a [`CaptureSignal`]: the
//! interrupt overwrites, the task takes.  An unconsumed sample is replaced
//! by the next one; the slot holds "most recent", not a queue.
//!
//! `Signal::signal` copies the whole record inside a critical section, so
//! the task never observes a half-written `{period, sub}` pair.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// One capture event at 1 µs resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureSample {
    /// Ticks between two consecutive edges of the same polarity.
    /// Zero marks an in-interrupt timeout (line silent).
    pub period: u32,
    /// Duration of the sub-phase within `period`: the low time for the
    /// sensor line, the high time for the zero-cross detector.
    pub sub: u32,
}

impl CaptureSample {
    /// Reported by the timeout interrupt when no edge arrived in time.
    pub const TIMEOUT: Self = Self { period: 0, sub: 0 };

    pub const fn new(period: u32, sub: u32) -> Self {
        Self { period, sub }
    }

    pub const fn is_timeout(&self) -> bool {
        self.period == 0
    }

    /// The remainder of the period after the sub-phase.
    pub const fn rest(&self) -> u32 {
        self.period.saturating_sub(self.sub)
    }
}

/// Single-slot, overwrite-on-write handoff from an ISR to one task.
pub type CaptureSignal = Signal<CriticalSectionRawMutex, CaptureSample>;

/// Interrupt-owned state that a task (or a second interrupt) also touches.
/// Every access goes through `lock`, which runs inside a critical section.
pub type IsrShared<T> = Mutex<CriticalSectionRawMutex, RefCell<T>>;

/// Edge timestamps → samples, for capture hardware that reports raw
/// counter values per edge rather than ready-made periods.
///
/// `lead` is the edge that starts a period (falling for the sensor line,
/// rising for the zero-cross detector); `trail` is the opposite edge.
#[derive(Debug, Default)]
pub struct EdgeTracker {
    last_lead: Option<u32>,
    last_trail: Option<u32>,
}

impl EdgeTracker {
    pub const fn new() -> Self {
        Self { last_lead: None, last_trail: None }
    }

    pub fn reset(&mut self) {
        self.last_lead = None;
        self.last_trail = None;
    }

    /// Start counting from `ts` as if a leading edge occurred there, so the
    /// first real leading edge already yields a (partial) sample.
    pub fn seed(&mut self, ts: u32) {
        self.last_lead = Some(ts);
        self.last_trail = None;
    }

    /// Record a trailing edge at counter value `ts`.
    pub fn trail(&mut self, ts: u32) {
        self.last_trail = Some(ts);
    }

    /// Record a leading edge; completes a sample once a previous leading
    /// edge is known.  Counter wrap is handled by wrapping subtraction.
    pub fn lead(&mut self, ts: u32) -> Option<CaptureSample> {
        let prev = self.last_lead.replace(ts)?;
        let period = ts.wrapping_sub(prev);
        let sub = match self.last_trail.take() {
            Some(t) => t.wrapping_sub(prev).min(period),
            None => 0,
        };
        Some(CaptureSample { period: period.max(1), sub })
    }
}
