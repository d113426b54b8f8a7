//! AC phase-control actuator (triac dimmer for the ventilation fan).
//!
//! ```text
//!  zero-cross ─▶ Counter A (capture {period, offset})
//!                   │ edge retriggers
//!                   ▼
//!                Counter B (one-shot phase delay) ── expiry ──▶ Counter C
//!                                                               (trigger pulse,
//!                                                                reload = half − 1)
//! ```
//!
//! [`DimmerState::on_zero_cross`] is the whole interrupt body: integer
//! arithmetic only, one atomic load of the command word, three register
//! writes and a signal for the diagnostic reader.
//!
//! The command word packs `[drive:8 | level:8 | phase:16]` so task-side
//! writers publish a level and its table entry with one atomic store and the
//! interrupt can never pair a new level with an old phase.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_time::{Duration, with_timeout};

use super::phase_table::PhaseTable;
use crate::error::DimmerError;
use crate::sensors::capture::{CaptureSample, CaptureSignal};

/// Width of the triac gate pulse at 1 µs per tick.
pub const TRIAC_PULSE_US: u16 = 100;
/// Pulse width that keeps the gate asserted for the whole cycle.
pub const PULSE_CONTINUOUS: u16 = u16::MAX;
/// Default window for [`DimmerState::read`].
pub const READ_WINDOW: Duration = Duration::from_millis(100);

const TAG_OFF: u32 = 0;
const TAG_PHASED: u32 = 1;
const TAG_FULL: u32 = 2;

/// Effective drive decoded from the command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drive {
    Off,
    Phased { level: u16, phase: u16 },
    Full,
}

impl Drive {
    const fn pack(self) -> u32 {
        match self {
            Self::Off => TAG_OFF << 24,
            Self::Phased { level, phase } => {
                (TAG_PHASED << 24) | (((level & 0xff) as u32) << 16) | phase as u32
            }
            Self::Full => TAG_FULL << 24,
        }
    }

    const fn unpack(word: u32) -> Self {
        match word >> 24 {
            TAG_PHASED => Self::Phased {
                level: ((word >> 16) & 0xff) as u16,
                phase: (word & 0xffff) as u16,
            },
            TAG_FULL => Self::Full,
            _ => Self::Off,
        }
    }
}

/// Counter B/C register access used by the zero-cross handler.
pub trait PhaseTimers {
    /// Counter C auto-reload, tracking the corrected half cycle.
    fn set_trigger_period(&mut self, ticks: u16);
    /// Counter C compare: gate pulse width.  `0` never asserts,
    /// [`PULSE_CONTINUOUS`] asserts for the whole cycle.
    fn set_pulse_width(&mut self, ticks: u16);
    /// Counter B one-shot load: delay from this crossing to the pulse.
    fn set_phase_delay(&mut self, ticks: u16);
}

/// Delay (ticks) from the zero-cross capture to the gate pulse.
///
/// `((offset − half) >> 1) + ((phase · half) >> shift)`, evaluated in `i64`
/// and clamped to the counter range; a negative result fires immediately.
pub fn phase_delay(sample: CaptureSample, phase: u16, shift: u32) -> u16 {
    let half = i64::from(sample.period >> 1);
    let offset = i64::from(sample.sub);
    let delay = ((offset - half) >> 1) + ((i64::from(phase) * half) >> shift);
    delay.clamp(0, i64::from(u16::MAX)) as u16
}

fn to_ticks(v: u32) -> u16 {
    v.min(u32::from(u16::MAX)) as u16
}

/// Shared dimmer state: written by tasks, read by the zero-cross interrupt.
pub struct DimmerState {
    table: &'static PhaseTable,
    command: AtomicU32,
    zero_cross: CaptureSignal,
}

impl DimmerState {
    pub const fn new(table: &'static PhaseTable) -> Self {
        Self {
            table,
            command: AtomicU32::new(Drive::Off.pack()),
            zero_cross: CaptureSignal::new(),
        }
    }

    pub fn table(&self) -> &'static PhaseTable {
        self.table
    }

    pub fn max_level(&self) -> u16 {
        self.table.max_level()
    }

    /// Request a power level.  Never fails: `0` is off, anything at or
    /// above the table maximum is full on.  Takes effect at the next zero
    /// crossing.
    pub fn set(&self, level: u16) {
        let drive = match self.table.entry(level) {
            Some(phase) => Drive::Phased { level, phase },
            None if level == 0 => Drive::Off,
            None => Drive::Full,
        };
        self.command.store(drive.pack(), Ordering::Release);
    }

    pub fn drive(&self) -> Drive {
        Drive::unpack(self.command.load(Ordering::Acquire))
    }

    /// Currently requested level (`0..=max_level`).
    pub fn level(&self) -> u16 {
        match self.drive() {
            Drive::Off => 0,
            Drive::Phased { level, .. } => level,
            Drive::Full => self.table.max_level(),
        }
    }

    /// Zero-cross interrupt body.
    pub fn on_zero_cross<T: PhaseTimers>(&self, sample: CaptureSample, timers: &mut T) {
        let half = sample.period >> 1;
        timers.set_trigger_period(to_ticks(half.saturating_sub(1)));
        match self.drive() {
            Drive::Off => {
                timers.set_pulse_width(0);
                timers.set_phase_delay(0);
            }
            Drive::Full => {
                timers.set_pulse_width(PULSE_CONTINUOUS);
                timers.set_phase_delay(0);
            }
            Drive::Phased { phase, .. } => {
                timers.set_pulse_width(TRIAC_PULSE_US);
                timers.set_phase_delay(phase_delay(sample, phase, self.table.shift()));
            }
        }
        self.zero_cross.signal(sample);
    }

    /// Diagnostic: the next zero-cross capture, or `NoSignal` if none
    /// arrives within `window` (e.g. mains absent).
    pub async fn read(&self, window: Duration) -> Result<CaptureSample, DimmerError> {
        self.zero_cross.reset();
        with_timeout(window, self.zero_cross.wait())
            .await
            .map_err(|_| DimmerError::NoSignal)
    }
}

/// The fan dimmer.  Percent resolution matches the configured PID limits.
pub static DIMMER: DimmerState = DimmerState::new(&PhaseTable::PERCENT);
