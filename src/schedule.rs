//! Time-of-day and the grow-light schedule.
//!
//! The light is either forced off, forced on, or follows a daily window.
//! A window whose start is not before its end wraps around midnight
//! (e.g. 18:00:00 → 06:00:00); equal bounds therefore mean "always on".
//!
//! The same window selects the day or night setpoint of the climate loop.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════
//  Time of day
// ═══════════════════════════════════════════════════════════════

/// Wall-clock time within one day.  Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
    second: u8,
}

impl TimeOfDay {
    pub const fn new(hour: u8, minute: u8, second: u8) -> Option<Self> {
        if hour > 23 || minute > 59 || second > 59 {
            return None;
        }
        Some(Self { hour, minute, second })
    }

    /// Seconds since midnight, taken modulo one day.
    pub const fn from_seconds(secs: u32) -> Self {
        let s = secs % 86_400;
        Self {
            hour: (s / 3600) as u8,
            minute: ((s / 60) % 60) as u8,
            second: (s % 60) as u8,
        }
    }

    pub const fn seconds(&self) -> u32 {
        self.hour as u32 * 3600 + self.minute as u32 * 60 + self.second as u32
    }

    pub const fn hour(&self) -> u8 {
        self.hour
    }

    pub const fn minute(&self) -> u8 {
        self.minute
    }

    pub const fn second(&self) -> u8 {
        self.second
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseTimeError;

impl fmt::Display for ParseTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected hh[:mm[:ss]]")
    }
}

/// `hh[:mm[:ss]]`; omitted fields are zero.
impl FromStr for TimeOfDay {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = [0u8; 3];
        let mut parts = s.trim().split(':');
        for (i, slot) in fields.iter_mut().enumerate() {
            match parts.next() {
                Some(p) => *slot = p.parse().map_err(|_| ParseTimeError)?,
                None if i > 0 => break,
                None => return Err(ParseTimeError),
            }
        }
        if parts.next().is_some() {
            return Err(ParseTimeError);
        }
        Self::new(fields[0], fields[1], fields[2]).ok_or(ParseTimeError)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Light schedule
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightMode {
    Off,
    On,
    /// Follow the `start..end` daily window.
    Daytime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightSchedule {
    pub mode: LightMode,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl Default for LightSchedule {
    fn default() -> Self {
        Self {
            mode: LightMode::Off,
            start: TimeOfDay { hour: 6, minute: 0, second: 0 },
            end: TimeOfDay { hour: 22, minute: 0, second: 0 },
        }
    }
}

impl LightSchedule {
    /// Whether `now` falls inside the daily window, regardless of mode.
    pub fn in_window(&self, now: TimeOfDay) -> bool {
        if self.start < self.end {
            now >= self.start && now < self.end
        } else {
            // Wraps midnight, e.g. 18:00 → 06:00.
            now >= self.start || now < self.end
        }
    }

    /// Desired light state.  `None` when the mode needs the wall clock and
    /// it is not set yet.
    pub fn is_on(&self, now: Option<TimeOfDay>) -> Option<bool> {
        match self.mode {
            LightMode::Off => Some(false),
            LightMode::On => Some(true),
            LightMode::Daytime => now.map(|t| self.in_window(t)),
        }
    }
}
