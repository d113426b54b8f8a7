//! Error types shared by the sensor link and the dimmer.
//!
//! Both are `Copy` so they can cross the decode-task reply signal without
//! allocation.  Application-level failures live next to their owners
//! ([`ConfigError`](crate::app::ports::ConfigError),
//! [`CommandError`](crate::app::console::CommandError)).

use core::fmt;

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

/// Failure kinds of one single-wire sensor exchange.  None is fatal: the
/// poller counts them and keeps the previous good reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// No edge arrived within the per-bit wait (sensor not responding).
    IrqTimeout,
    /// The capture interrupt observed line silence (zero-period sample).
    Timeout,
    /// The caller's overall deadline expired.
    RcvTimeout,
    /// A pulse fell outside every tolerance window (electrical noise).
    DecodeError,
    /// Well-timed packet with a bad checksum byte.
    ChecksumError,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IrqTimeout => write!(f, "no edge within bit deadline"),
            Self::Timeout => write!(f, "line silent"),
            Self::RcvTimeout => write!(f, "read deadline exceeded"),
            Self::DecodeError => write!(f, "pulse outside timing windows"),
            Self::ChecksumError => write!(f, "checksum mismatch"),
        }
    }
}

// ---------------------------------------------------------------------------
// Dimmer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimmerError {
    /// No zero crossing seen within the diagnostic window (AC absent).
    NoSignal,
}

impl fmt::Display for DimmerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSignal => write!(f, "no zero-cross signal"),
        }
    }
}
