//! Inbound console commands.
//!
//! One line on the serial console parses into one [`AppCommand`], which
//! the [`Console`](super::console::Console) executes.

use heapless::String;

use crate::schedule::TimeOfDay;

/// Longest accepted parameter name or value.
pub const ARG_LEN: usize = 32;

pub type Arg = String<ARG_LEN>;

/// Light override requested from the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightCommand {
    /// Show the current schedule.
    Show,
    Off,
    On,
    /// Follow the stored daily window.
    Auto,
    /// Follow a new daily window.
    Window { start: TimeOfDay, end: TimeOfDay },
}

/// Commands the serial console can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Print the last sensor reading.
    Temp,

    /// Print the wall clock, or set it.
    Date(Option<TimeOfDay>),

    Light(LightCommand),

    /// Print one parameter, or all of them.
    Get(Option<Arg>),

    Set { name: Arg, value: Arg },

    /// Force the dimmer to a level (switches to manual mode).
    Dim(u16),

    /// Measure the mains zero-cross signal.
    ZeroCross,

    /// Persist the current configuration.
    Save,

    Help,
}
