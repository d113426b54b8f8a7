//! GPIO / peripheral assignments for the GrowBox controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// AM2302 humidity / temperature sensor
// ---------------------------------------------------------------------------

/// Single-wire data line, open-drain with a 4.7 kΩ external pull-up.
/// Driven low by the start pulse, captured on both edges afterwards.
pub const AM2302_GPIO: i32 = 4;
/// MCPWM group whose capture timer timestamps the sensor edges.
pub const AM2302_MCPWM_GROUP: i32 = 0;

// ---------------------------------------------------------------------------
// Fan dimmer (optocoupled zero-cross detector + triac)
// ---------------------------------------------------------------------------

/// Zero-cross detector output.  HIGH while the mains voltage is near zero.
pub const ZERO_CROSS_GPIO: i32 = 5;
/// MCPWM group for the zero-cross capture.
pub const ZERO_CROSS_MCPWM_GROUP: i32 = 1;
/// Triac gate driver (MOC3021 LED), active HIGH.
pub const TRIAC_GATE_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// Grow light and heartbeat
// ---------------------------------------------------------------------------

/// Grow-light relay coil driver, active HIGH.
pub const LIGHT_RELAY_GPIO: i32 = 7;

pub const LED0_GPIO: i32 = 15;
pub const LED1_GPIO: i32 = 16;
