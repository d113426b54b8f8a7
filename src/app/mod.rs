//! Application core: domain logic behind port traits.
//!
//! This module contains the business rules of the GrowBox controller:
//! the climate loop, the light schedule and the serial console.  All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer testable without real peripherals.

pub mod commands;
pub mod console;
pub mod events;
pub mod ports;
pub mod service;
pub mod shared;
