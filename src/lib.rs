//! GrowBox firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

#[cfg(all(target_os = "espidf", not(feature = "espidf")))]
compile_error!("building for ESP-IDF requires `--features espidf`");

pub mod app;
pub mod config;
pub mod events;
pub mod fixed;
pub mod params;
pub mod schedule;

pub mod error;
pub mod pins;

// Hardware-facing modules; the real implementations are guarded by cfg
// attributes inside and fall back to simulation on the host.
pub mod adapters;
pub mod control;
pub mod drivers;
pub mod sensors;

mod esp_link_shims;
