//! Hardware drivers.
//!
//! Every driver that touches a peripheral pairs a `target_os = "espidf"`
//! implementation with a simulation stub, so the library builds and tests
//! on the host.

pub mod dimmer;
pub mod hw_init;
pub mod hw_timer;
pub mod phase_table;
pub mod phase_timers;
pub mod sensor_line;
pub mod task_pin;
