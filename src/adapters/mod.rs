//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                 |
//! |----------------|--------------------|-----------------------------|
//! | `hardware`     | SensorPort         | AM2302 link (decode task)   |
//! |                | FanPort            | Phase-control dimmer        |
//! |                | LightPort          | Relay + heartbeat GPIO      |
//! | `log_sink`     | EventSink          | Serial log output           |
//! | `nvs`          | ConfigPort         | NVS / in-memory store       |
//! | `time`         | ClockPort          | ESP32 system timer + libc   |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
