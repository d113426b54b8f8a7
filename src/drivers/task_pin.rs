//! Core-pinned task spawning for ESP32-S3 dual-core.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::spawn` creates a
//! FreeRTOS task pinned to a specific CPU core with explicit priority
//! and stack size. On non-ESP targets, falls back to plain thread spawn.
//!
//! [`spawn_executor`] goes one step further: the new thread runs an
//! `edge_executor::LocalExecutor` with one root future, which is how the
//! decode and control tasks run.  On target the executor is parked with
//! `esp_idf_hal::task::block_on`, whose FreeRTOS task notification can be
//! raised from the capture interrupts; the host uses
//! `futures_lite::future::block_on`.
//!
//! `esp_pthread_set_cfg()` applies to the *next* `pthread_create()` from
//! the calling thread, so config→spawn pairs must not interleave.

use std::future::Future;
use std::io;
use std::thread::JoinHandle;

use edge_executor::LocalExecutor;

/// CPU core identifiers for the ESP32-S3 Xtensa LX7 dual-core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): console and housekeeping.
    Pro = 0,
    /// Core 1 (APP_CPU): sensor decode and control loop.
    App = 1,
}

/// Thread placement and sizing.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
    /// Null-terminated (e.g. `"decode\0"`).
    pub name: &'static str,
}

impl TaskSpec {
    fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

/// Spawn a thread pinned to a core with explicit priority and stack.
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(spec: TaskSpec, f: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
    // SAFETY: the config struct is a valid local; the name is 'static.
    unsafe {
        let mut cfg = esp_idf_svc::sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = i32::from(spec.priority);
        cfg.stack_size = (spec.stack_kb * 1024) as _;
        cfg.thread_name = spec.name.as_ptr().cast();
        let ret = esp_idf_svc::sys::esp_pthread_set_cfg(&cfg);
        if ret != esp_idf_svc::sys::ESP_OK as i32 {
            return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
        }
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
}

/// Simulation fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(spec: TaskSpec, f: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
    log::info!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        spec.display_name(),
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
}

/// Spawn a pinned thread that runs `make_task()` to completion on a
/// thread-local executor.  The future is built on the new thread, so it
/// need not be `Send`.
pub fn spawn_executor<F, Fut>(spec: TaskSpec, make_task: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + 'static,
{
    spawn_on_core(spec, move || {
        let executor: LocalExecutor = LocalExecutor::new();
        #[cfg(target_os = "espidf")]
        esp_idf_hal::task::block_on(executor.run(make_task()));
        #[cfg(not(target_os = "espidf"))]
        futures_lite::future::block_on(executor.run(make_task()));
    })
}
