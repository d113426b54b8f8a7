//! GrowBox Firmware: Main Entry Point
//!
//! Hexagonal architecture: two async tasks on APP_CPU and an event loop on
//! the main thread.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SensorHardware  FanHardware  LightHardware  LogEventSink      │
//! │  (SensorPort)    (FanPort)    (LightPort)    (EventSink)       │
//! │  NvsAdapter      Esp32TimeAdapter                              │
//! │  (ConfigPort)    (ClockPort)                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  ClimateController (control task) · LightController    │    │
//! │  │  PID · SharedConfig · StatusCell · Console             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  decode task: SENSOR_LINK.serve(AM2302 line)                   │
//! │  main loop:   daytime tick · telemetry tick · console lines    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;
use std::sync::mpsc;

use anyhow::Result;
use embassy_time::Duration;
use futures_lite::future::block_on;
use log::{error, info, warn};

use growbox::adapters::hardware::{FanHardware, LightHardware, SensorHardware};
use growbox::adapters::log_sink::LogEventSink;
use growbox::adapters::nvs::NvsAdapter;
use growbox::adapters::time::Esp32TimeAdapter;
use growbox::app::console::Console;
use growbox::app::events::AppEvent;
use growbox::app::ports::{ClockPort, ConfigPort, EventSink};
use growbox::app::service::{ClimateController, LightController};
use growbox::app::shared::{SENSOR_STATUS, SharedConfig};
use growbox::config::SystemConfig;
use growbox::drivers::dimmer::DIMMER;
use growbox::drivers::hw_init::{self, GpioOutput};
use growbox::drivers::task_pin::{Core, TaskSpec, spawn_executor, spawn_on_core};
use growbox::drivers::{hw_timer, phase_timers};
use growbox::events::{self, Event, push_event};
use growbox::pins;
use growbox::sensors::SENSOR_LINK;

// ── Task layout ───────────────────────────────────────────────

/// Sensor decode: must preempt the control loop while a frame is in flight.
const DECODE_TASK: TaskSpec = TaskSpec { core: Core::App, priority: 10, stack_kb: 8, name: "decode\0" };
const CONTROL_TASK: TaskSpec = TaskSpec { core: Core::App, priority: 8, stack_kb: 12, name: "control\0" };
const CONSOLE_TASK: TaskSpec = TaskSpec { core: Core::Pro, priority: 3, stack_kb: 6, name: "console\0" };

/// Main-loop sleep while the event queue is empty.
const IDLE_SLEEP: std::time::Duration = std::time::Duration::from_millis(10);
/// Config wait for the once-a-second light tick.
const TICK_CONFIG_WAIT: Duration = Duration::from_millis(50);

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }

    info!("╔══════════════════════════════════════╗");
    info!("║  GrowBox v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init failed: {e}"))?;
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };
    let shared: &'static SharedConfig = Box::leak(Box::new(SharedConfig::new(config.clone())));

    // ── 3. Peripherals (failures degrade, never halt) ─────────
    if let Err(e) = hw_init::init_gpio_outputs() {
        error!("GPIO init failed: {}; light relay and LEDs disabled", e);
    }
    if let Err(e) = phase_timers::init_zero_cross() {
        error!("zero-cross init failed: {}; fan stays off", e);
    }

    // ── 4. Tasks ──────────────────────────────────────────────
    spawn_executor(DECODE_TASK, || async {
        #[cfg(target_os = "espidf")]
        let line = growbox::drivers::sensor_line::Am2302Line::new();
        #[cfg(not(target_os = "espidf"))]
        let line = Ok::<_, hw_init::HwInitError>(growbox::drivers::sensor_line::SimSensorLine::new(Some(
            growbox::sensors::am2302::Reading { temperature: 235, humidity: 620 },
        )));
        match line {
            Ok(mut line) => SENSOR_LINK.serve(&mut line).await,
            Err(e) => error!("sensor line init failed: {}; reads will time out", e),
        }
    })?;

    let initial = config.clone();
    spawn_executor(CONTROL_TASK, move || async move {
        let mut sensor = SensorHardware::new(&SENSOR_LINK);
        let mut fan = FanHardware::new(&DIMMER);
        let clock = Esp32TimeAdapter::new();
        let mut sink = LogEventSink::new();
        let mut controller = ClimateController::new(shared, &SENSOR_STATUS, &initial);
        controller.run(&mut sensor, &mut fan, &clock, &mut sink).await
    })?;

    let (line_tx, line_rx) = mpsc::channel::<String>();
    spawn_on_core(CONSOLE_TASK, move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
            push_event(Event::CommandReceived);
        }
        warn!("console: input closed");
    })?;

    // ── 5. Main-loop adapters ─────────────────────────────────
    let mut lights = LightHardware::new(
        GpioOutput::new(pins::LIGHT_RELAY_GPIO),
        [GpioOutput::new(pins::LED0_GPIO), GpioOutput::new(pins::LED1_GPIO)],
    );
    let mut light_ctl = LightController::new();
    let mut sink = LogEventSink::new();
    let mut console = Console::new(shared, &SENSOR_STATUS, FanHardware::new(&DIMMER), Esp32TimeAdapter::new(), nvs);

    let mut telemetry_secs = config.telemetry_interval_secs;
    let mut daytime = true;
    hw_timer::start_timers(telemetry_secs);

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        if events::queue_is_empty() {
            std::thread::sleep(IDLE_SLEEP);
            continue;
        }

        events::drain_events(|event| match event {
            Event::DaytimeTick => {
                let cfg = block_on(shared.snapshot(TICK_CONFIG_WAIT));
                let now = console.clock().time_of_day();
                light_ctl.tick(cfg.as_ref().map(|c| &c.light), now, &mut lights, &mut sink);
                if let Some(on) = cfg.as_ref().and_then(|c| c.light.is_on(now)) {
                    daytime = on;
                }
                let secs = cfg.map_or(telemetry_secs, |c| c.telemetry_interval_secs);
                if secs != telemetry_secs {
                    telemetry_secs = secs;
                    hw_timer::set_telemetry_interval(secs);
                }
            }

            Event::TelemetryTick => {
                let t = light_ctl.telemetry(&SENSOR_STATUS, console.fan(), daytime);
                sink.emit(&AppEvent::Telemetry(t));
            }

            Event::CommandReceived => {
                let Ok(line) = line_rx.try_recv() else { return };
                let mut out = String::new();
                if block_on(console.handle_line(&line, &mut out)).is_err() {
                    warn!("console: output formatting failed");
                }
                print!("{}", out);
            }
        });
    }
}
