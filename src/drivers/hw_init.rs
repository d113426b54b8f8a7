//! One-shot GPIO and timer-peripheral setup.
//!
//! Configures the output pins, the open-drain sensor line, and hands out
//! MCPWM capture channels and one-shot gptimers to the drivers that own
//! them.  Called from `main()` before the tasks start.  On non-espidf
//! targets every function is a logging no-op.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    CaptureInitFailed(i32),
    TimerInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::CaptureInitFailed(rc) => write!(f, "MCPWM capture init failed (rc={})", rc),
            Self::TimerInitFailed(rc) => write!(f, "gptimer init failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
fn check(ret: esp_err_t, err: fn(i32) -> HwInitError) -> Result<(), HwInitError> {
    if ret == ESP_OK as esp_err_t { Ok(()) } else { Err(err(ret)) }
}

// ── GPIO ─────────────────────────────────────────────────────

/// Relay, heartbeat LEDs and triac gate as push-pull outputs, all low.
#[cfg(target_os = "espidf")]
pub fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [
        pins::LIGHT_RELAY_GPIO,
        pins::LED0_GPIO,
        pins::LED1_GPIO,
        pins::TRIAC_GATE_GPIO,
    ];

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        // SAFETY: called once from main() before any task uses these pins.
        check(unsafe { gpio_config(&cfg) }, HwInitError::GpioConfigFailed)?;
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_gpio_outputs() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): GPIO outputs skipped");
    Ok(())
}

/// Sensor data line: open-drain with pull-up, released (high).
#[cfg(target_os = "espidf")]
pub fn init_sensor_pin() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::AM2302_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT_OUTPUT_OD,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: one-shot configuration of a pin owned by the sensor driver.
    check(unsafe { gpio_config(&cfg) }, HwInitError::GpioConfigFailed)?;
    unsafe { gpio_set_level(pins::AM2302_GPIO, 1) };
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_sensor_pin() -> Result<(), HwInitError> {
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level is a register write on a configured output
    // and is IRAM-safe, so the dimmer ISR may call it too.
    unsafe { gpio_set_level(pin, u32::from(high)) };
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

/// `embedded-hal` view of one configured output pin.
#[derive(Debug)]
pub struct GpioOutput {
    pin: i32,
    high: bool,
}

impl GpioOutput {
    pub fn new(pin: i32) -> Self {
        Self { pin, high: false }
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }

    pub fn is_set_high(&self) -> bool {
        self.high
    }
}

impl ErrorType for GpioOutput {
    type Error = Infallible;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.pin, false);
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.pin, true);
        self.high = true;
        Ok(())
    }
}

// ── MCPWM capture ─────────────────────────────────────────────

/// Capture timer of one MCPWM group, started.  Returns the handle and its
/// resolution in ticks per microsecond.
#[cfg(target_os = "espidf")]
pub fn new_capture_timer(group: i32) -> Result<(mcpwm_cap_timer_handle_t, u32), HwInitError> {
    let cfg = mcpwm_capture_timer_config_t {
        group_id: group,
        clk_src: soc_periph_mcpwm_capture_clk_src_t_MCPWM_CAPTURE_CLK_SRC_DEFAULT,
        ..Default::default()
    };
    let mut timer: mcpwm_cap_timer_handle_t = core::ptr::null_mut();
    let mut resolution_hz: u32 = 0;
    // SAFETY: out-pointers are valid locals; one-shot init from main().
    unsafe {
        check(mcpwm_new_capture_timer(&cfg, &mut timer), HwInitError::CaptureInitFailed)?;
        check(
            mcpwm_capture_timer_get_resolution(timer, &mut resolution_hz),
            HwInitError::CaptureInitFailed,
        )?;
        check(mcpwm_capture_timer_enable(timer), HwInitError::CaptureInitFailed)?;
        check(mcpwm_capture_timer_start(timer), HwInitError::CaptureInitFailed)?;
    }
    let ticks_per_us = (resolution_hz / 1_000_000).max(1);
    info!("hw_init: MCPWM{} capture timer at {} ticks/us", group, ticks_per_us);
    Ok((timer, ticks_per_us))
}

/// Both-edge capture channel on `gpio`, callback registered, not enabled.
#[cfg(target_os = "espidf")]
pub fn new_capture_channel(
    timer: mcpwm_cap_timer_handle_t,
    gpio: i32,
    pull_up: bool,
    on_edge: mcpwm_capture_event_cb_t,
) -> Result<mcpwm_cap_channel_handle_t, HwInitError> {
    let mut cfg = mcpwm_capture_channel_config_t {
        gpio_num: gpio,
        prescale: 1,
        ..Default::default()
    };
    cfg.flags.set_pos_edge(1);
    cfg.flags.set_neg_edge(1);
    cfg.flags.set_pull_up(u32::from(pull_up));
    cfg.flags.set_keep_io_conf_at_exit(1);

    let callbacks = mcpwm_capture_event_callbacks_t { on_cap: on_edge };
    let mut chan: mcpwm_cap_channel_handle_t = core::ptr::null_mut();
    // SAFETY: config and callback table outlive the calls; the callback is
    // a static fn whose shared state sits behind a critical section.
    unsafe {
        check(mcpwm_new_capture_channel(timer, &cfg, &mut chan), HwInitError::CaptureInitFailed)?;
        check(
            mcpwm_capture_channel_register_event_callbacks(chan, &callbacks, core::ptr::null_mut()),
            HwInitError::CaptureInitFailed,
        )?;
    }
    Ok(chan)
}

// ── gptimer ───────────────────────────────────────────────────

/// 1 MHz up-counting gptimer with an alarm callback, enabled and running
/// with no alarm set.
#[cfg(target_os = "espidf")]
pub fn new_oneshot_timer(on_alarm: gptimer_alarm_cb_t) -> Result<gptimer_handle_t, HwInitError> {
    let cfg = gptimer_config_t {
        clk_src: soc_periph_gptimer_clk_src_t_GPTIMER_CLK_SRC_DEFAULT,
        direction: gptimer_count_direction_t_GPTIMER_COUNT_UP,
        resolution_hz: 1_000_000,
        ..Default::default()
    };
    let callbacks = gptimer_event_callbacks_t { on_alarm };
    let mut timer: gptimer_handle_t = core::ptr::null_mut();
    // SAFETY: as for the capture channel.
    unsafe {
        check(gptimer_new_timer(&cfg, &mut timer), HwInitError::TimerInitFailed)?;
        check(
            gptimer_register_event_callbacks(timer, &callbacks, core::ptr::null_mut()),
            HwInitError::TimerInitFailed,
        )?;
        check(gptimer_enable(timer), HwInitError::TimerInitFailed)?;
        check(gptimer_start(timer), HwInitError::TimerInitFailed)?;
    }
    Ok(timer)
}

/// Restart `timer` from zero with a single alarm `us` microseconds ahead.
/// IRAM-safe.
#[cfg(target_os = "espidf")]
pub fn arm_oneshot(timer: gptimer_handle_t, us: u32) {
    let alarm = gptimer_alarm_config_t {
        alarm_count: u64::from(us.max(1)),
        ..Default::default()
    };
    // SAFETY: handle from new_oneshot_timer(); both calls are ISR-safe.
    unsafe {
        gptimer_set_raw_count(timer, 0);
        gptimer_set_alarm_action(timer, &alarm);
    }
}

/// Move the pending alarm of a running `timer` to absolute count `us`.
#[cfg(target_os = "espidf")]
pub fn rearm_at(timer: gptimer_handle_t, us: u32) {
    let alarm = gptimer_alarm_config_t {
        alarm_count: u64::from(us),
        ..Default::default()
    };
    // SAFETY: as for arm_oneshot.
    unsafe {
        gptimer_set_alarm_action(timer, &alarm);
    }
}

/// Remove the pending alarm.
#[cfg(target_os = "espidf")]
pub fn disarm(timer: gptimer_handle_t) {
    // SAFETY: a null alarm config disables the alarm; ISR-safe.
    unsafe {
        gptimer_set_alarm_action(timer, core::ptr::null());
    }
}
