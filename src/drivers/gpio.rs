//! Raw GPIO input and edge-interrupt registration.
//!
//! [`GpioInput`] is the [`DigitalInput`] the door debouncer reads.  It goes
//! straight to the ESP-IDF register accessors rather than through a
//! `PinDriver`, because the same value is read from the GPIO ISR.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::app::ports::{DigitalInput, Level, Pull};
use crate::drivers::debouncer::DebounceInput;
use crate::error::{Error, Result};

/// `ESP_OK`: every GPIO driver call returns it on success.
const ESP_OK_RC: i32 = 0;

/// Map an ESP-IDF GPIO return code to a [`Result`].
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn esp_check(ret: i32) -> Result<()> {
    if ret == ESP_OK_RC {
        Ok(())
    } else {
        Err(Error::Gpio(ret))
    }
}

/// One GPIO configured as input.
#[derive(Debug)]
pub struct GpioInput {
    pin: i32,
    #[cfg(not(target_os = "espidf"))]
    sim_level: core::sync::atomic::AtomicBool,
}

impl GpioInput {
    pub const fn new(pin: i32) -> Self {
        Self {
            pin,
            #[cfg(not(target_os = "espidf"))]
            sim_level: core::sync::atomic::AtomicBool::new(true),
        }
    }

    pub const fn pin(&self) -> i32 {
        self.pin
    }

    /// Drive the simulated pin level (host builds only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set(&self, level: Level) {
        self.sim_level
            .store(level == Level::High, core::sync::atomic::Ordering::Release);
    }
}

impl DigitalInput for GpioInput {
    #[cfg(target_os = "espidf")]
    fn configure(&self, pull: Pull) -> Result<()> {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << self.pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: match pull {
                Pull::Up => gpio_pullup_t_GPIO_PULLUP_ENABLE,
                Pull::Floating => gpio_pullup_t_GPIO_PULLUP_DISABLE,
            },
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
        };
        // SAFETY: called once during setup before the pin's ISR is added.
        esp_check(unsafe { gpio_config(&cfg) })?;
        info!("gpio: GPIO{} input ({:?})", self.pin, pull);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn configure(&self, pull: Pull) -> Result<()> {
        log::info!("gpio(sim): GPIO{} input ({:?})", self.pin, pull);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn level(&self) -> Level {
        // SAFETY: read-only register access on a configured input; ISR-safe.
        Level::from_high(unsafe { gpio_get_level(self.pin) } != 0)
    }

    #[cfg(not(target_os = "espidf"))]
    fn level(&self) -> Level {
        Level::from_high(self.sim_level.load(core::sync::atomic::Ordering::Acquire))
    }
}

// ── Edge ISR ──────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn door_edge_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static DebounceInput` registered below.
    let input = unsafe { &*(arg as *const DebounceInput<GpioInput>) };
    // SAFETY: esp_timer_get_time is a counter read; safe in ISR context.
    let now_us = unsafe { esp_timer_get_time() } as u32;
    input.on_edge_interrupt(now_us);
}

/// Route any-edge interrupts on the input's pin to
/// [`DebounceInput::on_edge_interrupt`].
///
/// The input must already be initialized.
#[cfg(target_os = "espidf")]
pub fn attach_edge_isr(input: &'static DebounceInput<GpioInput>) -> Result<()> {
    let pin = input.input().pin();
    // SAFETY: ESP_ERR_INVALID_STATE means the service is already installed.
    // The handler argument outlives the registration ('static).
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(Error::Init("GPIO ISR service install failed"));
        }
        esp_check(gpio_set_intr_type(pin, gpio_int_type_t_GPIO_INTR_ANYEDGE))?;
        esp_check(gpio_isr_handler_add(
            pin,
            Some(door_edge_isr),
            core::ptr::from_ref(input).cast_mut().cast(),
        ))?;
        esp_check(gpio_intr_enable(pin))?;
    }
    info!("gpio: edge ISR attached to GPIO{}", pin);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn attach_edge_isr(input: &'static DebounceInput<GpioInput>) -> Result<()> {
    log::info!("gpio(sim): edge ISR for GPIO{} skipped", input.input().pin());
    Ok(())
}
