//! ESP32 time adapter.
//!
//! Provides the scheduler's microsecond [`Clock`].
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer, truncated to 32 bits.  Safe to call from
//!   the GPIO ISR.
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.

use crate::app::ports::Clock;
use crate::timing::Micros;

/// Free-running microsecond clock.  Wraps every ~71.6 minutes.
pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Seconds since boot, not truncated.
    #[cfg(target_os = "espidf")]
    pub fn uptime_secs(&self) -> u64 {
        // SAFETY: reads the esp_timer counter; no preconditions.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000_000
    }

    /// Seconds since boot, not truncated.
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

impl Clock for SystemClock {
    #[cfg(target_os = "espidf")]
    fn now_us(&self) -> Micros {
        // SAFETY: reads the esp_timer counter; ISR-safe.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u32
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_us(&self) -> Micros {
        self.start.elapsed().as_micros() as u32
    }
}
