//! Port traits: the boundary between controller logic and the outside world.
//!
//! ```text
//!   Adapter / driver ──▶ Port trait ──▶ Scheduler tasks
//! ```
//!
//! Drivers (GPIO, RDM6300, servo) and adapters (clock, WiFi, message bus)
//! implement these traits.  Tasks consume them via generics, so the
//! scheduling and debounce logic never touches hardware directly and runs
//! unchanged against the mocks in `tests/`.

use crate::error::Result;
use crate::timing::Micros;

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// Monotonic microsecond clock.  Wraps at `u32::MAX`.
///
/// Must be callable from interrupt context.
pub trait Clock {
    fn now_us(&self) -> Micros;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_us(&self) -> Micros {
        (**self).now_us()
    }
}

// ───────────────────────────────────────────────────────────────
// Digital input
// ───────────────────────────────────────────────────────────────

/// Logic level on a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// The other level.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }

    pub const fn from_high(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

/// Input bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    /// Internal pull-up enabled.
    Up,
    /// No internal bias; the board provides one.
    Floating,
}

/// Read side of a single GPIO.
///
/// `level` is called from both the main loop and the edge interrupt, so
/// implementations must be plain register reads: no locks, no logging.
pub trait DigitalInput {
    /// Apply the input bias.  Called once during setup.
    fn configure(&self, _pull: Pull) -> Result<()> {
        Ok(())
    }

    fn level(&self) -> Level;
}

// ───────────────────────────────────────────────────────────────
// Cabinet peripherals
// ───────────────────────────────────────────────────────────────

/// RFID reader (RDM6300 on the production board).
pub trait RfidReader {
    /// Drain pending input.  Returns a tag id when a tag newly appears.
    fn poll_new_tag(&mut self, now_us: Micros) -> Option<u32>;

    /// Tag currently in the field, if any.
    fn current_tag(&self, now_us: Micros) -> Option<u32>;
}

/// Row/column slot switch matrix.
pub trait SlotMatrix {
    /// Drive `row` to its active (low) level, or release it.
    fn select_row(&mut self, row: usize, selected: bool) -> Result<()>;

    /// True if the switch at (`selected row`, `col`) is closed.
    fn column_closed(&mut self, col: usize) -> Result<bool>;
}

/// Door latch actuator.
pub trait DoorLatch {
    fn set_open(&mut self, open: bool) -> Result<()>;

    fn is_open(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Network links
// ───────────────────────────────────────────────────────────────

/// A link that can drop and be re-established (WiFi, broker session).
pub trait Connectivity {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn is_connected(&self) -> bool;

    /// One connection attempt.  Must not loop or sleep.
    fn connect(&mut self) -> Result<()>;
}

/// Publish/subscribe message bus (MQTT broker session on hardware).
pub trait MessageBus {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()>;

    /// Replace the retained last-will message the broker sends on our
    /// behalf if the session drops.
    fn set_will(&mut self, topic: &str, payload: &[u8]) -> Result<()>;

    /// Service the session.  Returns the payload of one inbound message
    /// on a subscribed topic, if any arrived.
    fn poll(&mut self) -> Result<Option<Inbound>>;
}

/// An inbound bus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub topic: String,
    pub payload: Vec<u8>,
}
