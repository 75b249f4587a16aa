//! Mock hardware for integration tests.
//!
//! A manually advanced clock, a switch pin the test flips, and recording
//! stand-ins for the bus, the latch, the reader and the slot matrix, so
//! tests can assert on the full call history without real peripherals.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use slotkeeper::app::messages::Status;
use slotkeeper::app::ports::{
    Clock, Connectivity, DigitalInput, DoorLatch, Inbound, Level, MessageBus, RfidReader, SlotMatrix,
};
use slotkeeper::app::slots::SlotSet;
use slotkeeper::error::{CommsError, Error, Result};
use slotkeeper::timing::Micros;

// ── Clock ─────────────────────────────────────────────────────

pub struct ManualClock(AtomicU32);

#[allow(dead_code)]
impl ManualClock {
    pub fn new(start_us: Micros) -> Self {
        Self(AtomicU32::new(start_us))
    }

    pub fn set(&self, now_us: Micros) {
        self.0.store(now_us, Ordering::Release);
    }

    pub fn advance(&self, us: u32) {
        let now = self.0.load(Ordering::Acquire);
        self.set(now.wrapping_add(us));
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> Micros {
        self.0.load(Ordering::Acquire)
    }
}

// ── Door switch ───────────────────────────────────────────────

/// Active-low switch: idles high, reads low while pressed.
pub struct SwitchPin(AtomicBool);

#[allow(dead_code)]
impl SwitchPin {
    pub fn released() -> Self {
        Self(AtomicBool::new(true))
    }

    pub fn pressed() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn set(&self, level: Level) {
        self.0.store(level == Level::High, Ordering::Release);
    }
}

impl DigitalInput for SwitchPin {
    fn level(&self) -> Level {
        Level::from_high(self.0.load(Ordering::Acquire))
    }
}

// ── Message bus ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub json: serde_json::Value,
}

#[derive(Default)]
pub struct RecordingBus {
    pub connected: bool,
    pub refuse_connect: bool,
    pub published: Vec<Published>,
    pub will: Option<Published>,
    pub inbound: VecDeque<Inbound>,
    pub connects: u32,
}

#[allow(dead_code)]
impl RecordingBus {
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    pub fn push_inbound(&mut self, topic: &str, payload: &str) {
        self.inbound.push_back(Inbound {
            topic: topic.into(),
            payload: payload.as_bytes().to_vec(),
        });
    }

    pub fn statuses(&self) -> Vec<u64> {
        self.published
            .iter()
            .filter_map(|p| p.json["status"].as_u64())
            .collect()
    }

    pub fn last(&self) -> Option<&Published> {
        self.published.last()
    }
}

fn record(topic: &str, payload: &[u8]) -> Result<Published> {
    Ok(Published {
        topic: topic.into(),
        json: serde_json::from_slice(payload).map_err(|_| Error::Encode)?,
    })
}

impl MessageBus for RecordingBus {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(CommsError::LinkDown.into());
        }
        self.published.push(record(topic, payload)?);
        Ok(())
    }

    fn set_will(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        self.will = Some(record(topic, payload)?);
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<Inbound>> {
        if !self.connected {
            return Err(CommsError::LinkDown.into());
        }
        Ok(self.inbound.pop_front())
    }
}

impl Connectivity for RecordingBus {
    fn name(&self) -> &'static str {
        "mock-broker"
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> Result<()> {
        self.connects += 1;
        if self.refuse_connect {
            return Err(CommsError::ConnectFailed.into());
        }
        self.connected = true;
        Ok(())
    }
}

// ── Latch ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockLatch {
    pub open: bool,
    pub history: Vec<bool>,
}

impl DoorLatch for MockLatch {
    fn set_open(&mut self, open: bool) -> Result<()> {
        self.open = open;
        self.history.push(open);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

// ── RFID reader ───────────────────────────────────────────────

#[derive(Default)]
pub struct MockReader {
    pub arriving: VecDeque<u32>,
    pub in_field: Option<u32>,
}

impl RfidReader for MockReader {
    fn poll_new_tag(&mut self, _now_us: Micros) -> Option<u32> {
        let tag = self.arriving.pop_front()?;
        self.in_field = Some(tag);
        Some(tag)
    }

    fn current_tag(&self, _now_us: Micros) -> Option<u32> {
        self.in_field
    }
}

// ── Status LED ────────────────────────────────────────────────

#[derive(Default)]
pub struct MockLed {
    pub lit: bool,
}

impl embedded_hal::digital::ErrorType for MockLed {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for MockLed {
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        self.lit = false;
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        self.lit = true;
        Ok(())
    }
}

// ── Slot matrix ───────────────────────────────────────────────

#[derive(Default)]
pub struct MockMatrix {
    pub occupied: SlotSet,
    pub selected: Option<usize>,
    pub fail_row: Option<usize>,
}

impl SlotMatrix for MockMatrix {
    fn select_row(&mut self, row: usize, selected: bool) -> Result<()> {
        if selected {
            if self.fail_row == Some(row) {
                return Err(Error::Gpio(-1));
            }
            self.selected = Some(row);
        } else if self.selected == Some(row) {
            self.selected = None;
        }
        Ok(())
    }

    fn column_closed(&mut self, col: usize) -> Result<bool> {
        let row = self.selected.ok_or(Error::Gpio(-1))?;
        Ok(self.occupied.contains(row, col))
    }
}

#[allow(dead_code)]
pub fn status_code(status: Status) -> u64 {
    u64::from(status.code())
}
