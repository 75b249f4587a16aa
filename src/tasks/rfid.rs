//! RFID listener task.
//!
//! Polls the reader every pass.  On a new tag: remember it, point the
//! broker will at it, announce the scan and open the latch.  The status LED
//! shows whether a tag is currently in the field.

use core::cell::RefCell;

use embedded_hal::digital::{OutputPin, PinState};
use log::{info, warn};

use crate::app::messages::{Message, Status};
use crate::app::ports::{DoorLatch, MessageBus, RfidReader};
use crate::app::session::Session;
use crate::config::Topics;
use crate::scheduler::{Schedule, TaskCallback};
use crate::timing::Micros;

use super::{publish, set_disconnect_will};

pub struct RfidListener<'a, R, L, B, D> {
    reader: R,
    led: L,
    bus: &'a RefCell<B>,
    latch: &'a RefCell<D>,
    session: &'a Session,
    topics: &'a Topics,
}

impl<'a, R, L, B, D> RfidListener<'a, R, L, B, D>
where
    R: RfidReader,
    L: OutputPin,
    B: MessageBus,
    D: DoorLatch,
{
    pub fn new(
        reader: R,
        led: L,
        bus: &'a RefCell<B>,
        latch: &'a RefCell<D>,
        session: &'a Session,
        topics: &'a Topics,
    ) -> Self {
        Self {
            reader,
            led,
            bus,
            latch,
            session,
            topics,
        }
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    fn on_new_tag(&mut self, tag: u32) {
        let id = self.session.set_latest_tag(tag);
        info!("RFID: tag {} scanned", id);
        {
            let mut bus = self.bus.borrow_mut();
            if let Err(e) = set_disconnect_will(&mut *bus, self.topics, &id) {
                warn!("RFID: will update failed: {}", e);
            }
            publish(&mut *bus, &self.topics.stream, &Message::new(Status::Scan, "", &id));
        }
        if let Err(e) = self.latch.borrow_mut().set_open(true) {
            warn!("RFID: latch open failed: {}", e);
        }
    }
}

impl<R, L, B, D> TaskCallback for RfidListener<'_, R, L, B, D>
where
    R: RfidReader,
    L: OutputPin,
    B: MessageBus,
    D: DoorLatch,
{
    fn run(&mut self, _schedule: &Schedule, now_us: Micros) {
        if let Some(tag) = self.reader.poll_new_tag(now_us) {
            self.on_new_tag(tag);
        }
        let present = self.reader.current_tag(now_us).is_some();
        if self.led.set_state(PinState::from(present)).is_err() {
            warn!("RFID: status LED write failed");
        }
    }
}
