//! Inbound message pump.
//!
//! Services the bus session and dispatches at most one inbound message per
//! pass.  Only the server's topics are acted on; anything else (including
//! echoes of our own stream) is dropped.

use core::cell::RefCell;

use log::{debug, info, warn};

use crate::app::messages::{ServerMessage, Status};
use crate::app::ports::{DoorLatch, Inbound, MessageBus};
use crate::app::session::Session;
use crate::config::Topics;
use crate::scheduler::{Schedule, TaskCallback};
use crate::timing::Micros;

pub struct BusPump<'a, B, D> {
    bus: &'a RefCell<B>,
    latch: &'a RefCell<D>,
    session: &'a Session,
    topics: &'a Topics,
}

impl<'a, B: MessageBus, D: DoorLatch> BusPump<'a, B, D> {
    pub fn new(bus: &'a RefCell<B>, latch: &'a RefCell<D>, session: &'a Session, topics: &'a Topics) -> Self {
        Self {
            bus,
            latch,
            session,
            topics,
        }
    }

    fn dispatch(&self, inbound: &Inbound) {
        if inbound.topic != self.topics.server_stream.as_str()
            && inbound.topic != self.topics.server_will.as_str()
        {
            debug!("bus: ignoring message on {}", inbound.topic);
            return;
        }
        let msg = match ServerMessage::decode(&inbound.payload) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("bus: undecodable message on {}: {}", inbound.topic, e);
                return;
            }
        };
        info!("bus: <- {} ({})", inbound.topic, msg.status.as_str());
        match msg.status {
            Status::Open => {
                if let Err(e) = self.latch.borrow_mut().set_open(true) {
                    warn!("bus: latch open failed: {}", e);
                }
            }
            Status::ErrorOccur => self.session.set_server_error(true),
            Status::ErrorResolve => self.session.set_server_error(false),
            Status::Connect => self.session.set_server_connected(true),
            Status::Disconnect => self.session.set_server_connected(false),
            Status::Place | Status::Take | Status::Scan => {}
        }
    }
}

impl<B: MessageBus, D: DoorLatch> TaskCallback for BusPump<'_, B, D> {
    fn run(&mut self, _schedule: &Schedule, _now_us: Micros) {
        let polled = self.bus.borrow_mut().poll();
        match polled {
            Ok(Some(inbound)) => self.dispatch(&inbound),
            Ok(None) => {}
            Err(e) => debug!("bus: poll failed: {}", e),
        }
    }
}
