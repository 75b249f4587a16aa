//! Log-based message bus adapter.
//!
//! Implements [`MessageBus`] and [`Connectivity`] by writing every
//! published payload to the logger.  Stands in for
//! [`mqtt`](super::mqtt) on host builds; inbound traffic is injected with
//! [`LogBus::inject`].

use std::collections::VecDeque;

use log::{info, warn};

use crate::app::ports::{Connectivity, Inbound, MessageBus};
use crate::config::{Topic, Topics, bounded};
use crate::error::{CommsError, Result};

/// Bounded so a stalled pump cannot grow memory without limit.
pub const INBOUND_CAPACITY: usize = 16;

pub struct LogBus {
    client_id: heapless::String<32>,
    subscriptions: [Topic; 3],
    connected: bool,
    will: Option<(String, Vec<u8>)>,
    inbound: VecDeque<Inbound>,
    published: u32,
}

impl LogBus {
    pub fn new(client_id: &heapless::String<32>, topics: &Topics) -> Self {
        Self {
            client_id: client_id.clone(),
            subscriptions: topics.subscriptions().map(bounded),
            connected: false,
            will: None,
            inbound: VecDeque::new(),
            published: 0,
        }
    }

    /// Queue a message as if the broker had delivered it.  Drops the oldest
    /// message when full.
    pub fn inject(&mut self, topic: &str, payload: &[u8]) {
        if self.inbound.len() >= INBOUND_CAPACITY {
            warn!("BUS | inbound queue full, dropping oldest");
            self.inbound.pop_front();
        }
        self.inbound.push_back(Inbound {
            topic: topic.into(),
            payload: payload.to_vec(),
        });
    }

    /// Simulate a session drop.  The broker would now publish our will.
    pub fn drop_session(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        match &self.will {
            Some((topic, payload)) => {
                info!("BUS | will | {} | {}", topic, String::from_utf8_lossy(payload));
            }
            None => info!("BUS | session dropped (no will)"),
        }
    }

    pub fn will(&self) -> Option<(&str, &[u8])> {
        self.will.as_ref().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    pub fn published(&self) -> u32 {
        self.published
    }
}

impl Connectivity for LogBus {
    fn name(&self) -> &'static str {
        "broker"
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> Result<()> {
        if !self.connected {
            self.connected = true;
            info!(
                "BUS | session '{}' up | subscribed {} {} {}",
                self.client_id, self.subscriptions[0], self.subscriptions[1], self.subscriptions[2]
            );
        }
        Ok(())
    }
}

impl MessageBus for LogBus {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(CommsError::LinkDown.into());
        }
        info!("BUS | {} | {}", topic, String::from_utf8_lossy(payload));
        self.published = self.published.wrapping_add(1);
        Ok(())
    }

    fn set_will(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        self.will = Some((topic.into(), payload.to_vec()));
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<Inbound>> {
        if !self.connected {
            return Err(CommsError::LinkDown.into());
        }
        Ok(self.inbound.pop_front())
    }
}
