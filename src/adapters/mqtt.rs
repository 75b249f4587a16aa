//! MQTT broker session adapter.
//!
//! Implements [`MessageBus`](crate::app::ports::MessageBus) and
//! [`Connectivity`](crate::app::ports::Connectivity) over the ESP-IDF MQTT
//! client, so [`LinkMonitor`](crate::tasks::link::LinkMonitor) supervises
//! the session and the tasks publish through it.
//!
//! ## Threading
//!
//! The ESP-IDF client runs its own task.  Its event callback only touches
//! [`SessionState`]: the connection flag, a resubscribe request and a
//! bounded inbound queue.  Subscribing, publishing and draining the queue
//! all happen on the main loop.
//!
//! ## Last will
//!
//! The will travels in the CONNECT packet.  A will set while a session is
//! up applies from the next session; `connect` rebuilds the client when
//! the will changed while the link was down.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`MqttBus`] over `EspMqttClient`.
//! - **all other targets**: only [`SessionState`]; host tests use
//!   [`LogBus`](super::log_bus::LogBus).

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;

use crate::adapters::log_bus::INBOUND_CAPACITY;
use crate::app::ports::Inbound;

#[cfg(target_os = "espidf")]
use std::sync::Arc;

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
};
#[cfg(target_os = "espidf")]
use log::{debug, info};

#[cfg(target_os = "espidf")]
use crate::app::ports::{Connectivity, MessageBus};
#[cfg(target_os = "espidf")]
use crate::config::{Credentials, Topic, Topics, bounded};
#[cfg(target_os = "espidf")]
use crate::error::{CommsError, Result};

// ───────────────────────────────────────────────────────────────
// Session state shared with the client task
// ───────────────────────────────────────────────────────────────

/// What the client's event callback reports to the main loop.
#[derive(Debug, Default)]
pub struct SessionState {
    connected: AtomicBool,
    resubscribe: AtomicBool,
    inbound: Mutex<VecDeque<Inbound>>,
}

impl SessionState {
    /// CONNACK received.  Subscriptions are requested again for every
    /// new session.
    pub fn on_connected(&self) {
        self.resubscribe.store(true, Ordering::Release);
        self.connected.store(true, Ordering::Release);
    }

    pub fn on_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    /// Queue an inbound message.  Drops the oldest one when full.
    pub fn on_received(&self, topic: &str, data: &[u8]) {
        let Ok(mut queue) = self.inbound.lock() else {
            return;
        };
        if queue.len() >= INBOUND_CAPACITY {
            warn!("mqtt: inbound queue full, dropping oldest");
            queue.pop_front();
        }
        queue.push_back(Inbound {
            topic: topic.into(),
            payload: data.to_vec(),
        });
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// True once per new session.
    pub fn take_resubscribe(&self) -> bool {
        self.resubscribe.swap(false, Ordering::AcqRel)
    }

    pub fn next_inbound(&self) -> Option<Inbound> {
        self.inbound.lock().ok()?.pop_front()
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct MqttBus {
    url: Option<heapless::String<80>>,
    client_id: heapless::String<32>,
    user: heapless::String<32>,
    pass: heapless::String<64>,
    subscriptions: [Topic; 3],
    will: Option<(Topic, Vec<u8>)>,
    will_stale: bool,
    state: Arc<SessionState>,
    client: Option<EspMqttClient<'static>>,
}

#[cfg(target_os = "espidf")]
impl MqttBus {
    /// No client is started until [`connect`](Connectivity::connect).
    pub fn new(creds: &Credentials, client_id: &heapless::String<32>, topics: &Topics) -> Self {
        Self {
            url: creds.broker_url(),
            client_id: client_id.clone(),
            user: creds.broker_user.clone(),
            pass: creds.broker_pass.clone(),
            subscriptions: topics.subscriptions().map(bounded),
            will: None,
            will_stale: false,
            state: Arc::new(SessionState::default()),
            client: None,
        }
    }

    fn start_client(&mut self) -> Result<()> {
        let Some(url) = self.url.as_ref() else {
            return Err(CommsError::NoCredentials.into());
        };
        // The old client's callback holds its own clone of the state.
        self.client = None;
        self.state.on_disconnected();

        let lwt = self.will.as_ref().map(|(topic, payload)| LwtConfiguration {
            topic: topic.as_str(),
            payload: payload.as_slice(),
            qos: QoS::ExactlyOnce,
            retain: true,
        });
        let conf = MqttClientConfiguration {
            client_id: Some(self.client_id.as_str()),
            username: (!self.user.is_empty()).then_some(self.user.as_str()),
            password: (!self.pass.is_empty()).then_some(self.pass.as_str()),
            lwt,
            ..Default::default()
        };
        let state = Arc::clone(&self.state);
        let client = EspMqttClient::new_cb(url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => state.on_connected(),
            EventPayload::Disconnected => state.on_disconnected(),
            EventPayload::Received {
                topic,
                data,
                details: Details::Complete,
                ..
            } => state.on_received(topic.unwrap_or(""), data),
            EventPayload::Error(e) => warn!("mqtt: client error: {:?}", e),
            _ => {}
        })
        .map_err(|e| {
            warn!("mqtt: client start failed: {}", e);
            CommsError::ConnectFailed
        })?;

        info!("mqtt: session to {} as '{}' starting", url, self.client_id);
        self.client = Some(client);
        self.will_stale = false;
        Ok(())
    }

    /// Subscribe once per new session.
    fn service(&mut self) {
        if !self.state.take_resubscribe() {
            return;
        }
        let Some(client) = self.client.as_mut() else {
            return;
        };
        for topic in &self.subscriptions {
            match client.subscribe(topic, QoS::AtMostOnce) {
                Ok(_) => info!("mqtt: subscribed to \"{}\"", topic),
                Err(e) => warn!("mqtt: subscribe to \"{}\" failed: {}", topic, e),
            }
        }
    }
}

#[cfg(target_os = "espidf")]
impl Connectivity for MqttBus {
    fn name(&self) -> &'static str {
        "broker"
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.state.is_connected()
    }

    /// Starts (or restarts) the client.  The ESP-IDF client retries on its
    /// own; the session reports up through the event callback.
    fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        if self.client.is_none() || self.will_stale {
            self.start_client()?;
        }
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
impl MessageBus for MqttBus {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        self.service();
        if !self.is_connected() {
            return Err(CommsError::LinkDown.into());
        }
        let client = self.client.as_mut().ok_or(CommsError::LinkDown)?;
        client
            .enqueue(topic, QoS::AtMostOnce, false, payload)
            .map_err(|e| {
                warn!("mqtt: enqueue to {} failed: {}", topic, e);
                CommsError::PublishFailed
            })?;
        Ok(())
    }

    fn set_will(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        self.will = Some((bounded(topic), payload.to_vec()));
        self.will_stale = self.client.is_some();
        debug!("mqtt: will on {} updated", topic);
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<Inbound>> {
        self.service();
        if !self.is_connected() {
            return Err(CommsError::LinkDown.into());
        }
        Ok(self.state.next_inbound())
    }
}
