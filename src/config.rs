//! System configuration parameters
//!
//! All tunable parameters for the slotkeeper cabinet controller.
//! Secrets (WiFi and broker credentials) are kept out of [`SystemConfig`]
//! and baked in at build time via [`Credentials::from_build_env`].

use core::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::app::ports::{Level, Pull};
use crate::drivers::debouncer::DebounceConfig;
use crate::error::{Error, Result};

/// Capacity of topic strings.
pub const TOPIC_CAP: usize = 64;

pub type Topic = heapless::String<TOPIC_CAP>;

/// Message bus topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topics {
    /// Our outgoing stream (scans, slot changes).
    pub stream: Topic,
    /// Last-will topic the broker publishes to if we drop.
    pub will: Topic,
    /// Server's outgoing stream (commands for us).
    pub server_stream: Topic,
    /// Server's last-will topic.
    pub server_will: Topic,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            stream: bounded("comps/arduino/stream"),
            will: bounded("comps/arduino/will"),
            server_stream: bounded("comps/server/stream"),
            server_will: bounded("comps/server/will"),
        }
    }
}

impl Topics {
    /// Topics the broker session subscribes to: our own stream (echo
    /// check) and both server topics.
    pub fn subscriptions(&self) -> [&str; 3] {
        [self.stream.as_str(), self.server_stream.as_str(), self.server_will.as_str()]
    }
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Identity ---
    /// Broker client id.
    pub client_id: heapless::String<32>,
    pub topics: Topics,

    // --- Timing ---
    /// WiFi link check interval (milliseconds)
    pub wifi_check_interval_ms: u32,
    /// Broker session check interval (milliseconds)
    pub broker_check_interval_ms: u32,
    /// RFID reader poll interval (milliseconds)
    pub rfid_poll_interval_ms: u32,
    /// Slot matrix scan interval (milliseconds)
    pub slot_scan_interval_ms: u32,
    /// Inbound message poll interval (milliseconds)
    pub bus_poll_interval_ms: u32,
    /// Task watchdog feed interval (milliseconds)
    pub watchdog_feed_interval_ms: u32,

    // --- Link recovery ---
    /// First reconnect retry delay (milliseconds)
    pub link_retry_min_ms: u32,
    /// Reconnect retry delay cap (milliseconds)
    pub link_retry_max_ms: u32,

    // --- Door switch ---
    /// Debounce window (microseconds)
    pub door_debounce_us: u32,
    /// Level the switch reads while the door is open.
    pub door_active_level: Level,
    pub door_pull_up: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            client_id: bounded(option_env!("MQTT_CLIENT_ID").unwrap_or("slotkeeper")),
            topics: Topics::default(),

            wifi_check_interval_ms: 10_000,
            broker_check_interval_ms: 10_000,
            rfid_poll_interval_ms: 10,
            slot_scan_interval_ms: 500,
            bus_poll_interval_ms: 10,
            watchdog_feed_interval_ms: 1_000,

            link_retry_min_ms: 2_000,
            link_retry_max_ms: 60_000,

            door_debounce_us: 50_000,
            door_active_level: Level::Low,
            door_pull_up: true,
        }
    }
}

impl SystemConfig {
    /// Reject values the scheduler or the debouncer cannot honour.
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            self.wifi_check_interval_ms,
            self.broker_check_interval_ms,
            self.rfid_poll_interval_ms,
            self.slot_scan_interval_ms,
            self.bus_poll_interval_ms,
            self.watchdog_feed_interval_ms,
        ];
        if intervals.contains(&0) {
            return Err(Error::Config("task interval must be non-zero"));
        }
        if self.door_debounce_us == 0 || self.door_debounce_us > i32::MAX as u32 {
            return Err(Error::Config("debounce window out of range"));
        }
        if self.link_retry_min_ms == 0 || self.link_retry_min_ms > self.link_retry_max_ms {
            return Err(Error::Config("link retry range inverted"));
        }
        if self.client_id.is_empty() {
            return Err(Error::Config("client id empty"));
        }
        Ok(())
    }

    pub fn door_debounce(&self) -> DebounceConfig {
        let pull = if self.door_pull_up { Pull::Up } else { Pull::Floating };
        DebounceConfig::new(self.door_active_level, self.door_debounce_us, pull)
    }
}

/// Link credentials, baked in from the build environment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub wifi_ssid: heapless::String<32>,
    pub wifi_pass: heapless::String<64>,
    pub broker_host: heapless::String<64>,
    pub broker_port: u16,
    pub broker_user: heapless::String<32>,
    pub broker_pass: heapless::String<64>,
}

impl Credentials {
    pub const DEFAULT_BROKER_PORT: u16 = 1883;

    pub fn from_build_env() -> Self {
        Self {
            wifi_ssid: bounded(option_env!("WIFI_SSID").unwrap_or("")),
            wifi_pass: bounded(option_env!("WIFI_PASS").unwrap_or("")),
            broker_host: bounded(option_env!("MQTT_HOST").unwrap_or("")),
            broker_port: option_env!("MQTT_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(Self::DEFAULT_BROKER_PORT),
            broker_user: bounded(option_env!("MQTT_USER").unwrap_or("")),
            broker_pass: bounded(option_env!("MQTT_PASS").unwrap_or("")),
        }
    }

    pub fn has_wifi(&self) -> bool {
        !self.wifi_ssid.is_empty()
    }

    pub fn has_broker(&self) -> bool {
        !self.broker_host.is_empty()
    }

    /// `mqtt://host:port`, or `None` without a broker host.
    pub fn broker_url(&self) -> Option<heapless::String<80>> {
        if !self.has_broker() {
            return None;
        }
        let mut url = heapless::String::new();
        write!(url, "mqtt://{}:{}", self.broker_host, self.broker_port).ok()?;
        Some(url)
    }
}

/// Copy `s` into a bounded string, truncating at a char boundary.
pub fn bounded<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
