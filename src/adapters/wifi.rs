//! WiFi station-mode adapter.
//!
//! Implements [`Connectivity`] so [`LinkMonitor`](crate::tasks::link::LinkMonitor)
//! can supervise it.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi`.  `connect`
//!   only issues the association request; the link is reported up once
//!   the netif has an address.
//! - **all other targets**: simulation for host-side tests.

use log::info;

use crate::app::ports::Connectivity;
use crate::error::{CommsError, Error, Result};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<()> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(Error::Config("SSID must be 1-32 printable ASCII bytes"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if !password.is_empty() && (password.len() < 8 || password.len() > 64) {
        return Err(Error::Config("password must be 8-64 bytes, or empty for open"));
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(target_os = "espidf")]
    driver: EspWifi<'static>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimLink,
}

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
struct SimLink {
    up: bool,
    fail_next: u32,
    attempts: u32,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(driver: EspWifi<'static>) -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            driver,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            sim: SimLink::default(),
        }
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<()> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid
            .push_str(ssid)
            .map_err(|_| Error::Config("SSID too long"))?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| Error::Config("password too long"))?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    /// Simulation: drop the association.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop(&mut self) {
        self.sim.up = false;
        info!("WiFi(sim): association lost");
    }

    /// Simulation: fail the next `n` connection attempts.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim.fail_next = n;
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<()> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let cfg = Configuration::Client(ClientConfiguration {
            ssid: self.ssid.clone(),
            password: self.password.clone(),
            auth_method,
            ..Default::default()
        });
        self.driver
            .set_configuration(&cfg)
            .map_err(|_| CommsError::ConnectFailed)?;
        if !self.driver.is_started().unwrap_or(false) {
            self.driver.start().map_err(|_| CommsError::ConnectFailed)?;
        }
        self.driver.connect().map_err(|_| CommsError::ConnectFailed)?;
        info!("WiFi: association with '{}' requested", self.ssid);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<()> {
        self.sim.attempts = self.sim.attempts.wrapping_add(1);
        if self.sim.fail_next > 0 {
            self.sim.fail_next -= 1;
            return Err(CommsError::ConnectFailed.into());
        }
        self.sim.up = true;
        info!("WiFi(sim): connected to '{}' (attempt {})", self.ssid, self.sim.attempts);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.driver.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim.up
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Connectivity for WifiAdapter {
    fn name(&self) -> &'static str {
        "wifi"
    }

    fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    fn connect(&mut self) -> Result<()> {
        if self.ssid.is_empty() {
            return Err(CommsError::NoCredentials.into());
        }
        self.platform_connect()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
