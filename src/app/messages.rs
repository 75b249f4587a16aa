//! Bus message model.
//!
//! Every message on the bus is a flat JSON object:
//!
//! ```json
//! {"message":"new tag scanned","RFID":"1a7b3cd2","slots":"","status":2}
//! ```
//!
//! `slots` is a `;`-terminated list of slot ids (see [`super::slots`]).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Status code carried in every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Place = 0,
    Take = 1,
    Scan = 2,
    Disconnect = 3,
    Connect = 4,
    Open = 5,
    ErrorOccur = 7,
    ErrorResolve = 8,
}

impl Status {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Place,
            1 => Self::Take,
            2 => Self::Scan,
            3 => Self::Disconnect,
            4 => Self::Connect,
            5 => Self::Open,
            7 => Self::ErrorOccur,
            8 => Self::ErrorResolve,
            _ => return None,
        })
    }

    /// Human-readable text sent in the `message` field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Place => "computer placed",
            Self::Take => "computer taken",
            Self::Scan => "new tag scanned",
            Self::Disconnect => "arduino with RFID scanner disconnected",
            Self::Connect => "arduino with RFID scanner connected",
            Self::Open => "opening the door",
            Self::ErrorOccur => "server error occurred",
            Self::ErrorResolve => "server error resolved",
        }
    }
}

/// Outbound message, borrowed from the caller's buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Message<'a> {
    pub message: &'a str,
    #[serde(rename = "RFID")]
    pub rfid: &'a str,
    pub slots: &'a str,
    pub status: u8,
}

impl<'a> Message<'a> {
    pub const fn new(status: Status, slots: &'a str, tag: &'a str) -> Self {
        Self {
            message: status.as_str(),
            rfid: tag,
            slots,
            status: status.code(),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// A decoded message from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMessage {
    pub status: Status,
    pub rfid: String,
    pub slots: String,
}

#[derive(Deserialize)]
struct Wire {
    status: u8,
    #[serde(default, rename = "RFID")]
    rfid: String,
    #[serde(default)]
    slots: String,
}

impl ServerMessage {
    /// Decode an inbound payload.  `message` is ignored; the code rules.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let wire: Wire = serde_json::from_slice(payload)?;
        let status = Status::from_code(wire.status).ok_or(Error::Encode)?;
        Ok(Self {
            status,
            rfid: wire.rfid,
            slots: wire.slots,
        })
    }
}
