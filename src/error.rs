//! Unified error types for the slotkeeper firmware.
//!
//! One `Error` enum that every subsystem converts into, keeping error
//! handling in `main` and in the task callbacks uniform.  All variants
//! are `Copy` so they pass through task boundaries without allocation.
//!
//! The scheduler and the debouncer never produce errors; everything in
//! here comes from setup, GPIO, encoding and the network links.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The scheduler's task table is full.
    SchedulerFull,
    /// A GPIO call failed (raw driver return code, or `-1` for HAL errors).
    Gpio(i32),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
    /// A network link or the message bus failed.
    Comms(CommsError),
    /// A message could not be encoded or decoded.
    Encode,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchedulerFull => write!(f, "scheduler task table full"),
            Self::Gpio(rc) => write!(f, "GPIO failed (rc={rc})"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Encode => write!(f, "message encoding failed"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// The link is down; the operation needs a connection.
    LinkDown,
    /// A connection attempt failed.
    ConnectFailed,
    /// The bus refused or dropped an outgoing message.
    PublishFailed,
    /// No credentials were configured for the link.
    NoCredentials,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkDown => write!(f, "link down"),
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::NoCredentials => write!(f, "no credentials configured"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(_: serde_json::Error) -> Self {
        Self::Encode
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
