//! Slotkeeper cabinet controller firmware library.
//!
//! Exposes the scheduler, the door debouncer and the cabinet tasks for
//! integration testing. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod scheduler;
pub mod tasks;
pub mod timing;
