//! Peripheral drivers: door switch, latch servo, RFID reader, slot matrix.

pub mod debouncer;
pub mod gpio;
pub mod matrix;
pub mod rdm6300;
pub mod servo;
pub mod watchdog;
