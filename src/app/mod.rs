//! Application core: the cabinet's domain model, zero I/O.
//!
//! Message encoding, slot bookkeeping and shared session state live here.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod messages;
pub mod ports;
pub mod session;
pub mod slots;
