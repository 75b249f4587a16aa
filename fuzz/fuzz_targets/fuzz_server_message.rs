//! Fuzz target: `ServerMessage::decode`
//!
//! Inbound payloads come straight off the broker.  Decoding must reject
//! garbage with an error, never a panic, and anything accepted must carry
//! a known status code.
//!
//! cargo fuzz run fuzz_server_message

#![no_main]

use libfuzzer_sys::fuzz_target;
use slotkeeper::app::messages::{ServerMessage, Status};

fuzz_target!(|data: &[u8]| {
    if let Ok(msg) = ServerMessage::decode(data) {
        assert_eq!(Status::from_code(msg.status.code()), Some(msg.status));
    }
});
