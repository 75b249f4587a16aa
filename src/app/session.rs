//! Runtime state shared between scheduler tasks.
//!
//! Tasks run one at a time on the main loop, so plain `Cell`/`RefCell`
//! suffices.  Nothing here is touched from interrupt context.

use core::cell::{Cell, RefCell};
use core::fmt::Write as _;

/// Tag id as sent in the `RFID` field (lower-case hex).
pub type TagId = heapless::String<20>;

/// Sent before any tag has been scanned.
pub const NO_TAG: &str = "null";

#[derive(Debug)]
pub struct Session {
    latest_tag: RefCell<TagId>,
    server_connected: Cell<bool>,
    server_error: Cell<bool>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let mut tag = TagId::new();
        let _ = tag.push_str(NO_TAG);
        Self {
            latest_tag: RefCell::new(tag),
            server_connected: Cell::new(false),
            server_error: Cell::new(false),
        }
    }

    /// Record `tag` as the latest scan and return its text form.
    pub fn set_latest_tag(&self, tag: u32) -> TagId {
        let mut text = TagId::new();
        // u32 hex is at most 8 chars.
        let _ = write!(text, "{tag:x}");
        self.latest_tag.replace(text.clone());
        text
    }

    pub fn latest_tag(&self) -> TagId {
        self.latest_tag.borrow().clone()
    }

    pub fn server_connected(&self) -> bool {
        self.server_connected.get()
    }

    pub fn set_server_connected(&self, connected: bool) {
        self.server_connected.set(connected);
    }

    pub fn server_error(&self) -> bool {
        self.server_error.get()
    }

    pub fn set_server_error(&self, error: bool) {
        self.server_error.set(error);
    }
}
