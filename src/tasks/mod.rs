//! Scheduler tasks: the cabinet's periodic work.
//!
//! Each task owns (or borrows) its ports and implements
//! [`TaskCallback`](crate::scheduler::TaskCallback).  Ports shared between
//! tasks (bus, latch) are passed as `&RefCell<_>`; tasks run one at a time
//! so a borrow never outlives a single callback.

pub mod bus_pump;
pub mod link;
pub mod rfid;
pub mod slot_scan;

use log::{debug, warn};

use crate::app::messages::{Message, Status};
use crate::app::ports::MessageBus;
use crate::config::Topics;
use crate::error::Result;

/// Point the broker will at `tag`: a `Disconnect` message published on
/// our behalf if the session drops.  `tag` is empty before the first scan.
pub fn set_disconnect_will<B: MessageBus + ?Sized>(bus: &mut B, topics: &Topics, tag: &str) -> Result<()> {
    let payload = Message::new(Status::Disconnect, "", tag).to_json()?;
    bus.set_will(&topics.will, &payload)
}

/// Encode and publish `message`.  Failures are logged, not propagated:
/// a task has nobody to return them to.
pub(crate) fn publish<B: MessageBus + ?Sized>(bus: &mut B, topic: &str, message: &Message<'_>) -> bool {
    match message.to_json().and_then(|payload| bus.publish(topic, &payload)) {
        Ok(()) => {
            debug!("bus: -> {} status={}", topic, message.status);
            true
        }
        Err(e) => {
            warn!("bus: publish to {} failed: {}", topic, e);
            false
        }
    }
}
