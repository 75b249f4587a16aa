//! Slot matrix scan task.
//!
//! Each pass reads the whole matrix, diffs it against the previous pass
//! and publishes one `Place` and/or one `Take` message listing the slots
//! that changed.  The first pass reports every occupied slot as placed.

use core::cell::RefCell;

use log::{debug, warn};

use crate::app::messages::{Message, Status};
use crate::app::ports::{MessageBus, SlotMatrix};
use crate::app::session::Session;
use crate::app::slots::{COLS, ROWS, SlotSet, diff};
use crate::config::Topics;
use crate::error::Result;
use crate::scheduler::{Schedule, TaskCallback};
use crate::timing::Micros;

use super::publish;

pub struct SlotScanner<'a, M, B> {
    matrix: M,
    bus: &'a RefCell<B>,
    session: &'a Session,
    topics: &'a Topics,
    previous: SlotSet,
}

impl<'a, M: SlotMatrix, B: MessageBus> SlotScanner<'a, M, B> {
    pub fn new(matrix: M, bus: &'a RefCell<B>, session: &'a Session, topics: &'a Topics) -> Self {
        Self {
            matrix,
            bus,
            session,
            topics,
            previous: SlotSet::EMPTY,
        }
    }

    /// Occupancy as of the last successful scan.
    pub fn occupied(&self) -> SlotSet {
        self.previous
    }

    pub fn matrix_mut(&mut self) -> &mut M {
        &mut self.matrix
    }

    /// Read every switch.  A row is always released, even on error.
    pub fn scan(&mut self) -> Result<SlotSet> {
        let mut set = SlotSet::EMPTY;
        for row in 0..ROWS {
            self.matrix.select_row(row, true)?;
            let read = self.read_row(row, &mut set);
            self.matrix.select_row(row, false)?;
            read?;
        }
        Ok(set)
    }

    fn read_row(&mut self, row: usize, set: &mut SlotSet) -> Result<()> {
        for col in 0..COLS {
            if self.matrix.column_closed(col)? {
                set.insert(row, col);
            }
        }
        Ok(())
    }

    fn report(&self, status: Status, slots: SlotSet) {
        if slots.is_empty() {
            return;
        }
        let list = slots.to_list();
        let tag = self.session.latest_tag();
        debug!("Slots: {} {}", status.as_str(), list);
        publish(
            &mut *self.bus.borrow_mut(),
            &self.topics.stream,
            &Message::new(status, &list, &tag),
        );
    }
}

impl<M: SlotMatrix, B: MessageBus> TaskCallback for SlotScanner<'_, M, B> {
    fn run(&mut self, _schedule: &Schedule, _now_us: Micros) {
        let current = match self.scan() {
            Ok(set) => set,
            Err(e) => {
                warn!("Slots: scan failed: {}", e);
                return;
            }
        };
        let change = diff(self.previous, current);
        self.previous = current;
        self.report(Status::Place, change.placed);
        self.report(Status::Take, change.taken);
    }
}
