//! Link supervision task (WiFi, broker session).
//!
//! While the link is up the task runs at the check interval.  When it finds
//! the link down it makes one connection attempt per invocation and
//! reschedules itself with exponential backoff: min, 2×min, … capped at
//! max.  Once the link reports connected it returns to the check interval.

use core::cell::RefCell;

use log::{info, warn};

use crate::app::ports::Connectivity;
use crate::scheduler::{Period, Schedule, TaskCallback};
use crate::timing::Micros;

pub struct LinkMonitor<'a, C> {
    link: &'a RefCell<C>,
    check_ms: u32,
    retry_min_ms: u32,
    retry_max_ms: u32,
    next_retry_ms: u32,
    down: bool,
    attempts: u32,
}

impl<'a, C: Connectivity> LinkMonitor<'a, C> {
    pub fn new(link: &'a RefCell<C>, check_ms: u32, retry_min_ms: u32, retry_max_ms: u32) -> Self {
        Self {
            link,
            check_ms,
            retry_min_ms,
            retry_max_ms,
            next_retry_ms: retry_min_ms,
            down: false,
            attempts: 0,
        }
    }

    /// Initial schedule for this task.
    pub fn period(&self) -> Period {
        Period::from_ms(self.check_ms)
    }

    /// Delay before the next attempt while the link is down.
    pub fn next_retry_ms(&self) -> u32 {
        self.next_retry_ms
    }

    /// Failed attempts since the link was last up.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn restored(&mut self, schedule: &Schedule, name: &str) {
        if self.down {
            info!("{}: link restored after {} failed attempt(s)", name, self.attempts);
        }
        self.down = false;
        self.attempts = 0;
        self.next_retry_ms = self.retry_min_ms;
        schedule.set_period(Period::from_ms(self.check_ms));
    }
}

impl<C: Connectivity> TaskCallback for LinkMonitor<'_, C> {
    fn run(&mut self, schedule: &Schedule, _now_us: Micros) {
        let mut link = self.link.borrow_mut();
        let name = link.name();
        if link.is_connected() {
            drop(link);
            self.restored(schedule, name);
            return;
        }
        if !self.down {
            warn!("{}: link lost", name);
            self.down = true;
        }
        let attempt = link.connect();
        let up = attempt.is_ok() && link.is_connected();
        drop(link);
        if up {
            self.restored(schedule, name);
            return;
        }
        // A request the link accepted but has not completed still backs off.
        self.attempts = self.attempts.saturating_add(1);
        match attempt {
            Err(e) => warn!("{}: reconnect failed ({}), retry in {}ms", name, e, self.next_retry_ms),
            Ok(()) => info!("{}: connect pending, recheck in {}ms", name, self.next_retry_ms),
        }
        schedule.set_period(Period::from_ms(self.next_retry_ms));
        self.next_retry_ms = self.next_retry_ms.saturating_mul(2).min(self.retry_max_ms);
    }
}
