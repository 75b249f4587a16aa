//! Cooperative micro-task scheduler.
//!
//! Every periodic job in the firmware (RFID poll, slot scan, bus pump,
//! link checks, watchdog feed, door debounce) is a task: a callback plus
//! a [`Schedule`] descriptor.  The main loop calls [`Scheduler::run_once`]
//! forever; each pass invokes every task whose period has elapsed since
//! its last invocation.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  main loop ──▶ run_once() ──▶ for each task, in order:       │
//! │                                                              │
//! │     period idle?             ──▶ skip                        │
//! │     now - last_run < period? ──▶ skip                        │
//! │     callback.run(&schedule, now)                             │
//! │     last_run = clock.now()   (taken after the callback)      │
//! │                                                              │
//! │  edge ISR ──▶ schedule.rearm(delay, now)   (debouncer only)  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no preemption: a callback that never returns starves every
//! other task.  The watchdog-feed task turns that into a reset on hardware.

use core::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use heapless::Vec;
use log::{info, trace};

use crate::app::ports::Clock;
use crate::error::{Error, Result};
use crate::timing::{Micros, has_elapsed, ms_to_us};

// ═══════════════════════════════════════════════════════════════
//  Schedule descriptor
// ═══════════════════════════════════════════════════════════════

/// Raw encoding of [`Period::Idle`].
const IDLE_RAW: i32 = -1;

/// Default task table capacity.
pub const DEFAULT_CAPACITY: usize = 8;

/// How often a task wants to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Never invoked by the scheduler until something rearms it.
    Idle,
    /// Minimum microseconds between the end of one invocation and the
    /// start of the next.  Capped at `i32::MAX`.
    Every(u32),
}

impl Period {
    pub const fn from_ms(ms: u32) -> Self {
        Self::Every(ms_to_us(ms))
    }

    const fn encode(self) -> i32 {
        match self {
            Self::Idle => IDLE_RAW,
            Self::Every(us) if us > i32::MAX as u32 => i32::MAX,
            Self::Every(us) => us as i32,
        }
    }

    const fn decode(raw: i32) -> Self {
        if raw < 0 { Self::Idle } else { Self::Every(raw as u32) }
    }
}

/// Period and last-invocation stamp of one task.
///
/// Both fields are single-word atomics: the scheduler reads them every
/// pass, the owning callback may rewrite them, and for the debouncer the
/// edge interrupt rewrites them while the main loop is mid-pass.
#[derive(Debug)]
pub struct Schedule {
    period: AtomicI32,
    last_run: AtomicU32,
}

impl Schedule {
    pub const fn new(period: Period) -> Self {
        Self {
            period: AtomicI32::new(period.encode()),
            last_run: AtomicU32::new(0),
        }
    }

    pub const fn idle() -> Self {
        Self::new(Period::Idle)
    }

    pub fn period(&self) -> Period {
        Period::decode(self.period.load(Ordering::Acquire))
    }

    pub fn set_period(&self, period: Period) {
        self.period.store(period.encode(), Ordering::Release);
    }

    pub fn last_run(&self) -> Micros {
        self.last_run.load(Ordering::Acquire)
    }

    pub fn mark_run(&self, now_us: Micros) {
        self.last_run.store(now_us, Ordering::Release);
    }

    /// Restart the countdown from `now_us` with a new period.
    ///
    /// The stamp is written before the period, so a reader that observes
    /// the new period also observes the new stamp.
    pub fn rearm(&self, period: Period, now_us: Micros) {
        self.mark_run(now_us);
        self.set_period(period);
    }

    /// True if the task should run at `now_us`.
    ///
    /// `now_us` must be read after this call's loads to be race-free
    /// against [`rearm`](Self::rearm); [`Scheduler::run_once`] goes
    /// through [`due_at`](Self::due_at) with that order instead.
    pub fn is_due(&self, now_us: Micros) -> bool {
        Self::due_at(self.period(), self.last_run(), now_us)
    }

    /// Due check on a snapshot taken by [`period`](Self::period) then
    /// [`last_run`](Self::last_run).
    pub const fn due_at(period: Period, last_run: Micros, now_us: Micros) -> bool {
        match period {
            Period::Idle => false,
            Period::Every(period_us) => has_elapsed(last_run, now_us, period_us),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Task callbacks
// ═══════════════════════════════════════════════════════════════

/// Work invoked by the scheduler.
///
/// `schedule` is the task's own descriptor, so a callback can reschedule
/// itself (`set_period`, `rearm`).  `now_us` is the clock reading that
/// made the task due.
pub trait TaskCallback {
    fn run(&mut self, schedule: &Schedule, now_us: Micros);
}

impl<F> TaskCallback for F
where
    F: FnMut(&Schedule, Micros),
{
    fn run(&mut self, schedule: &Schedule, now_us: Micros) {
        self(schedule, now_us);
    }
}

/// Index of a registered task, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(usize);

impl TaskId {
    pub const fn index(self) -> usize {
        self.0
    }
}

struct TaskEntry<'a> {
    name: &'static str,
    schedule: &'a Schedule,
    callback: &'a mut (dyn TaskCallback + 'a),
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// The scheduler engine.
///
/// Tasks are borrowed, not owned: whoever creates a task keeps it alive
/// for `'a`.  The table is filled during setup and fixed afterwards;
/// `register` takes `&mut self`, so it cannot race a pass.
pub struct Scheduler<'a, C: Clock, const N: usize = DEFAULT_CAPACITY> {
    clock: C,
    tasks: Vec<TaskEntry<'a>, N>,
}

impl<'a, C: Clock, const N: usize> Scheduler<'a, C, N> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            tasks: Vec::new(),
        }
    }

    /// Append a task.  Its period counts from now.
    pub fn register(
        &mut self,
        name: &'static str,
        schedule: &'a Schedule,
        callback: &'a mut (dyn TaskCallback + 'a),
    ) -> Result<TaskId> {
        let id = TaskId(self.tasks.len());
        schedule.mark_run(self.clock.now_us());
        self.tasks
            .push(TaskEntry {
                name,
                schedule,
                callback,
            })
            .map_err(|_| Error::SchedulerFull)?;
        info!(
            "Scheduler: registered '{}' as task {} ({:?})",
            name,
            id.0,
            schedule.period()
        );
        Ok(id)
    }

    /// One pass over every task, in registration order.
    ///
    /// Returns the number of callbacks invoked.  Never blocks; a slow
    /// callback only delays the checks of the tasks after it.
    pub fn run_once(&mut self) -> usize {
        let mut invoked = 0;
        for task in &mut self.tasks {
            // Descriptor before clock.  A rearm from the ISR that lands
            // after these loads is seen next pass; one that lands before
            // them carries a stamp no later than `now`.
            let period = task.schedule.period();
            let last_run = task.schedule.last_run();
            let now = self.clock.now_us();
            if !Schedule::due_at(period, last_run, now) {
                continue;
            }
            trace!("Scheduler: running '{}' at {}us", task.name, now);
            task.callback.run(task.schedule, now);
            // Stamp after the callback so its own runtime never counts
            // against the next period.
            task.schedule.mark_run(self.clock.now_us());
            invoked += 1;
        }
        invoked
    }

    /// Run passes forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.run_once();
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn schedule(&self, id: TaskId) -> Option<&Schedule> {
        self.tasks.get(id.0).map(|t| t.schedule)
    }

    pub fn name(&self, id: TaskId) -> Option<&'static str> {
        self.tasks.get(id.0).map(|t| t.name)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
