//! Dual-trigger debouncer for a single digital input (the door switch).
//!
//! ## Triggers
//!
//! - **Edge interrupt**: [`DebounceInput::on_edge_interrupt`], called from
//!   the GPIO ISR.  From a stable state it re-reads the pin, enters the
//!   matching bouncing state and rearms the task to one debounce window.
//! - **Scheduler**: [`Debouncer`] is a task whose period is idle while the
//!   input is stable.  Once the window elapses it re-reads the pin once and
//!   resolves the bounce.
//!
//! ## States
//!
//! | State              | Entered by | Left by                              |
//! |--------------------|------------|--------------------------------------|
//! | `Off`              | poll       | ISR → `OffToOnBouncing`              |
//! | `OffToOnBouncing`  | ISR        | poll → `On` (pressed) / `Off`        |
//! | `On`               | poll       | ISR → `OnToOffBouncing`              |
//! | `OnToOffBouncing`  | ISR        | poll → `Off` (released) / `On`       |
//!
//! A transition that reverts within the window produces no event.  A
//! second edge while bouncing is absorbed: it neither restarts nor extends
//! the window.  The reported hold time runs from the press edge to the
//! release edge, both stamped by the ISR, so it excludes the window spent
//! confirming the release.
//!
//! Shared fields are single-word atomics.  The ISR only moves stable →
//! bouncing and the poll only moves bouncing → stable, so no lock is needed.
//! An edge that lands while the poll is resolving is absorbed; the poll
//! re-reads the pin after publishing the stable state and re-enters
//! bouncing itself if the pin already disagrees.

use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use log::{debug, info};

use crate::app::ports::{Clock, DigitalInput, Level, Pull};
use crate::error::Result;
use crate::scheduler::{Period, Schedule, Scheduler, TaskCallback, TaskId};
use crate::timing::{Micros, elapsed_us};

/// Default debounce window for mechanical switches.
pub const DEFAULT_DEBOUNCE_US: u32 = 50_000;

/// Debounce state of one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DebounceState {
    Off = 0,
    OffToOnBouncing = 1,
    On = 2,
    OnToOffBouncing = 3,
}

impl DebounceState {
    const fn from_raw(raw: u8) -> Self {
        match raw & 0b11 {
            0 => Self::Off,
            1 => Self::OffToOnBouncing,
            2 => Self::On,
            _ => Self::OnToOffBouncing,
        }
    }

    pub const fn is_stable(self) -> bool {
        matches!(self, Self::Off | Self::On)
    }
}

/// A confirmed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Pressed,
    /// `held_us` runs from the first edge of the press to the release edge.
    Released { held_us: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Level that counts as pressed.
    pub active: Level,
    /// Time a transition must survive before it is accepted.
    pub delay_us: u32,
    pub pull: Pull,
}

impl DebounceConfig {
    pub const fn new(active: Level, delay_us: u32, pull: Pull) -> Self {
        Self {
            active,
            delay_us,
            pull,
        }
    }

    /// Active-low switch to ground with the internal pull-up.
    pub const fn active_low() -> Self {
        Self::new(Level::Low, DEFAULT_DEBOUNCE_US, Pull::Up)
    }
}

// ───────────────────────────────────────────────────────────────
// Interrupt-shared half
// ───────────────────────────────────────────────────────────────

/// The part of a debouncer the edge interrupt touches.
///
/// Lives in `'static` storage on hardware so the ISR can reach it.
pub struct DebounceInput<I> {
    input: I,
    config: DebounceConfig,
    state: AtomicU8,
    press_start_us: AtomicU32,
    release_start_us: AtomicU32,
    schedule: Schedule,
}

impl<I: DigitalInput> DebounceInput<I> {
    pub const fn new(input: I, config: DebounceConfig) -> Self {
        Self {
            input,
            config,
            state: AtomicU8::new(DebounceState::Off as u8),
            press_start_us: AtomicU32::new(0),
            release_start_us: AtomicU32::new(0),
            schedule: Schedule::idle(),
        }
    }

    /// Configure the pin and seed the state from its current level.
    ///
    /// Must run before the edge interrupt is enabled.
    pub fn initialize(&self, now_us: Micros) -> Result<()> {
        self.input.configure(self.config.pull)?;
        let seeded = if self.input.level() == self.config.active {
            DebounceState::On
        } else {
            DebounceState::Off
        };
        self.press_start_us.store(now_us, Ordering::Release);
        self.schedule.set_period(Period::Idle);
        self.store(seeded);
        info!(
            "Debounce: seeded {:?} (active={:?}, window={}us)",
            seeded, self.config.active, self.config.delay_us
        );
        Ok(())
    }

    /// Edge interrupt entry point.  Lock-free, no logging, no allocation.
    pub fn on_edge_interrupt(&self, now_us: Micros) {
        self.enter_bouncing(now_us);
    }

    fn enter_bouncing(&self, now_us: Micros) {
        let state = self.state();
        let (target, bouncing) = match state {
            DebounceState::Off => (self.config.active, DebounceState::OffToOnBouncing),
            DebounceState::On => (self.config.active.opposite(), DebounceState::OnToOffBouncing),
            // Absorbed into the pending resolution.
            _ => return,
        };
        // Glitches shorter than the interrupt latency read back unchanged.
        if self.input.level() != target {
            return;
        }
        if state == DebounceState::Off {
            self.press_start_us.store(now_us, Ordering::Release);
        } else {
            self.release_start_us.store(now_us, Ordering::Release);
        }
        self.store(bouncing);
        self.schedule.rearm(Period::Every(self.config.delay_us), now_us);
    }

    /// Resolve a pending bounce.  No-op in a stable state.
    pub fn poll(&self, now_us: Micros) -> Option<Edge> {
        let state = self.state();
        if state.is_stable() {
            return None;
        }
        let level = self.input.level();
        // Idle before the stable state is published: from then on the ISR
        // may rearm the schedule, and that rearm must not be overwritten.
        self.schedule.set_period(Period::Idle);

        let edge = match state {
            DebounceState::OffToOnBouncing if level == self.config.active => {
                self.store(DebounceState::On);
                Some(Edge::Pressed)
            }
            DebounceState::OffToOnBouncing => {
                self.store(DebounceState::Off);
                debug!("Debounce: press reverted within window");
                None
            }
            DebounceState::OnToOffBouncing if level != self.config.active => {
                self.store(DebounceState::Off);
                let pressed_at = self.press_start_us.load(Ordering::Acquire);
                let released_at = self.release_start_us.load(Ordering::Acquire);
                Some(Edge::Released {
                    held_us: elapsed_us(pressed_at, released_at),
                })
            }
            DebounceState::OnToOffBouncing => {
                self.store(DebounceState::On);
                debug!("Debounce: release reverted within window");
                None
            }
            DebounceState::Off | DebounceState::On => return None,
        };
        self.enter_bouncing(now_us);
        edge
    }

    pub fn state(&self) -> DebounceState {
        DebounceState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    fn store(&self, state: DebounceState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

// ───────────────────────────────────────────────────────────────
// User callbacks
// ───────────────────────────────────────────────────────────────

/// Receives confirmed edges on the main loop.
pub trait EdgeHandler {
    fn on_pressed(&mut self) {}

    fn on_released(&mut self, _held_us: u32) {}
}

/// No callbacks.
impl EdgeHandler for () {}

/// Adapts a pair of closures.
pub struct Callbacks<P, R> {
    pub on_pressed: P,
    pub on_released: R,
}

impl<P, R> EdgeHandler for Callbacks<P, R>
where
    P: FnMut(),
    R: FnMut(u32),
{
    fn on_pressed(&mut self) {
        (self.on_pressed)();
    }

    fn on_released(&mut self, held_us: u32) {
        (self.on_released)(held_us);
    }
}

// ───────────────────────────────────────────────────────────────
// Scheduler task half
// ───────────────────────────────────────────────────────────────

/// Poll task for a [`DebounceInput`].
pub struct Debouncer<'a, I, H> {
    name: &'static str,
    input: &'a DebounceInput<I>,
    handler: H,
}

impl<'a, I: DigitalInput, H: EdgeHandler> Debouncer<'a, I, H> {
    pub fn new(input: &'a DebounceInput<I>, handler: H) -> Self {
        Self {
            name: "debounce",
            input,
            handler,
        }
    }

    /// Task name shown in scheduler logs.
    #[must_use]
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn input(&self) -> &'a DebounceInput<I> {
        self.input
    }

    /// Seed the input and register with `scheduler` at idle period.
    ///
    /// Call once, before the main loop starts and before the edge
    /// interrupt is enabled.
    pub fn initialize<C: Clock, const N: usize>(
        &'a mut self,
        scheduler: &mut Scheduler<'a, C, N>,
    ) -> Result<TaskId>
    where
        H: 'a,
    {
        let input = self.input;
        input.initialize(scheduler.clock().now_us())?;
        let name = self.name;
        scheduler.register(name, input.schedule(), self)
    }
}

impl<I: DigitalInput, H: EdgeHandler> TaskCallback for Debouncer<'_, I, H> {
    fn run(&mut self, _schedule: &Schedule, now_us: Micros) {
        match self.input.poll(now_us) {
            Some(Edge::Pressed) => {
                debug!("Debounce[{}]: pressed", self.name);
                self.handler.on_pressed();
            }
            Some(Edge::Released { held_us }) => {
                debug!("Debounce[{}]: released after {}us", self.name, held_us);
                self.handler.on_released(held_us);
            }
            None => {}
        }
    }
}
