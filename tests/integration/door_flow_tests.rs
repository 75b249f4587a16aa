//! Door switch end to end: edge interrupt → scheduler → debouncer → callbacks.
//!
//! The clock is stepped 1 ms at a time; an edge at time `t` flips the pin and
//! fires the ISR before that step's scheduler pass, as a real interrupt
//! would.

use std::cell::{Cell, RefCell};

use slotkeeper::app::ports::{Clock, DoorLatch, Level};
use slotkeeper::drivers::debouncer::{Callbacks, DebounceConfig, DebounceInput, DebounceState, Debouncer};
use slotkeeper::scheduler::{Schedule, Scheduler};
use slotkeeper::timing::Micros;

use crate::mock_hw::{ManualClock, MockLatch, SwitchPin};

const STEP_US: u32 = 1_000;

fn drive(
    scheduler: &mut Scheduler<'_, &ManualClock>,
    clock: &ManualClock,
    door: &DebounceInput<SwitchPin>,
    start: Micros,
    edges: &[(u32, Level)],
    until: u32,
) {
    let mut pending = edges.iter().peekable();
    let mut t = 0;
    while t <= until {
        clock.set(start.wrapping_add(t));
        while let Some(&&(at, level)) = pending.peek() {
            if at > t {
                break;
            }
            door.input().set(level);
            door.on_edge_interrupt(clock.now_us());
            pending.next();
        }
        scheduler.run_once();
        t += STEP_US;
    }
}

fn press_and_hold(start: Micros) -> (u32, Vec<u32>) {
    let clock = ManualClock::new(start);
    let door = DebounceInput::new(SwitchPin::released(), DebounceConfig::active_low());
    let presses = Cell::new(0u32);
    let releases = RefCell::new(Vec::new());
    let mut task = Debouncer::new(
        &door,
        Callbacks {
            on_pressed: || presses.set(presses.get() + 1),
            on_released: |held_us: u32| releases.borrow_mut().push(held_us),
        },
    );
    let mut scheduler: Scheduler<'_, &ManualClock> = Scheduler::new(&clock);
    task.initialize(&mut scheduler).unwrap();

    // Stable input: nothing is due.
    assert_eq!(scheduler.run_once(), 0);

    drive(
        &mut scheduler,
        &clock,
        &door,
        start,
        &[(10_000, Level::Low), (70_000, Level::High)],
        300_000,
    );
    assert_eq!(door.state(), DebounceState::Off);
    let held = releases.borrow().clone();
    (presses.get(), held)
}

#[test]
fn sixty_ms_press_yields_one_press_and_one_release() {
    let (presses, releases) = press_and_hold(5_000_000);
    assert_eq!(presses, 1);
    assert_eq!(releases.len(), 1);
    assert!(releases[0].abs_diff(60_000) <= STEP_US, "held {}us", releases[0]);
}

#[test]
fn press_spanning_clock_wrap_reports_true_hold() {
    let (presses, releases) = press_and_hold(u32::MAX - 30_000);
    assert_eq!(presses, 1);
    assert_eq!(releases.len(), 1);
    assert!(releases[0].abs_diff(60_000) <= STEP_US);
}

fn count_edges(edges: &[(u32, Level)]) -> (u32, u32, DebounceState) {
    let clock = ManualClock::new(0);
    let door = DebounceInput::new(SwitchPin::released(), DebounceConfig::active_low());
    let presses = Cell::new(0u32);
    let releases = Cell::new(0u32);
    let mut task = Debouncer::new(
        &door,
        Callbacks {
            on_pressed: || presses.set(presses.get() + 1),
            on_released: |_: u32| releases.set(releases.get() + 1),
        },
    );
    let mut scheduler: Scheduler<'_, &ManualClock> = Scheduler::new(&clock);
    task.initialize(&mut scheduler).unwrap();
    drive(&mut scheduler, &clock, &door, 0, edges, 300_000);
    (presses.get(), releases.get(), door.state())
}

#[test]
fn bounce_within_window_yields_single_press() {
    let (presses, releases, state) = count_edges(&[
        (10_000, Level::Low),
        (12_000, Level::High),
        (14_000, Level::Low),
    ]);
    assert_eq!((presses, releases), (1, 0));
    assert_eq!(state, DebounceState::On);
}

#[test]
fn glitch_shorter_than_window_is_ignored() {
    let (presses, releases, state) = count_edges(&[(10_000, Level::Low), (30_000, Level::High)]);
    assert_eq!((presses, releases), (0, 0));
    assert_eq!(state, DebounceState::Off);
}

#[test]
fn repeated_presses_each_reported_once() {
    let (presses, releases, _) = count_edges(&[
        (10_000, Level::Low),
        (80_000, Level::High),
        (150_000, Level::Low),
        (220_000, Level::High),
    ]);
    assert_eq!((presses, releases), (2, 2));
}

#[test]
fn edge_during_another_task_resolves_after_window() {
    let clock = ManualClock::new(0);
    let door = DebounceInput::new(SwitchPin::released(), DebounceConfig::active_low());
    let presses = Cell::new(0u32);
    let pressed_at = Cell::new(0u32);
    let mut door_task = Debouncer::new(
        &door,
        Callbacks {
            on_pressed: || {
                presses.set(presses.get() + 1);
                pressed_at.set(clock.now_us());
            },
            on_released: |_: u32| {},
        },
    );

    // Fires the door ISR from inside another task, mid-pass.
    let fired = Cell::new(false);
    let mut noisy = |_: &Schedule, now: Micros| {
        if !fired.get() && now >= 20_000 {
            door.input().set(Level::Low);
            door.on_edge_interrupt(now);
            fired.set(true);
        }
    };
    let noisy_schedule = Schedule::new(slotkeeper::scheduler::Period::Every(5_000));

    let mut scheduler: Scheduler<'_, &ManualClock> = Scheduler::new(&clock);
    door_task.initialize(&mut scheduler).unwrap();
    scheduler.register("noisy", &noisy_schedule, &mut noisy).unwrap();

    drive(&mut scheduler, &clock, &door, 0, &[], 200_000);

    assert_eq!(presses.get(), 1);
    assert_eq!(pressed_at.get(), 70_000);
    assert_eq!(door.state(), DebounceState::On);
}

#[test]
fn door_close_locks_latch() {
    let clock = ManualClock::new(0);
    let latch = RefCell::new(MockLatch {
        open: true,
        history: Vec::new(),
    });
    let door = DebounceInput::new(SwitchPin::released(), DebounceConfig::active_low());
    let mut task = Debouncer::new(
        &door,
        Callbacks {
            on_pressed: || {},
            on_released: |_: u32| latch.borrow_mut().set_open(false).unwrap(),
        },
    )
    .named("door");
    let mut scheduler: Scheduler<'_, &ManualClock> = Scheduler::new(&clock);
    let id = task.initialize(&mut scheduler).unwrap();
    assert_eq!(scheduler.name(id), Some("door"));

    drive(
        &mut scheduler,
        &clock,
        &door,
        0,
        &[(10_000, Level::Low), (500_000, Level::High)],
        600_000,
    );
    assert!(!latch.borrow().is_open());
    assert_eq!(latch.borrow().history, vec![false]);
}

/// Clock whose `fire_after`-th read presses the door and runs the edge ISR
/// 10 µs later than the value it returns, as an interrupt landing just
/// after the scheduler sampled the time would.
struct InterruptingClock<'d> {
    now: Cell<Micros>,
    door: &'d DebounceInput<SwitchPin>,
    fire_after: Cell<u32>,
}

impl Clock for InterruptingClock<'_> {
    fn now_us(&self) -> Micros {
        let now = self.now.get();
        match self.fire_after.get() {
            0 => {}
            1 => {
                self.fire_after.set(0);
                self.door.input().set(Level::Low);
                self.door.on_edge_interrupt(now.wrapping_add(10));
            }
            n => self.fire_after.set(n - 1),
        }
        now
    }
}

#[test]
fn edge_during_scheduler_clock_read_waits_full_window() {
    let start: Micros = 2_000_000;
    let door = DebounceInput::new(SwitchPin::released(), DebounceConfig::active_low());
    let clock = InterruptingClock {
        now: Cell::new(start),
        door: &door,
        fire_after: Cell::new(0),
    };
    let presses = Cell::new(0u32);
    let mut task = Debouncer::new(
        &door,
        Callbacks {
            on_pressed: || presses.set(presses.get() + 1),
            on_released: |_: u32| {},
        },
    );
    let mut scheduler: Scheduler<'_, &InterruptingClock> = Scheduler::new(&clock);
    task.initialize(&mut scheduler).unwrap();

    clock.fire_after.set(1);
    assert_eq!(scheduler.run_once(), 0);
    assert_eq!(door.state(), DebounceState::OffToOnBouncing);

    for ms in 1..=50u32 {
        clock.now.set(start + ms * STEP_US);
        scheduler.run_once();
        assert_eq!(presses.get(), 0, "press confirmed {ms} ms into the window");
    }
    clock.now.set(start + 51 * STEP_US);
    assert_eq!(scheduler.run_once(), 1);
    assert_eq!(presses.get(), 1);
    assert_eq!(door.state(), DebounceState::On);
}
