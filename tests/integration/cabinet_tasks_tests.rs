//! Cabinet tasks against mock peripherals: RFID scans, slot changes,
//! inbound server commands and link recovery.

use std::cell::RefCell;

use slotkeeper::adapters::log_bus::LogBus;
use slotkeeper::app::messages::Status;
use slotkeeper::app::ports::Connectivity;
use slotkeeper::app::session::Session;
use slotkeeper::app::slots::SlotSet;
use slotkeeper::config::SystemConfig;
use slotkeeper::scheduler::{Period, Schedule, Scheduler, TaskCallback};
use slotkeeper::tasks::bus_pump::BusPump;
use slotkeeper::tasks::link::LinkMonitor;
use slotkeeper::tasks::rfid::RfidListener;
use slotkeeper::tasks::set_disconnect_will;
use slotkeeper::tasks::slot_scan::SlotScanner;

use crate::mock_hw::{ManualClock, MockLatch, MockLed, MockMatrix, MockReader, RecordingBus, status_code};

fn occupied(slots: &[(usize, usize)]) -> SlotSet {
    let mut set = SlotSet::EMPTY;
    for &(row, col) in slots {
        set.insert(row, col);
    }
    set
}

// ── RFID ──────────────────────────────────────────────────────

#[test]
fn new_tag_sets_will_publishes_scan_and_opens_latch() {
    let config = SystemConfig::default();
    let bus = RefCell::new(RecordingBus::connected());
    let latch = RefCell::new(MockLatch::default());
    let session = Session::new();
    let reader = MockReader {
        arriving: [0x007B_3CD2].into(),
        in_field: None,
    };
    let mut task = RfidListener::new(reader, MockLed::default(), &bus, &latch, &session, &config.topics);
    let schedule = Schedule::idle();

    task.run(&schedule, 0);

    let bus = bus.borrow();
    let scan = bus.last().unwrap();
    assert_eq!(scan.topic, "comps/arduino/stream");
    assert_eq!(scan.json["status"], status_code(Status::Scan));
    assert_eq!(scan.json["RFID"], "7b3cd2");
    assert_eq!(scan.json["message"], "new tag scanned");

    let will = bus.will.as_ref().unwrap();
    assert_eq!(will.topic, "comps/arduino/will");
    assert_eq!(will.json["status"], status_code(Status::Disconnect));
    assert_eq!(will.json["RFID"], "7b3cd2");

    assert!(latch.borrow().open);
    assert!(task.led().lit);
    assert_eq!(session.latest_tag().as_str(), "7b3cd2");
}

#[test]
fn startup_will_is_replaced_by_first_scan() {
    let config = SystemConfig::default();
    let bus = RefCell::new(RecordingBus::default());
    set_disconnect_will(&mut *bus.borrow_mut(), &config.topics, "").unwrap();
    {
        let b = bus.borrow();
        let will = b.will.as_ref().unwrap();
        assert_eq!(will.topic, "comps/arduino/will");
        assert_eq!(will.json["status"], status_code(Status::Disconnect));
        assert_eq!(will.json["RFID"], "");
        assert_eq!(will.json["slots"], "");
    }

    bus.borrow_mut().connected = true;
    let latch = RefCell::new(MockLatch::default());
    let session = Session::new();
    let reader = MockReader {
        arriving: [0x0000_00A1].into(),
        in_field: None,
    };
    let mut task = RfidListener::new(reader, MockLed::default(), &bus, &latch, &session, &config.topics);
    task.run(&Schedule::idle(), 0);
    assert_eq!(bus.borrow().will.as_ref().unwrap().json["RFID"], "a1");
}

#[test]
fn log_bus_carries_startup_will_and_server_commands() {
    let config = SystemConfig::default();
    let bus = RefCell::new(LogBus::new(&config.client_id, &config.topics));
    set_disconnect_will(&mut *bus.borrow_mut(), &config.topics, "").unwrap();
    bus.borrow_mut().connect().unwrap();

    let latch = RefCell::new(MockLatch::default());
    let session = Session::new();
    let mut pump = BusPump::new(&bus, &latch, &session, &config.topics);
    bus.borrow_mut()
        .inject("comps/server/stream", br#"{"message":"opening the door","status":5}"#);
    pump.run(&Schedule::idle(), 0);
    assert!(latch.borrow().open);

    bus.borrow_mut().drop_session();
    let b = bus.borrow();
    let (topic, payload) = b.will().unwrap();
    assert_eq!(topic, "comps/arduino/will");
    let will: serde_json::Value = serde_json::from_slice(payload).unwrap();
    assert_eq!(will["status"], status_code(Status::Disconnect));
    assert_eq!(will["RFID"], "");
}

#[test]
fn led_follows_tag_presence() {
    let config = SystemConfig::default();
    let bus = RefCell::new(RecordingBus::connected());
    let latch = RefCell::new(MockLatch::default());
    let session = Session::new();
    let mut task = RfidListener::new(
        MockReader::default(),
        MockLed::default(),
        &bus,
        &latch,
        &session,
        &config.topics,
    );
    let schedule = Schedule::idle();

    task.run(&schedule, 0);
    assert!(!task.led().lit);

    task.reader_mut().in_field = Some(7);
    task.run(&schedule, 10_000);
    assert!(task.led().lit);
    // Present but not new: nothing published.
    assert!(bus.borrow().published.is_empty());
}

#[test]
fn scan_with_bus_down_still_opens_latch() {
    let config = SystemConfig::default();
    let bus = RefCell::new(RecordingBus::default());
    let latch = RefCell::new(MockLatch::default());
    let session = Session::new();
    let reader = MockReader {
        arriving: [42].into(),
        in_field: None,
    };
    let mut task = RfidListener::new(reader, MockLed::default(), &bus, &latch, &session, &config.topics);

    task.run(&Schedule::idle(), 0);

    assert!(bus.borrow().published.is_empty());
    assert!(latch.borrow().open);
    assert_eq!(session.latest_tag().as_str(), "2a");
}

// ── Slots ─────────────────────────────────────────────────────

#[test]
fn slot_changes_publish_place_then_take_with_latest_tag() {
    let config = SystemConfig::default();
    let bus = RefCell::new(RecordingBus::connected());
    let session = Session::new();
    session.set_latest_tag(0xBEEF);
    let matrix = MockMatrix {
        occupied: occupied(&[(0, 0), (3, 4)]),
        ..MockMatrix::default()
    };
    let mut task = SlotScanner::new(matrix, &bus, &session, &config.topics);
    let schedule = Schedule::idle();

    task.run(&schedule, 0);
    {
        let bus = bus.borrow();
        assert_eq!(bus.statuses(), vec![status_code(Status::Place)]);
        assert_eq!(bus.last().unwrap().json["slots"], "r1c1;r2c5;");
        assert_eq!(bus.last().unwrap().json["RFID"], "beef");
    }

    // Unchanged: silent.
    task.run(&schedule, 500_000);
    assert_eq!(bus.borrow().published.len(), 1);

    task.matrix_mut().occupied = occupied(&[(3, 4), (5, 2)]);
    task.run(&schedule, 1_000_000);
    let bus = bus.borrow();
    assert_eq!(
        bus.statuses(),
        vec![status_code(Status::Place), status_code(Status::Place), status_code(Status::Take)]
    );
    assert_eq!(bus.published[1].json["slots"], "r2c13;");
    assert_eq!(bus.published[2].json["slots"], "r1c1;");
    assert_eq!(task.occupied(), occupied(&[(3, 4), (5, 2)]));
}

#[test]
fn failed_scan_keeps_previous_state() {
    let config = SystemConfig::default();
    let bus = RefCell::new(RecordingBus::connected());
    let session = Session::new();
    let matrix = MockMatrix {
        occupied: occupied(&[(1, 1)]),
        ..MockMatrix::default()
    };
    let mut task = SlotScanner::new(matrix, &bus, &session, &config.topics);
    let schedule = Schedule::idle();
    task.run(&schedule, 0);

    task.matrix_mut().occupied = SlotSet::EMPTY;
    task.matrix_mut().fail_row = Some(2);
    task.run(&schedule, 500_000);

    assert_eq!(bus.borrow().published.len(), 1);
    assert_eq!(task.occupied(), occupied(&[(1, 1)]));
    assert_eq!(task.matrix_mut().selected, None);
}

// ── Inbound ───────────────────────────────────────────────────

#[test]
fn server_commands_drive_latch_and_flags() {
    let config = SystemConfig::default();
    let bus = RefCell::new(RecordingBus::connected());
    let latch = RefCell::new(MockLatch::default());
    let session = Session::new();
    let mut pump = BusPump::new(&bus, &latch, &session, &config.topics);
    let schedule = Schedule::idle();

    {
        let mut b = bus.borrow_mut();
        b.push_inbound("comps/server/stream", r#"{"message":"opening the door","status":5}"#);
        b.push_inbound("comps/server/stream", r#"{"status":7}"#);
        b.push_inbound("comps/server/will", r#"{"status":4}"#);
    }

    pump.run(&schedule, 0);
    assert!(latch.borrow().open);
    pump.run(&schedule, 10_000);
    assert!(session.server_error());
    pump.run(&schedule, 20_000);
    assert!(session.server_connected());

    bus.borrow_mut().push_inbound("comps/server/stream", r#"{"status":8}"#);
    bus.borrow_mut().push_inbound("comps/server/will", r#"{"status":3}"#);
    pump.run(&schedule, 30_000);
    pump.run(&schedule, 40_000);
    assert!(!session.server_error());
    assert!(!session.server_connected());
}

#[test]
fn foreign_topics_and_garbage_are_ignored() {
    let config = SystemConfig::default();
    let bus = RefCell::new(RecordingBus::connected());
    let latch = RefCell::new(MockLatch::default());
    let session = Session::new();
    let mut pump = BusPump::new(&bus, &latch, &session, &config.topics);
    let schedule = Schedule::idle();

    bus.borrow_mut().push_inbound("comps/arduino/stream", r#"{"status":5}"#);
    bus.borrow_mut().push_inbound("comps/server/stream", "{not json");
    bus.borrow_mut().push_inbound("comps/server/stream", r#"{"status":6}"#);
    for t in 0..3 {
        pump.run(&schedule, t * 10_000);
    }

    assert!(latch.borrow().history.is_empty());
    assert!(bus.borrow().inbound.is_empty());
}

// ── Link recovery ─────────────────────────────────────────────

#[test]
fn broker_reconnects_with_backoff_under_scheduler() {
    let clock = ManualClock::new(0);
    let bus = RefCell::new(RecordingBus {
        refuse_connect: true,
        ..RecordingBus::default()
    });
    let mut monitor = LinkMonitor::new(&bus, 10_000, 2_000, 60_000);
    let schedule = Schedule::new(monitor.period());
    let mut scheduler: Scheduler<'_, &ManualClock> = Scheduler::new(&clock);
    scheduler.register("broker", &schedule, &mut monitor).unwrap();

    // Attempts at 10 s, 12 s, 16 s, 24 s; next due at 40 s.
    let mut attempts_at = Vec::new();
    for step in 0..=300u32 {
        clock.set(step * 100_000);
        let before = bus.borrow().connects;
        scheduler.run_once();
        if bus.borrow().connects != before {
            attempts_at.push(step * 100);
        }
    }
    assert_eq!(attempts_at, vec![10_000, 12_000, 16_000, 24_000]);
    assert_eq!(schedule.period(), Period::from_ms(16_000));

    bus.borrow_mut().refuse_connect = false;
    for step in 301..=450u32 {
        clock.set(step * 100_000);
        scheduler.run_once();
    }
    assert!(bus.borrow().connected);
    assert_eq!(bus.borrow().connects, 5);
    assert_eq!(schedule.period(), Period::from_ms(10_000));
}
