//! Slotkeeper firmware entry point.
//!
//! A single cooperative loop drives every task; the only asynchronous
//! context is the door-switch edge ISR.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   Adapters / drivers                         │
//! │  SystemClock  WifiAdapter  MqttBus  Rdm6300  ServoLatch      │
//! │  GpioMatrix   GpioInput (+ edge ISR)  Watchdog               │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │                                                              │
//! │  Scheduler ── door debouncer · RFID listener · slot scanner  │
//! │               bus pump · WiFi/broker link monitors · TWDT    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::cell::RefCell;

use anyhow::Result;
use esp_idf_hal::gpio::{AnyIOPin, IOPin, Input, OutputPin, PinDriver, Pull};
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution, config::TimerConfig};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartRxDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;
use log::{info, warn};

use slotkeeper::adapters::mqtt::MqttBus;
use slotkeeper::adapters::time::SystemClock;
use slotkeeper::adapters::wifi::WifiAdapter;
use slotkeeper::app::ports::{Connectivity, DoorLatch};
use slotkeeper::app::session::Session;
use slotkeeper::config::{Credentials, SystemConfig};
use slotkeeper::drivers::debouncer::{Callbacks, DebounceInput, Debouncer};
use slotkeeper::drivers::gpio::{GpioInput, attach_edge_isr};
use slotkeeper::drivers::matrix::GpioMatrix;
use slotkeeper::drivers::rdm6300::Rdm6300;
use slotkeeper::drivers::servo::ServoLatch;
use slotkeeper::drivers::watchdog::{self, Watchdog};
use slotkeeper::pins;
use slotkeeper::scheduler::{Period, Schedule, Scheduler};
use slotkeeper::tasks::bus_pump::BusPump;
use slotkeeper::tasks::set_disconnect_will;
use slotkeeper::tasks::link::LinkMonitor;
use slotkeeper::tasks::rfid::RfidListener;
use slotkeeper::tasks::slot_scan::SlotScanner;

/// Column input with the internal pull-up.
fn pulled_up(pin: AnyIOPin) -> Result<PinDriver<'static, AnyIOPin, Input>> {
    let mut driver = PinDriver::input(pin)?;
    driver.set_pull(Pull::Up)?;
    Ok(driver)
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Slotkeeper v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = SystemConfig::default();
    config.validate()?;
    let creds = Credentials::from_build_env();

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let io = peripherals.pins;

    // ── 2. Door latch ─────────────────────────────────────────
    let servo_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::new()
            .frequency(Hertz(pins::SERVO_PWM_FREQ_HZ))
            .resolution(Resolution::Bits14),
    )?;
    let servo = LedcDriver::new(peripherals.ledc.channel0, &servo_timer, io.gpio14)?;
    let latch = RefCell::new(ServoLatch::new(servo)?);
    info!(
        "Latch: servo on GPIO{} ({} Hz, {}-bit), closed",
        pins::LATCH_SERVO_GPIO,
        pins::SERVO_PWM_FREQ_HZ,
        pins::SERVO_PWM_RESOLUTION_BITS
    );

    // ── 3. Slot matrix ────────────────────────────────────────
    let rows = [
        PinDriver::output(io.gpio2.downgrade_output())?,
        PinDriver::output(io.gpio3.downgrade_output())?,
        PinDriver::output(io.gpio4.downgrade_output())?,
        PinDriver::output(io.gpio5.downgrade_output())?,
        PinDriver::output(io.gpio6.downgrade_output())?,
        PinDriver::output(io.gpio7.downgrade_output())?,
    ];
    let cols = [
        pulled_up(io.gpio8.downgrade())?,
        pulled_up(io.gpio9.downgrade())?,
        pulled_up(io.gpio10.downgrade())?,
        pulled_up(io.gpio11.downgrade())?,
        pulled_up(io.gpio12.downgrade())?,
    ];
    let matrix = GpioMatrix::new(rows, cols)?;
    info!(
        "Slots: rows {:?}, columns {:?}",
        pins::SLOT_ROW_GPIOS,
        pins::SLOT_COL_GPIOS
    );

    // ── 4. RFID reader + status LED ───────────────────────────
    let uart = UartRxDriver::new(
        peripherals.uart1,
        io.gpio0,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::new().baudrate(Hertz(pins::RFID_BAUD)),
    )?;
    let tag_led = PinDriver::output(io.gpio13)?;
    info!(
        "RFID: RDM6300 on GPIO{} @ {} baud, tag LED GPIO{}",
        pins::RFID_RX_GPIO,
        pins::RFID_BAUD,
        pins::TAG_LED_GPIO
    );

    // ── 5. Network links ──────────────────────────────────────
    let mut wifi_adapter = WifiAdapter::new(EspWifi::new(peripherals.modem, sysloop, Some(nvs))?);
    if creds.has_wifi() {
        wifi_adapter.set_credentials(&creds.wifi_ssid, &creds.wifi_pass)?;
    } else {
        warn!("WiFi: no credentials built in (set WIFI_SSID / WIFI_PASS)");
    }
    if let Err(e) = wifi_adapter.connect() {
        warn!("WiFi: initial connect failed: {}", e);
    }
    let wifi = RefCell::new(wifi_adapter);

    if creds.has_broker() {
        info!(
            "Broker: {}:{} as '{}' (user '{}')",
            creds.broker_host, creds.broker_port, config.client_id, creds.broker_user
        );
    } else {
        warn!("Broker: no host built in (set MQTT_HOST)");
    }
    let mut mqtt = MqttBus::new(&creds, &config.client_id, &config.topics);
    // No tag yet: the will announces the scanner itself going away.
    if let Err(e) = set_disconnect_will(&mut mqtt, &config.topics, "") {
        warn!("Broker: will setup failed: {}", e);
    }
    if let Err(e) = mqtt.connect() {
        warn!("Broker: initial connect failed: {}", e);
    }
    let bus = RefCell::new(mqtt);

    // ── 6. Tasks ──────────────────────────────────────────────
    let session = Session::new();

    let door: &'static DebounceInput<GpioInput> = Box::leak(Box::new(DebounceInput::new(
        GpioInput::new(pins::DOOR_SWITCH_GPIO),
        config.door_debounce(),
    )));
    let mut door_task = Debouncer::new(
        door,
        Callbacks {
            on_pressed: || info!("Door: opened"),
            on_released: |held_us: u32| {
                info!("Door: closed after {} ms", held_us / 1_000);
                if let Err(e) = latch.borrow_mut().set_open(false) {
                    warn!("Door: latch close failed: {}", e);
                }
            },
        },
    )
    .named("door");

    let mut rfid_task = RfidListener::new(
        Rdm6300::new(uart),
        tag_led,
        &bus,
        &latch,
        &session,
        &config.topics,
    );
    let mut slot_task = SlotScanner::new(matrix, &bus, &session, &config.topics);
    let mut pump_task = BusPump::new(&bus, &latch, &session, &config.topics);
    let mut wifi_task = LinkMonitor::new(
        &wifi,
        config.wifi_check_interval_ms,
        config.link_retry_min_ms,
        config.link_retry_max_ms,
    );
    let mut broker_task = LinkMonitor::new(
        &bus,
        config.broker_check_interval_ms,
        config.link_retry_min_ms,
        config.link_retry_max_ms,
    );
    let mut watchdog_task = Watchdog::new(watchdog::DEFAULT_TIMEOUT_MS);

    let rfid_schedule = Schedule::new(Period::from_ms(config.rfid_poll_interval_ms));
    let slot_schedule = Schedule::new(Period::from_ms(config.slot_scan_interval_ms));
    let pump_schedule = Schedule::new(Period::from_ms(config.bus_poll_interval_ms));
    let wifi_schedule = Schedule::new(wifi_task.period());
    let broker_schedule = Schedule::new(broker_task.period());
    let watchdog_schedule = Schedule::new(Period::from_ms(config.watchdog_feed_interval_ms));

    // ── 7. Scheduler ──────────────────────────────────────────
    let mut scheduler: Scheduler<'_, SystemClock> = Scheduler::new(SystemClock::new());
    door_task.initialize(&mut scheduler)?;
    attach_edge_isr(door)?;
    scheduler.register("rfid", &rfid_schedule, &mut rfid_task)?;
    scheduler.register("slots", &slot_schedule, &mut slot_task)?;
    scheduler.register("bus", &pump_schedule, &mut pump_task)?;
    scheduler.register("wifi", &wifi_schedule, &mut wifi_task)?;
    scheduler.register("broker", &broker_schedule, &mut broker_task)?;
    scheduler.register("watchdog", &watchdog_schedule, &mut watchdog_task)?;

    info!("Scheduler: {} tasks, entering main loop", scheduler.len());
    scheduler.run()
}
