//! GPIO / peripheral pin assignments for the slotkeeper cabinet board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  `main.rs` hands the matching `esp-idf-hal`
//! peripherals to the drivers; keep the two in step.

// ---------------------------------------------------------------------------
// Slot switch matrix (rows driven low one at a time, columns pulled up)
// ---------------------------------------------------------------------------

pub const SLOT_ROW_GPIOS: [i32; 6] = [2, 3, 4, 5, 6, 7];
pub const SLOT_COL_GPIOS: [i32; 5] = [8, 9, 10, 11, 12];

// ---------------------------------------------------------------------------
// RDM6300 125 kHz RFID reader (UART, 9600 8N1, RX only)
// ---------------------------------------------------------------------------

pub const RFID_RX_GPIO: i32 = 0;
pub const RFID_BAUD: u32 = 9_600;

// ---------------------------------------------------------------------------
// Door
// ---------------------------------------------------------------------------

/// Latch servo signal (LEDC PWM).
pub const LATCH_SERVO_GPIO: i32 = 14;
/// Servo frame rate.
pub const SERVO_PWM_FREQ_HZ: u32 = 50;
/// LEDC timer resolution (bits).  14-bit gives ~1.2 µs steps at 50 Hz.
pub const SERVO_PWM_RESOLUTION_BITS: u32 = 14;

/// Door reed switch, active-low with the internal pull-up.
pub const DOOR_SWITCH_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// Status LED (lit while a tag is in the reader field)
// ---------------------------------------------------------------------------

pub const TAG_LED_GPIO: i32 = 13;
