//! Door latch servo.
//!
//! Standard hobby servo on a 50 Hz PWM channel: 544 µs pulse = 0°,
//! 2400 µs = 180°.  The latch is open at 0° and closed at 90°.

use embedded_hal::pwm::SetDutyCycle;
use log::info;

use crate::app::ports::DoorLatch;
use crate::error::{Error, Result};

pub const FRAME_US: u16 = 20_000;
pub const MIN_PULSE_US: u16 = 544;
pub const MAX_PULSE_US: u16 = 2_400;

pub const OPEN_ANGLE: u8 = 0;
pub const CLOSED_ANGLE: u8 = 90;

/// Pulse width for `angle` degrees, clamped to 180.
pub const fn pulse_us(angle: u8) -> u16 {
    let angle = if angle > 180 { 180 } else { angle as u32 };
    let span = (MAX_PULSE_US - MIN_PULSE_US) as u32;
    MIN_PULSE_US + (span * angle / 180) as u16
}

pub struct ServoLatch<P> {
    pwm: P,
    open: bool,
}

impl<P: SetDutyCycle> ServoLatch<P> {
    /// Takes the PWM channel and drives the latch closed.
    pub fn new(pwm: P) -> Result<Self> {
        let mut latch = Self { pwm, open: true };
        latch.set_open(false)?;
        Ok(latch)
    }

    pub fn write_angle(&mut self, angle: u8) -> Result<()> {
        self.pwm
            .set_duty_cycle_fraction(pulse_us(angle), FRAME_US)
            .map_err(|_| Error::Gpio(-1))
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }
}

impl<P: SetDutyCycle> DoorLatch for ServoLatch<P> {
    fn set_open(&mut self, open: bool) -> Result<()> {
        self.write_angle(if open { OPEN_ANGLE } else { CLOSED_ANGLE })?;
        if self.open != open {
            info!("Latch: {}", if open { "open" } else { "closed" });
        }
        self.open = open;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
