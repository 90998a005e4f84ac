//! Hobby-servo driver over any `embedded-hal` PWM channel.
//!
//! The channel must run at 50 Hz (20 ms frame).  Angles map linearly onto
//! the pulse width: 1000 µs at 0°, 1500 µs at 90°, 2000 µs at 180°.  The
//! driver accepts [-90°, 180°]; below zero the pulse keeps shrinking (500 µs
//! at -90°), which the retract sweep relies on.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives an LEDC channel from `hw_init`.
//! On host/test: any `SetDutyCycle` fake.

use embedded_hal::pwm::SetDutyCycle;

use crate::error::ActuatorError;

pub const MIN_ANGLE: i16 = -90;
pub const MAX_ANGLE: i16 = 180;

const PERIOD_US: u32 = 20_000;
const ZERO_PULSE_US: i32 = 1000;
/// Pulse-width change across 180°.
const SPAN_US: i32 = 1000;

/// Pulse width for an in-range angle.
pub fn pulse_us(angle: i16) -> u32 {
    let angle = angle.clamp(MIN_ANGLE, MAX_ANGLE) as i32;
    (ZERO_PULSE_US + angle * SPAN_US / 180) as u32
}

/// Duty value for `pulse` at a channel whose full scale is `max_duty`.
pub fn duty_for(pulse: u32, max_duty: u16) -> u16 {
    let duty = pulse as u64 * max_duty as u64 / PERIOD_US as u64;
    duty.min(max_duty as u64) as u16
}

pub struct Servo<P: SetDutyCycle> {
    pwm: P,
    angle: Option<i16>,
}

impl<P: SetDutyCycle> Servo<P> {
    pub fn new(pwm: P) -> Self {
        Self { pwm, angle: None }
    }

    /// Move to `angle` degrees.  Out-of-range angles are rejected without
    /// touching the output.
    pub fn set_angle(&mut self, angle: i16) -> Result<(), ActuatorError> {
        if !(MIN_ANGLE..=MAX_ANGLE).contains(&angle) {
            return Err(ActuatorError::AngleOutOfRange(angle));
        }
        let duty = duty_for(pulse_us(angle), self.pwm.max_duty_cycle());
        self.pwm
            .set_duty_cycle(duty)
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        self.angle = Some(angle);
        Ok(())
    }

    /// Stop driving pulses; the horn is left unpowered where it is.
    pub fn release(&mut self) -> Result<(), ActuatorError> {
        self.pwm
            .set_duty_cycle_fully_off()
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        self.angle = None;
        Ok(())
    }

    /// Last angle successfully written, `None` before the first write or
    /// after [`release`](Self::release).
    pub fn angle(&self) -> Option<i16> {
        self.angle
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }
}
