//! Hardware adapter — bridges the output drivers to [`ActuatorPort`].
//!
//! Owns the light and alarm [`Switch`]es and the position [`Servo`].  This is
//! the only place the reconciler's commands reach real pins.  Generic over
//! the `embedded-hal` pin types so host tests can swap in fakes; on the
//! device the handles come from [`hw_init::init_peripherals`].
//!
//! [`hw_init::init_peripherals`]: crate::drivers::hw_init::init_peripherals

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::app::ports::ActuatorPort;
use crate::drivers::digital_out::Switch;
use crate::drivers::hw_init::{GpioOutput, LedcChannel, Peripherals};
use crate::drivers::servo::Servo;
use crate::error::ActuatorError;

/// Concrete adapter that combines all outputs behind [`ActuatorPort`].
pub struct HardwareAdapter<L: OutputPin, A: OutputPin, P: SetDutyCycle> {
    light: Switch<L>,
    alarm: Switch<A>,
    servo: Servo<P>,
    write_failures: u32,
}

/// The adapter as wired on the board.
pub type BoardHardware = HardwareAdapter<GpioOutput, GpioOutput, LedcChannel>;

impl BoardHardware {
    pub fn from_peripherals(p: Peripherals) -> Self {
        Self::new(p.light, p.alarm, p.servo)
    }
}

impl<L: OutputPin, A: OutputPin, P: SetDutyCycle> HardwareAdapter<L, A, P> {
    pub fn new(light: L, alarm: A, servo: P) -> Self {
        Self {
            light: Switch::new(light),
            alarm: Switch::new(alarm),
            servo: Servo::new(servo),
            write_failures: 0,
        }
    }

    pub fn light(&self) -> &Switch<L> {
        &self.light
    }

    pub fn alarm(&self) -> &Switch<A> {
        &self.alarm
    }

    pub fn servo(&self) -> &Servo<P> {
        &self.servo
    }

    /// GPIO writes that failed since boot.
    pub fn write_failures(&self) -> u32 {
        self.write_failures
    }

    fn note(&mut self, what: &str, result: Result<(), ActuatorError>) {
        if let Err(e) = result {
            self.write_failures = self.write_failures.saturating_add(1);
            warn!("Hardware: {} write failed ({})", what, e);
        }
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<L: OutputPin, A: OutputPin, P: SetDutyCycle> ActuatorPort for HardwareAdapter<L, A, P> {
    fn set_light(&mut self, on: bool) {
        let r = self.light.set(on);
        self.note("light", r);
    }

    fn set_alarm(&mut self, on: bool) {
        let r = self.alarm.set(on);
        self.note("alarm", r);
    }

    fn set_angle(&mut self, degrees: i16) -> Result<(), ActuatorError> {
        self.servo.set_angle(degrees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::hw_init::{init_peripherals, SERVO_MAX_DUTY};
    use crate::drivers::servo::{duty_for, pulse_us};

    #[test]
    fn board_adapter_drives_sim_outputs() {
        let mut hw = BoardHardware::from_peripherals(init_peripherals().unwrap());
        hw.set_light(true);
        hw.set_alarm(false);
        hw.set_angle(-90).unwrap();
        assert!(hw.light().pin().level());
        assert!(!hw.alarm().pin().level());
        assert_eq!(hw.servo().pwm().duty(), duty_for(pulse_us(-90), SERVO_MAX_DUTY));
        assert_eq!(hw.write_failures(), 0);
    }

    #[test]
    fn rejected_angle_is_reported_to_caller() {
        let mut hw = BoardHardware::from_peripherals(init_peripherals().unwrap());
        assert_eq!(hw.set_angle(270), Err(ActuatorError::AngleOutOfRange(270)));
        assert_eq!(hw.servo().angle(), None);
    }
}
