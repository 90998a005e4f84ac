//! On/off output driver (indicator light, buzzer).
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives a `hw_init::GpioOutput`.
//! On host/test: any `OutputPin` fake.

use embedded_hal::digital::{OutputPin, PinState};

use crate::error::ActuatorError;

pub struct Switch<P: OutputPin> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> Switch<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, on: false }
    }

    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.pin
            .set_state(PinState::from(on))
            .map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.on = on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}
