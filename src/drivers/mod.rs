//! Output drivers, hardware initialisation, and the task watchdog.

pub mod digital_out;
pub mod hw_init;
pub mod servo;
pub mod watchdog;
