//! GPIO / peripheral pin assignments for the railgate node.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Digital outputs
// ---------------------------------------------------------------------------

/// Indicator light (active HIGH).
pub const LIGHT_GPIO: i32 = 12;
/// Audible alarm / buzzer (active HIGH).
pub const ALARM_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// Positional actuator (hobby servo)
// ---------------------------------------------------------------------------

/// Servo signal line, driven by LEDC channel 0.
pub const SERVO_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Location sensor (NMEA GPS module on UART1)
// ---------------------------------------------------------------------------

pub const GPS_UART_PORT: i32 = 1;
pub const GPS_UART_TX_GPIO: i32 = 17;
pub const GPS_UART_RX_GPIO: i32 = 16;
pub const GPS_BAUD: i32 = 9600;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution for the servo (bits).  14-bit gives ~1.2 µs steps
/// at 50 Hz.
pub const SERVO_PWM_RESOLUTION_BITS: u32 = 14;
/// Servo frame rate (20 ms period).
pub const SERVO_PWM_FREQ_HZ: u32 = 50;
