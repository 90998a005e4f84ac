//! Unified error types for the railgate firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level boot path's error handling uniform.  All variants are `Copy`
//! so they can be passed through loop reports and event sinks without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A remote store call failed.
    Store(StoreError),
    /// An actuator command was rejected.
    Actuator(ActuatorError),
    /// The location sensor could not be read.
    Sensor(SensorError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Remote store errors
// ---------------------------------------------------------------------------

/// Failure of a single remote store round trip.
///
/// Errors are local to the calling cycle: the caller logs them and moves
/// on.  Nothing in this enum is fatal to the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Connection failure, transport timeout, or a non-2xx status.
    Transport(TransportCause),
    /// The response body is not a recognised scalar (or a request body
    /// could not be serialised).
    Parse,
    /// The URL or the response body exceeds its fixed buffer.
    Allocation,
}

/// Why a [`StoreError::Transport`] happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCause {
    /// The connection could not be opened (DNS, TCP, TLS handshake).
    Connect,
    /// Read or write failed on an open connection.
    Io,
    /// The transport gave up waiting for the peer.
    Timeout,
    /// The server answered with a non-success status code.
    Status(u16),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(cause) => write!(f, "transport error ({cause})"),
            Self::Parse => write!(f, "unrecognised response body"),
            Self::Allocation => write!(f, "buffer capacity exceeded"),
        }
    }
}

impl fmt::Display for TransportCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect failed"),
            Self::Io => write!(f, "I/O failed"),
            Self::Timeout => write!(f, "timed out"),
            Self::Status(code) => write!(f, "HTTP {code}"),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Commanded angle is outside the servo's accepted range.
    AngleOutOfRange(i16),
    /// PWM duty-cycle write failed.
    PwmWriteFailed,
    /// GPIO set failed.
    GpioWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AngleOutOfRange(angle) => write!(f, "angle {angle}\u{00b0} out of range"),
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// UART read returned an error.
    UartReadFailed,
    /// Sentence failed its checksum.
    BadChecksum,
    /// Sentence is not a well-formed RMC record.
    Malformed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UartReadFailed => write!(f, "UART read failed"),
            Self::BadChecksum => write!(f, "NMEA checksum mismatch"),
            Self::Malformed => write!(f, "malformed NMEA sentence"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
