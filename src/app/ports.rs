//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Reconciler / TelemetryPublisher (domain)
//! ```
//!
//! Driven adapters (HTTP transport, actuators, GPS, event sinks, storage)
//! implement these traits.  The domain consumes them via generics, so the
//! core never touches hardware or sockets directly.
//!
//! ## Security notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - URLs handed to an [`HttpTransport`] carry the store credential; adapters
//!   must not log them verbatim.

use core::future::Future;
use core::time::Duration;

use serde::Serialize;

use crate::config::NodeConfig;
use crate::error::{ActuatorError, StoreError};

use super::events::NodeEvent;
use super::model::LocationSample;

// ───────────────────────────────────────────────────────────────
// Remote store port (domain → document store)
// ───────────────────────────────────────────────────────────────

/// The two calls the domain makes against the remote document store.
pub trait StorePort {
    /// Read a boolean flag stored at `path`.
    fn get_bool(&mut self, path: &str) -> Result<bool, StoreError>;

    /// Overwrite `path` with `fields`, serialised as a flat JSON object.
    fn put_json<T: Serialize>(&mut self, path: &str, fields: &T) -> Result<(), StoreError>;
}

// ───────────────────────────────────────────────────────────────
// HTTP transport (store client → wire)
// ───────────────────────────────────────────────────────────────

/// Request methods the store client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

/// Status and body length of a completed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    /// Bytes of body written to the caller's buffer.
    pub len: usize,
    /// The body did not fit the caller's buffer.  It was read to the end
    /// and discarded, so `len` bytes are not a usable prefix.
    pub overflowed: bool,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failures.  Status codes and oversized bodies are not
/// faults; both come back in [`HttpReply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpFault {
    Connect,
    Io,
    Timeout,
}

/// One request/response round trip.  Implementations open and release
/// their own connection per call.
pub trait HttpTransport {
    /// Send `body` (if any) with `method` to `url` and copy the response
    /// body into `response`.  The whole body is always consumed; one that
    /// does not fit sets [`HttpReply::overflowed`].
    fn exchange(
        &mut self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
        response: &mut [u8],
    ) -> Result<HttpReply, HttpFault>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the reconciler calls this to command outputs.
pub trait ActuatorPort {
    /// Drive the indicator light output.
    fn set_light(&mut self, on: bool);

    /// Drive the audible alarm output.
    fn set_alarm(&mut self, on: bool);

    /// Command the positional actuator to an absolute angle.
    fn set_angle(&mut self, degrees: i16) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Location port (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the location sensor.
pub trait LocationPort {
    /// Latest sample, or [`LocationSample::NO_FIX`] when there is no fix.
    fn read_sample(&mut self) -> LocationSample;
}

// ───────────────────────────────────────────────────────────────
// Link readiness (connectivity provider → loops)
// ───────────────────────────────────────────────────────────────

/// Read-only view of the network link.
pub trait LinkPort {
    fn is_up(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Cooperative delay (domain → executor)
// ───────────────────────────────────────────────────────────────

/// Suspension point used by the loops and the sweep.  Implementations
/// must yield to the executor rather than spin.
pub trait DelayPort {
    fn sleep(&mut self, duration: Duration) -> impl Future<Output = ()>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / reporting)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`NodeEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &NodeEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists node configuration.
///
/// # Security
///
/// Implementations MUST call [`NodeConfig::validate`] before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`], not
/// silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`NodeConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<NodeConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &NodeConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
