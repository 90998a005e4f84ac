//! Application core — pure domain logic, zero I/O.
//!
//! The command reconciler, the sweep state machine and the telemetry
//! publisher live here.  All interaction with the network and hardware
//! happens through **port traits** defined in [`ports`], keeping this layer
//! fully testable without real peripherals or a live store.

pub mod events;
pub mod model;
pub mod ports;
pub mod reconciler;
pub mod sweep;
pub mod telemetry;
