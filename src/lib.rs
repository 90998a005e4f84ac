//! Railgate node firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod health;
pub mod scheduler;
pub mod store;

pub mod pins;

// Hardware-facing modules; ESP-IDF implementations are cfg-gated inside,
// with simulation backends on the host.
pub mod adapters;
pub mod drivers;
pub mod sensors;

mod esp_link_shims;
