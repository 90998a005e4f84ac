//! Node configuration parameters
//!
//! All tunable parameters for the railgate node.  Defaults carry the
//! deployment values; the store credential and WiFi secrets are never
//! compiled in and must be provisioned into NVS before the node can talk
//! to the remote store.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Capacity of the store base URL.
pub const BASE_URL_CAP: usize = 96;
/// Capacity of the store credential.
pub const CREDENTIAL_CAP: usize = 64;
/// Capacity of a remote document path.
pub const PATH_CAP: usize = 32;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Remote store ---
    /// Store root, including scheme and trailing slash.
    pub store_base_url: String<BASE_URL_CAP>,
    /// Credential sent as the `auth` query parameter on every call.
    pub store_credential: String<CREDENTIAL_CAP>,

    // --- Document paths ---
    pub gps_path: String<PATH_CAP>,
    pub light_path: String<PATH_CAP>,
    pub alarm_path: String<PATH_CAP>,
    pub position_path: String<PATH_CAP>,

    // --- WiFi ---
    pub wifi_ssid: String<32>,
    pub wifi_password: String<64>,

    // --- Timing ---
    /// Command reconciler poll period (milliseconds)
    pub poll_interval_ms: u32,
    /// Telemetry publish period (seconds)
    pub telemetry_interval_secs: u32,
    /// HTTP request timeout (milliseconds)
    pub http_timeout_ms: u32,

    // --- Sweep profile ---
    /// Angle of the actuator when the position command is inactive.
    pub sweep_rest_deg: i16,
    /// Angle of the actuator when the position command is active.
    pub sweep_active_deg: i16,
    /// End of the retract sweep (past the rest angle).
    pub sweep_retract_end_deg: i16,
    /// Increment per sweep step (degrees, > 0)
    pub sweep_step_deg: i16,
    /// Delay after each sweep step (milliseconds)
    pub sweep_step_delay_ms: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            store_base_url: fixed("https://smart-railway-1d2fd-default-rtdb.firebaseio.com/"),
            store_credential: String::new(),

            gps_path: fixed("gps"),
            light_path: fixed("led/led1"),
            alarm_path: fixed("buzzer/buzzer1"),
            position_path: fixed("servo/servo1"),

            wifi_ssid: String::new(),
            wifi_password: String::new(),

            // Timing
            poll_interval_ms: 1000,     // 1 Hz
            telemetry_interval_secs: 10,
            http_timeout_ms: 5000,

            // Sweep: 0 → 90 forward, 90 → -90 retract, 5° every 100 ms
            sweep_rest_deg: 0,
            sweep_active_deg: 90,
            sweep_retract_end_deg: -90,
            sweep_step_deg: 5,
            sweep_step_delay_ms: 100,
        }
    }
}

impl NodeConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.store_base_url.starts_with("https://") || self.store_base_url.starts_with("http://")) {
            return Err(ConfigError::ValidationFailed(
                "store_base_url must start with http:// or https://",
            ));
        }
        if !self.store_base_url.ends_with('/') {
            return Err(ConfigError::ValidationFailed(
                "store_base_url must end with '/'",
            ));
        }
        if !is_url_safe(&self.store_credential) {
            return Err(ConfigError::ValidationFailed(
                "store_credential must be URL-safe ASCII",
            ));
        }
        for path in [
            &self.gps_path,
            &self.light_path,
            &self.alarm_path,
            &self.position_path,
        ] {
            if path.is_empty() || path.starts_with('/') || !is_url_safe(path) {
                return Err(ConfigError::ValidationFailed(
                    "document paths must be non-empty, relative and URL-safe",
                ));
            }
        }
        if !(100..=60_000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be 100–60000",
            ));
        }
        if !(1..=3600).contains(&self.telemetry_interval_secs) {
            return Err(ConfigError::ValidationFailed(
                "telemetry_interval_secs must be 1–3600",
            ));
        }
        if !(500..=30_000).contains(&self.http_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "http_timeout_ms must be 500–30000",
            ));
        }
        if !(1..=90).contains(&self.sweep_step_deg) {
            return Err(ConfigError::ValidationFailed(
                "sweep_step_deg must be 1–90",
            ));
        }
        if self.sweep_step_delay_ms > 2000 {
            return Err(ConfigError::ValidationFailed(
                "sweep_step_delay_ms must be 0–2000",
            ));
        }
        if self.sweep_active_deg <= self.sweep_rest_deg {
            return Err(ConfigError::ValidationFailed(
                "sweep_active_deg must be above sweep_rest_deg",
            ));
        }
        if self.sweep_retract_end_deg > self.sweep_rest_deg {
            return Err(ConfigError::ValidationFailed(
                "sweep_retract_end_deg must not be above sweep_rest_deg",
            ));
        }
        Ok(())
    }

    /// Whether a store credential has been provisioned.
    pub fn has_credential(&self) -> bool {
        !self.store_credential.is_empty()
    }
}

/// Characters allowed verbatim in a URL path segment or query value.
fn is_url_safe(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~' | b'/'))
}

fn fixed<const N: usize>(s: &str) -> String<N> {
    debug_assert!(s.len() <= N, "default exceeds String<{}>", N);
    let mut out = String::new();
    let _ = out.push_str(s);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(NodeConfig::default().validate().is_ok());
    }

    #[test]
    fn default_has_no_credential() {
        let c = NodeConfig::default();
        assert!(!c.has_credential());
        assert!(c.wifi_ssid.is_empty());
    }

    #[test]
    fn default_sweep_matches_deployment() {
        let c = NodeConfig::default();
        assert_eq!(c.sweep_rest_deg, 0);
        assert_eq!(c.sweep_active_deg, 90);
        assert_eq!(c.sweep_retract_end_deg, -90);
        assert_eq!(c.sweep_step_deg, 5);
        assert_eq!(c.sweep_step_delay_ms, 100);
    }

    #[test]
    fn timing_ratios_make_sense() {
        let c = NodeConfig::default();
        assert!(
            c.poll_interval_ms < c.telemetry_interval_secs * 1000,
            "command polling should be faster than telemetry"
        );
    }

    #[test]
    fn rejects_zero_step() {
        let c = NodeConfig {
            sweep_step_deg: 0,
            ..NodeConfig::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn rejects_credential_with_query_chars() {
        let mut c = NodeConfig::default();
        c.store_credential.push_str("abc&x=1").unwrap();
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_absolute_path() {
        let mut c = NodeConfig::default();
        c.gps_path.clear();
        c.gps_path.push_str("/gps").unwrap();
        assert!(c.validate().is_err());
    }

    #[test]
    fn postcard_roundtrip() {
        let mut c = NodeConfig::default();
        c.store_credential.push_str("token-123").unwrap();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: NodeConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c, c2);
    }
}
