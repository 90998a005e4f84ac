//! Monotonic uptime for supervisor status lines.
//!
//! - **`target_os = "espidf"`** — wraps `esp_timer_get_time()` (µs since
//!   boot, unaffected by SNTP adjustments).
//! - **`not(target_os = "espidf")`** — `std::time::Instant` from construction.

pub struct Uptime {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Uptime {
    fn default() -> Self {
        Self::new()
    }
}

impl Uptime {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Seconds since boot.
    pub fn secs(&self) -> u64 {
        self.micros() / 1_000_000
    }

    #[cfg(target_os = "espidf")]
    pub fn micros(&self) -> u64 {
        // SAFETY: read-only query of the high-resolution timer.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}
