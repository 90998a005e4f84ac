//! NEO-6M style GPS receiver on UART1, NMEA `RMC` sentences.
//!
//! Only the recommended-minimum sentence is decoded.  Everything else the
//! module emits (GGA, GSV, ...) is skipped.  A sentence must carry a valid
//! checksum and status `A`; a void (`V`) fix yields
//! [`LocationSample::NO_FIX`].
//!
//! ## Dual-target design
//!
//! On ESP-IDF: raw UART driver, input flushed before each read so the
//! sample is current, then chunked reads until an RMC line completes.
//! On host/test: sentences are queued with [`GpsReader::sim_push_sentence`].

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

use heapless::String;
use log::debug;
#[cfg(target_os = "espidf")]
use log::{info, warn};

use crate::app::model::LocationSample;
use crate::app::ports::LocationPort;
use crate::drivers::hw_init::HwInitError;
use crate::error::SensorError;
#[cfg(target_os = "espidf")]
use crate::pins;

/// NMEA caps a sentence at 82 characters including `$` and CRLF.
const LINE_CAP: usize = 96;

/// Reads without a fresh RMC before the cached fix is dropped.
const STALE_AFTER: u8 = 3;

#[cfg(target_os = "espidf")]
const RX_BUFFER_SIZE: i32 = 1024;
#[cfg(target_os = "espidf")]
const CHUNK_TIMEOUT_MS: u32 = 100;
/// One RMC per second at the module's default rate, plus slack.
#[cfg(target_os = "espidf")]
const READ_WINDOW_MS: u32 = 1500;

// ───────────────────────────────────────────────────────────────
// Sentence parsing
// ───────────────────────────────────────────────────────────────

/// XOR of every byte between `$` and `*`.
pub fn nmea_checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

/// `true` for any talker's RMC sentence (`$GPRMC`, `$GNRMC`, ...).
pub fn is_rmc(line: &str) -> bool {
    line.len() >= 6 && line.starts_with('$') && line.get(3..6) == Some("RMC")
}

/// Decode one RMC sentence.  Trailing CR/LF is ignored.
pub fn parse_rmc(line: &str) -> Result<LocationSample, SensorError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let rest = line.strip_prefix('$').ok_or(SensorError::Malformed)?;
    let (body, sum) = rest.split_once('*').ok_or(SensorError::Malformed)?;
    if sum.len() != 2 || !sum.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SensorError::Malformed);
    }
    let expected = u8::from_str_radix(sum, 16).map_err(|_| SensorError::Malformed)?;
    if nmea_checksum(body) != expected {
        return Err(SensorError::BadChecksum);
    }

    let mut fields = body.split(',');
    let tag = fields.next().ok_or(SensorError::Malformed)?;
    if tag.len() != 5 || !tag.ends_with("RMC") {
        return Err(SensorError::Malformed);
    }
    let _time = fields.next().ok_or(SensorError::Malformed)?;
    match fields.next() {
        Some("A") => {}
        Some("V") => return Ok(LocationSample::NO_FIX),
        _ => return Err(SensorError::Malformed),
    }

    let lat = fields.next().ok_or(SensorError::Malformed)?;
    let ns = fields.next().ok_or(SensorError::Malformed)?;
    let lon = fields.next().ok_or(SensorError::Malformed)?;
    let ew = fields.next().ok_or(SensorError::Malformed)?;

    let latitude = match ns {
        "N" => degrees(lat, 90.0)?,
        "S" => -degrees(lat, 90.0)?,
        _ => return Err(SensorError::Malformed),
    };
    let longitude = match ew {
        "E" => degrees(lon, 180.0)?,
        "W" => -degrees(lon, 180.0)?,
        _ => return Err(SensorError::Malformed),
    };
    Ok(LocationSample::new(latitude, longitude))
}

/// `[d]ddmm.mmmm` → decimal degrees.
fn degrees(field: &str, limit: f64) -> Result<f64, SensorError> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(SensorError::Malformed);
    }
    let raw: f64 = field.parse().map_err(|_| SensorError::Malformed)?;
    let whole = (raw / 100.0).trunc();
    let minutes = raw - whole * 100.0;
    if minutes >= 60.0 {
        return Err(SensorError::Malformed);
    }
    let value = whole + minutes / 60.0;
    if value > limit {
        return Err(SensorError::Malformed);
    }
    Ok(value)
}

// ───────────────────────────────────────────────────────────────
// Reader
// ───────────────────────────────────────────────────────────────

pub struct GpsReader {
    line: String<LINE_CAP>,
    /// Dropping bytes until the next `$` (start-up or overlong line).
    discarding: bool,
    last: LocationSample,
    stale_reads: u8,
    #[cfg(target_os = "espidf")]
    port: i32,
    #[cfg(not(target_os = "espidf"))]
    pending: VecDeque<u8>,
}

impl GpsReader {
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self, HwInitError> {
        use esp_idf_svc::sys::*;

        let port = pins::GPS_UART_PORT;
        let cfg = uart_config_t {
            baud_rate: pins::GPS_BAUD,
            data_bits: uart_word_length_t_UART_DATA_8_BITS,
            parity: uart_parity_t_UART_PARITY_DISABLE,
            stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
            flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
            ..Default::default()
        };
        // SAFETY: called once from main() before the telemetry loop owns the port.
        unsafe {
            let ret = uart_driver_install(port, RX_BUFFER_SIZE, 0, 0, core::ptr::null_mut(), 0);
            if ret != ESP_OK as i32 { return Err(HwInitError::UartInitFailed(ret)); }
            let ret = uart_param_config(port, &cfg);
            if ret != ESP_OK as i32 { return Err(HwInitError::UartInitFailed(ret)); }
            let ret = uart_set_pin(port, pins::GPS_UART_TX_GPIO, pins::GPS_UART_RX_GPIO, -1, -1);
            if ret != ESP_OK as i32 { return Err(HwInitError::UartInitFailed(ret)); }
        }
        info!(
            "GPS: UART{} ready (tx={}, rx={}, {} baud)",
            port, pins::GPS_UART_TX_GPIO, pins::GPS_UART_RX_GPIO, pins::GPS_BAUD
        );
        Ok(Self::with_state(port))
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, HwInitError> {
        log::info!("GPS(sim): scripted sentences");
        Ok(Self {
            line: String::new(),
            discarding: true,
            last: LocationSample::NO_FIX,
            stale_reads: 0,
            pending: VecDeque::new(),
        })
    }

    #[cfg(target_os = "espidf")]
    fn with_state(port: i32) -> Self {
        Self {
            line: String::new(),
            discarding: true,
            last: LocationSample::NO_FIX,
            stale_reads: 0,
            port,
        }
    }

    /// Simulation: queue one sentence as the module would send it.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_push_sentence(&mut self, sentence: &str) {
        self.pending.extend(sentence.bytes());
        self.pending.extend(b"\r\n");
    }

    /// Simulation: queue raw bytes (partial lines, noise).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_push_bytes(&mut self, bytes: &[u8]) {
        self.pending.extend(bytes);
    }

    /// Assemble lines from `bytes`.  Returns `true` once an RMC sentence
    /// has been decoded into `last`.
    fn feed(&mut self, bytes: &[u8]) -> bool {
        let mut fresh = false;
        for &b in bytes {
            match b {
                b'$' => {
                    self.line.clear();
                    self.discarding = false;
                    let _ = self.line.push('$');
                }
                b'\n' => {
                    if !self.discarding && self.complete_line() {
                        fresh = true;
                    }
                    self.line.clear();
                    self.discarding = true;
                }
                b'\r' => {}
                _ if self.discarding => {}
                _ => {
                    if !b.is_ascii() || self.line.push(b as char).is_err() {
                        self.line.clear();
                        self.discarding = true;
                    }
                }
            }
        }
        fresh
    }

    fn complete_line(&mut self) -> bool {
        if !is_rmc(&self.line) {
            return false;
        }
        match parse_rmc(&self.line) {
            Ok(sample) => {
                self.last = sample;
                true
            }
            Err(e) => {
                debug!("GPS: dropped sentence ({})", e);
                false
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn collect(&mut self) -> bool {
        use esp_idf_svc::sys::*;

        let mut buf = [0u8; 128];
        let ticks = (CHUNK_TIMEOUT_MS * configTICK_RATE_HZ / 1000).max(1);
        // SAFETY: the driver was installed in new(); this reader is the only user.
        unsafe {
            uart_flush_input(self.port);
        }
        self.line.clear();
        self.discarding = true;

        for _ in 0..READ_WINDOW_MS / CHUNK_TIMEOUT_MS {
            let n = unsafe {
                uart_read_bytes(self.port, buf.as_mut_ptr().cast(), buf.len() as u32, ticks)
            };
            if n < 0 {
                warn!("GPS: {}", SensorError::UartReadFailed);
                return false;
            }
            if self.feed(&buf[..n as usize]) {
                return true;
            }
        }
        false
    }

    #[cfg(not(target_os = "espidf"))]
    fn collect(&mut self) -> bool {
        let bytes: Vec<u8> = self.pending.drain(..).collect();
        self.feed(&bytes)
    }
}

impl LocationPort for GpsReader {
    fn read_sample(&mut self) -> LocationSample {
        if self.collect() {
            self.stale_reads = 0;
        } else {
            self.stale_reads = self.stale_reads.saturating_add(1);
            if self.stale_reads >= STALE_AFTER && self.last.has_fix() {
                debug!("GPS: no RMC for {} reads, dropping cached fix", self.stale_reads);
                self.last = LocationSample::NO_FIX;
            }
        }
        self.last
    }
}
