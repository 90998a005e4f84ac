//! Railgate Firmware — Main Entry Point
//!
//! Hexagonal architecture with two independent periodic loops.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   GpsReader      RemoteStore<HttpClient>      │
//! │  (ActuatorPort)    (LocationPort) (StorePort)                  │
//! │  LogEventSink      NvsAdapter     WifiAdapter / LinkSignal     │
//! │  (EventSink)       (ConfigPort)   (Connectivity / LinkPort)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌──────────────────────────┐   ┌──────────────────────────┐   │
//! │  │ Reconciler (APP core)    │   │ TelemetryPublisher (PRO) │   │
//! │  │ edge-triggered outputs   │   │ GPS → gps document       │   │
//! │  └──────────────────────────┘   └──────────────────────────┘   │
//! │                                                                │
//! │  Supervisor (main task): health · watchdog · WiFi reconnect    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::time::Duration;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_hal::peripherals::Peripherals as HalPeripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use railgate::adapters::delay::ReactorDelay;
use railgate::adapters::hardware::BoardHardware;
use railgate::adapters::http::HttpClient;
use railgate::adapters::log_sink::LogEventSink;
use railgate::adapters::nvs::NvsAdapter;
use railgate::adapters::time::Uptime;
use railgate::adapters::wifi::{ConnectivityPort, WifiAdapter};
use railgate::app::ports::{ConfigPort, LinkPort};
use railgate::app::reconciler::Reconciler;
use railgate::app::telemetry::TelemetryPublisher;
use railgate::config::NodeConfig;
use railgate::drivers::{hw_init, watchdog::Watchdog};
use railgate::events;
use railgate::health::HealthMonitor;
use railgate::scheduler::{
    spawn_loop, ReconcilerTask, TelemetryTask, RECONCILER_PLACEMENT, TELEMETRY_PLACEMENT,
};
use railgate::sensors::gps::GpsReader;
use railgate::store::RemoteStore;

const SUPERVISOR_TICK: Duration = Duration::from_secs(1);
/// Supervisor ticks between status lines.
const STATUS_EVERY: u32 = 60;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Railgate v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Hardware peripherals (fatal on failure) ────────────
    let peripherals = hw_init::init_peripherals().map_err(|e| {
        error!("HAL init failed: {} — halting", e);
        e
    })?;
    let gps = GpsReader::new().context("GPS UART init")?;
    let watchdog = Watchdog::default();

    // ── 3. Load config from NVS (or defaults) ─────────────────
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let config = match NvsAdapter::new().and_then(|nvs| nvs.load()) {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            NodeConfig::default()
        }
    };
    if !config.has_credential() {
        warn!("Config: no store credential set; the store will likely reject every call");
    }

    // ── 4. Baseline outputs before any remote call ────────────
    let mut hw = BoardHardware::from_peripherals(peripherals);
    let mut reconciler = Reconciler::from_config(&config);
    reconciler.apply_baseline(&mut hw, &mut LogEventSink::new());

    // ── 5. WiFi station ───────────────────────────────────────
    let hal = HalPeripherals::take()?;
    let esp_wifi = EspWifi::new(hal.modem, sysloop.clone(), Some(nvs_partition))?;
    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(esp_wifi, sysloop)?);
    match wifi.set_credentials(&config.wifi_ssid, &config.wifi_password) {
        Ok(()) => {
            if let Err(e) = wifi.connect() {
                warn!("WiFi: initial connect failed ({}), retrying in background", e);
            }
        }
        Err(e) => warn!("WiFi: {}; loops stay gated until provisioned", e),
    }
    let link = wifi.link_signal();

    // ── 6. Spawn the two loops ────────────────────────────────
    let http_timeout = Duration::from_millis(config.http_timeout_ms as u64);
    let poll_period = Duration::from_millis(config.poll_interval_ms as u64);
    let telemetry_period = Duration::from_secs(config.telemetry_interval_secs as u64);

    let reconciler_cfg = config.clone();
    let reconciler_link = link.clone();
    let _reconciler_thread = spawn_loop(RECONCILER_PLACEMENT, move || {
        let task = ReconcilerTask {
            reconciler,
            store: RemoteStore::from_config(HttpClient::new(http_timeout), &reconciler_cfg),
            hw,
            link: reconciler_link,
            delay: ReactorDelay::new(),
            sink: LogEventSink::new(),
        };
        task.run(poll_period)
    })
    .context("spawn reconciler loop")?;

    let telemetry_cfg = config.clone();
    let telemetry_link = link.clone();
    let _telemetry_thread = spawn_loop(TELEMETRY_PLACEMENT, move || {
        let task = TelemetryTask {
            publisher: TelemetryPublisher::from_config(&telemetry_cfg),
            gps,
            store: RemoteStore::from_config(HttpClient::new(http_timeout), &telemetry_cfg),
            link: telemetry_link,
            delay: ReactorDelay::new(),
            sink: LogEventSink::new(),
        };
        task.run(telemetry_period)
    })
    .context("spawn telemetry loop")?;

    info!("System ready. Entering supervisor loop.");

    // ── 7. Supervisor loop ────────────────────────────────────
    let uptime = Uptime::new();
    let mut health = HealthMonitor::from_config(&config, Instant::now());
    let mut ticks: u32 = 0;

    loop {
        let now = Instant::now();
        events::drain(|report| health.record(report, now));
        health.check(now);

        // WiFi reconnection poll (exponential backoff).
        wifi.poll();

        // Feed watchdog on every iteration.
        watchdog.feed();

        ticks = ticks.wrapping_add(1);
        if ticks % STATUS_EVERY == 0 {
            info!(
                "Supervisor: up {} s | link={} rssi={:?} | dropped reports={}",
                uptime.secs(),
                if link.is_up() { "UP" } else { "DOWN" },
                wifi.rssi(),
                events::dropped_count(),
            );
        }

        std::thread::sleep(SUPERVISOR_TICK);
    }
}
