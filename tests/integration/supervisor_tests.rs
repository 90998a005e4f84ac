//! Supervisor wiring: WiFi link signal, loop reports and health.

use std::time::{Duration, Instant};

use railgate::adapters::wifi::{ConnectivityPort, WifiAdapter, WifiState};
use railgate::app::ports::LinkPort;
use railgate::events::{self, CycleHealth, LoopId, LoopReport};
use railgate::health::HealthMonitor;

#[test]
fn link_signal_follows_wifi_reconnects() {
    let mut wifi = WifiAdapter::new();
    let link = wifi.link_signal();
    assert!(!link.is_up());

    wifi.set_credentials("railgate-test", "password123").unwrap();
    wifi.connect().unwrap();
    assert!(link.is_up());

    let t0 = Instant::now();
    wifi.sim_drop_link();
    wifi.sim_fail_next(1);
    wifi.poll_at(t0);
    assert!(!link.is_up());
    assert_eq!(wifi.state(), WifiState::Reconnecting { attempt: 0 });

    // First retry fails, second succeeds after the doubled backoff.
    wifi.poll_at(t0 + Duration::from_secs(2));
    assert!(!link.is_up());
    wifi.poll_at(t0 + Duration::from_secs(6));
    assert!(link.is_up());
    assert_eq!(wifi.state(), WifiState::Connected);
}

// The report channel is process-wide; this is the only test in the binary
// that touches it.
#[test]
fn drained_reports_keep_loops_alive() {
    events::drain(|_| {});
    let t0 = Instant::now();
    let mut health = HealthMonitor::new(Duration::from_secs(5), Duration::from_secs(30), t0);

    for _ in 0..3 {
        assert!(events::post(LoopReport {
            loop_id: LoopId::Reconciler,
            health: CycleHealth::Ok,
        }));
    }
    assert!(events::post(LoopReport {
        loop_id: LoopId::Telemetry,
        health: CycleHealth::Degraded,
    }));

    let later = t0 + Duration::from_secs(4);
    events::drain(|r| health.record(r, later));

    assert_eq!(health.cycles(LoopId::Reconciler), 3);
    assert_eq!(health.consecutive_degraded(LoopId::Telemetry), 1);
    assert!(health.check(t0 + Duration::from_secs(8)));
    assert!(!health.check(t0 + Duration::from_secs(10)));
    assert!(health.is_stalled(LoopId::Reconciler));
}
