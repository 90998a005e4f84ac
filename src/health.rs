//! Loop health supervisor.
//!
//! The supervisor runs on the main thread.  Every tick it folds the
//! pending [`LoopReport`]s into per-loop state and then checks each loop
//! for silence.
//!
//! ## Lifecycle of a stall
//!
//! 1. A loop stops posting heartbeats (stuck HTTP call, wedged driver).
//! 2. Once it has been silent longer than its threshold the supervisor
//!    latches it as stalled and logs once.
//! 3. The next heartbeat from that loop clears the latch and logs recovery.
//!
//! Degraded cycles (remote failures) are counted but never latch a stall:
//! a loop that keeps failing is still alive and holding local state.

use core::time::Duration;
use std::time::Instant;

use log::{error, info, warn};

use crate::app::sweep::SweepProfile;
use crate::config::NodeConfig;
use crate::events::{CycleHealth, LoopId, LoopReport};

/// Consecutive degraded cycles before a warning is logged.
const DEGRADED_WARN_AFTER: u32 = 10;

/// Upper bound on one GPS read (UART window plus slack).
const GPS_READ_MAX: Duration = Duration::from_secs(2);

/// Silence tolerated before a loop is flagged: two periods plus two
/// worst-case cycles.
pub fn stall_threshold(period: Duration, worst_cycle: Duration) -> Duration {
    (period + worst_cycle) * 2
}

#[derive(Debug, Clone, Copy)]
struct LoopState {
    stall_after: Duration,
    last_seen: Instant,
    last_health: Option<CycleHealth>,
    consecutive_degraded: u32,
    cycles: u64,
    stalled: bool,
}

impl LoopState {
    fn new(stall_after: Duration, now: Instant) -> Self {
        Self {
            stall_after,
            last_seen: now,
            last_health: None,
            consecutive_degraded: 0,
            cycles: 0,
            stalled: false,
        }
    }
}

/// Liveness view over both loops.
pub struct HealthMonitor {
    loops: [LoopState; 2],
}

impl HealthMonitor {
    /// `reconciler_stall` / `telemetry_stall` are the silences tolerated
    /// before a loop is flagged.  The clock starts at `now`.
    pub fn new(reconciler_stall: Duration, telemetry_stall: Duration, now: Instant) -> Self {
        Self {
            loops: [
                LoopState::new(reconciler_stall, now),
                LoopState::new(telemetry_stall, now),
            ],
        }
    }

    /// Thresholds derived from the loop periods, the HTTP timeout and the
    /// longest sweep.  A reconciler cycle may block on three fetches and one
    /// sweep; a telemetry cycle on one GPS read and one write.
    pub fn from_config(cfg: &NodeConfig, now: Instant) -> Self {
        let timeout = Duration::from_millis(cfg.http_timeout_ms as u64);
        let profile = SweepProfile::from_config(cfg);
        let longest = profile.forward().step_count().max(profile.retract().step_count());
        let sweep = Duration::from_millis(cfg.sweep_step_delay_ms as u64) * longest as u32;

        let reconciler = stall_threshold(
            Duration::from_millis(cfg.poll_interval_ms as u64),
            timeout * 3 + sweep,
        );
        let telemetry = stall_threshold(
            Duration::from_secs(cfg.telemetry_interval_secs as u64),
            timeout + GPS_READ_MAX,
        );
        info!(
            "Health: stall thresholds reconciler={} s telemetry={} s",
            reconciler.as_secs(),
            telemetry.as_secs()
        );
        Self::new(reconciler, telemetry, now)
    }

    /// Fold one heartbeat received at `now`.
    pub fn record(&mut self, report: LoopReport, now: Instant) {
        let state = &mut self.loops[report.loop_id.index()];
        if state.stalled {
            info!("Health: {:?} loop recovered", report.loop_id);
            state.stalled = false;
        }
        state.last_seen = now;
        state.cycles += 1;

        match report.health {
            CycleHealth::Degraded => {
                state.consecutive_degraded += 1;
                if state.consecutive_degraded == DEGRADED_WARN_AFTER {
                    warn!(
                        "Health: {:?} loop degraded for {} consecutive cycles",
                        report.loop_id, DEGRADED_WARN_AFTER
                    );
                }
            }
            CycleHealth::Ok | CycleHealth::LinkDown => state.consecutive_degraded = 0,
        }
        state.last_health = Some(report.health);
    }

    /// Latch and log newly stalled loops.  Returns `true` while every loop
    /// is alive.
    pub fn check(&mut self, now: Instant) -> bool {
        let mut all_alive = true;
        for id in LoopId::ALL {
            let state = &mut self.loops[id.index()];
            let silent = now.saturating_duration_since(state.last_seen);
            if silent > state.stall_after {
                if !state.stalled {
                    error!("Health: {:?} loop silent for {} s", id, silent.as_secs());
                    state.stalled = true;
                }
                all_alive = false;
            }
        }
        all_alive
    }

    pub fn is_stalled(&self, id: LoopId) -> bool {
        self.loops[id.index()].stalled
    }

    pub fn last_health(&self, id: LoopId) -> Option<CycleHealth> {
        self.loops[id.index()].last_health
    }

    pub fn consecutive_degraded(&self, id: LoopId) -> u32 {
        self.loops[id.index()].consecutive_degraded
    }

    pub fn cycles(&self, id: LoopId) -> u64 {
        self.loops[id.index()].cycles
    }
}
