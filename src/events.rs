//! Loop report channel.
//!
//! Each periodic loop posts one [`LoopReport`] per cycle; the supervisor
//! on the main thread drains them to track liveness.  The loops never read
//! from this channel, so it carries no state between them.
//!
//! ```text
//! ┌────────────────┐  LoopReport  ┌──────────────┐
//! │ Reconciler loop│─────────────▶│              │
//! └────────────────┘              │  Supervisor  │
//! ┌────────────────┐  LoopReport  │  (main)      │
//! │ Telemetry loop │─────────────▶│              │
//! └────────────────┘              └──────────────┘
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Which periodic loop a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopId {
    Reconciler,
    Telemetry,
}

impl LoopId {
    pub const ALL: [Self; 2] = [Self::Reconciler, Self::Telemetry];

    pub const fn index(self) -> usize {
        match self {
            Self::Reconciler => 0,
            Self::Telemetry => 1,
        }
    }
}

/// How one loop cycle went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleHealth {
    /// Every remote call in the cycle succeeded (or there was nothing to do).
    Ok,
    /// At least one remote call failed; local state was held.
    Degraded,
    /// The link was down; remote work was skipped.
    LinkDown,
}

/// Heartbeat posted at the end of every loop cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopReport {
    pub loop_id: LoopId,
    pub health: CycleHealth,
}

/// Two loops at a handful of reports per second; the supervisor drains
/// far more often than this fills.
const REPORT_DEPTH: usize = 16;

/// Loop → supervisor heartbeat channel.
pub static REPORT_CHANNEL: Channel<CriticalSectionRawMutex, LoopReport, REPORT_DEPTH> =
    Channel::new();

static DROPPED: AtomicU32 = AtomicU32::new(0);

/// Post a report without blocking.  Returns `false` if the channel was
/// full and the report was dropped.
pub fn post(report: LoopReport) -> bool {
    if REPORT_CHANNEL.try_send(report).is_err() {
        DROPPED.fetch_add(1, Ordering::Relaxed);
        return false;
    }
    true
}

/// Drain all pending reports into a callback, in FIFO order.
pub fn drain(mut handler: impl FnMut(LoopReport)) {
    while let Ok(report) = REPORT_CHANNEL.try_receive() {
        handler(report);
    }
}

/// Reports dropped because the channel was full.
pub fn dropped_count() -> u32 {
    DROPPED.load(Ordering::Relaxed)
}
