//! Periodic loop scheduler.
//!
//! Runs the command reconciler and the telemetry publisher as two
//! independent loops, each on its own core-pinned thread with its own
//! `edge-executor` and `async-io-mini` reactor timers.  The loops share no
//! mutable state; each owns its store client, its hardware and its
//! domain object outright.
//!
//! ```text
//!  ┌──────────────────────────────┐   ┌──────────────────────────────┐
//!  │ reconciler thread (APP core) │   │ telemetry thread (PRO core)  │
//!  │  LocalExecutor + block_on    │   │  LocalExecutor + block_on    │
//!  │                              │   │                              │
//!  │  loop {                      │   │  loop {                      │
//!  │    link up? run_cycle        │   │    link up? publish_cycle    │
//!  │      (sweep sleeps yield)    │   │    post LoopReport           │
//!  │    post LoopReport           │   │    sleep to next deadline    │
//!  │    sleep to next deadline    │   │  }                           │
//!  │  }                           │   │                              │
//!  └──────────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! Both periods are fixed-rate: the time a cycle spends working is taken
//! off its sleep, and an overrun cycle is followed immediately by the next
//! one without trying to catch up on missed deadlines.

use core::ffi::CStr;
use core::future::Future;
use core::time::Duration;
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, info};

use crate::app::events::NodeEvent;
use crate::app::ports::{
    ActuatorPort, DelayPort, EventSink, LinkPort, LocationPort, StorePort,
};
use crate::app::reconciler::{CycleReport, Reconciler};
use crate::app::telemetry::{PublishOutcome, TelemetryPublisher};
use crate::events::{self, CycleHealth, LoopId, LoopReport};

// ═══════════════════════════════════════════════════════════════
//  Fixed-rate pacing
// ═══════════════════════════════════════════════════════════════

/// Wall-clock deadline tracker for one loop.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    period: Duration,
    next: Instant,
}

impl Pacer {
    /// First deadline is one period after `now`.
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next: now + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time to sleep from `now` until the next deadline, advancing the
    /// deadline by one period.  After an overrun the schedule restarts from
    /// `now` and the returned delay is zero.
    pub fn wait_from(&mut self, now: Instant) -> Duration {
        let wait = self.next.saturating_duration_since(now);
        if wait.is_zero() {
            self.next = now + self.period;
        } else {
            self.next += self.period;
        }
        wait
    }
}

// ═══════════════════════════════════════════════════════════════
//  Reconciler loop
// ═══════════════════════════════════════════════════════════════

/// Everything the command loop owns.
pub struct ReconcilerTask<S, A, L, D, E> {
    pub reconciler: Reconciler,
    pub store: S,
    pub hw: A,
    pub link: L,
    pub delay: D,
    pub sink: E,
}

impl<S, A, L, D, E> ReconcilerTask<S, A, L, D, E>
where
    S: StorePort,
    A: ActuatorPort,
    L: LinkPort,
    D: DelayPort,
    E: EventSink,
{
    /// One gated cycle.  `None` when the link was down.
    pub async fn tick(&mut self) -> Option<CycleReport> {
        if !self.link.is_up() {
            self.sink.emit(&NodeEvent::LinkDown);
            return None;
        }
        Some(
            self.reconciler
                .run_cycle(&mut self.store, &mut self.hw, &mut self.delay, &mut self.sink)
                .await,
        )
    }

    /// Run forever at `period`, posting a heartbeat after every cycle.
    pub async fn run(mut self, period: Duration) {
        info!("Scheduler: reconciler loop every {} ms", period.as_millis());
        let mut pacer = Pacer::new(period, Instant::now());
        loop {
            let health = match self.tick().await {
                None => CycleHealth::LinkDown,
                Some(report) if report.failed_count() > 0 => CycleHealth::Degraded,
                Some(_) => CycleHealth::Ok,
            };
            events::post(LoopReport {
                loop_id: LoopId::Reconciler,
                health,
            });
            let wait = pacer.wait_from(Instant::now());
            self.delay.sleep(wait).await;
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Telemetry loop
// ═══════════════════════════════════════════════════════════════

/// Everything the telemetry loop owns.
pub struct TelemetryTask<G, S, L, D, E> {
    pub publisher: TelemetryPublisher,
    pub gps: G,
    pub store: S,
    pub link: L,
    pub delay: D,
    pub sink: E,
}

impl<G, S, L, D, E> TelemetryTask<G, S, L, D, E>
where
    G: LocationPort,
    S: StorePort,
    L: LinkPort,
    D: DelayPort,
    E: EventSink,
{
    /// One gated cycle.  `None` when the link was down.
    pub fn tick(&mut self) -> Option<PublishOutcome> {
        if !self.link.is_up() {
            self.sink.emit(&NodeEvent::LinkDown);
            return None;
        }
        Some(
            self.publisher
                .publish_cycle(&mut self.gps, &mut self.store, &mut self.sink),
        )
    }

    /// Run forever at `period`, posting a heartbeat after every cycle.
    pub async fn run(mut self, period: Duration) {
        info!("Scheduler: telemetry loop every {} s", period.as_secs());
        let mut pacer = Pacer::new(period, Instant::now());
        loop {
            let health = match self.tick() {
                None => CycleHealth::LinkDown,
                Some(PublishOutcome::Failed(_)) => CycleHealth::Degraded,
                Some(_) => CycleHealth::Ok,
            };
            events::post(LoopReport {
                loop_id: LoopId::Telemetry,
                health,
            });
            let wait = pacer.wait_from(Instant::now());
            debug!("Scheduler: telemetry sleeping {} ms", wait.as_millis());
            self.delay.sleep(wait).await;
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Thread spawn
// ═══════════════════════════════════════════════════════════════

/// Placement of one loop thread.
/// ESP32 core a loop thread is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0, shared with WiFi and lwIP.
    Pro = 0,
    /// Core 1, left to the reconciler so sweep steps keep their cadence.
    App = 1,
}

/// Where and how a loop thread runs.
#[derive(Debug, Clone, Copy)]
pub struct LoopPlacement {
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
    pub name: &'static CStr,
}

/// Command loop: APP core, above the telemetry loop.
pub const RECONCILER_PLACEMENT: LoopPlacement = LoopPlacement {
    core: Core::App,
    priority: 10,
    stack_kb: 16,
    name: c"reconcile",
};

/// Telemetry loop: PRO core, next to the network stack.
pub const TELEMETRY_PLACEMENT: LoopPlacement = LoopPlacement {
    core: Core::Pro,
    priority: 8,
    stack_kb: 16,
    name: c"telemetry",
};

impl LoopPlacement {
    fn label(&self) -> &'static str {
        self.name.to_str().unwrap_or("loop")
    }

    /// Spawn `f` as a FreeRTOS task with this placement.
    ///
    /// ESP-IDF creates `std` threads through pthreads; `esp_pthread_set_cfg`
    /// applies to every later `pthread_create` from the calling thread, so
    /// the default is restored once the loop thread exists.
    #[cfg(target_os = "espidf")]
    fn spawn(self, f: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
        use esp_idf_sys::{esp_create_default_pthread_config, esp_pthread_set_cfg, ESP_OK};

        // SAFETY: the config is copied by esp_pthread_set_cfg; `name` is a
        // 'static C string that outlives the task.
        let ret = unsafe {
            let mut cfg = esp_create_default_pthread_config();
            cfg.pin_to_core = self.core as i32;
            cfg.prio = i32::from(self.priority);
            cfg.stack_size = (self.stack_kb * 1024) as i32;
            cfg.thread_name = self.name.as_ptr();
            esp_pthread_set_cfg(&cfg)
        };
        if ret != ESP_OK as i32 {
            return Err(io::Error::other(format!("esp_pthread_set_cfg failed ({})", ret)));
        }

        info!(
            "Scheduler: spawning '{}' on {:?} (pri={}, stack={} KB)",
            self.label(),
            self.core,
            self.priority,
            self.stack_kb
        );
        let handle = thread::Builder::new().name(self.label().into()).spawn(f);

        // SAFETY: as above; the default config owns no borrowed data.
        unsafe {
            let default = esp_create_default_pthread_config();
            esp_pthread_set_cfg(&default);
        }
        handle
    }

    /// Host threads ignore core affinity and priority.
    #[cfg(not(target_os = "espidf"))]
    fn spawn(self, f: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
        debug!("Scheduler(sim): spawning '{}' (stack={} KB)", self.label(), self.stack_kb);
        thread::Builder::new()
            .name(self.label().into())
            .stack_size(self.stack_kb * 1024)
            .spawn(f)
    }
}

/// Spawn a loop thread.  `make` runs on the new thread and builds the
/// loop future there, so the future itself need not be `Send`.
pub fn spawn_loop<F, Fut>(placement: LoopPlacement, make: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + 'static,
{
    placement.spawn(move || {
        let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
        futures_lite::future::block_on(executor.run(make()));
    })
}
