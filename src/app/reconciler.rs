//! Command reconciler: the downstream half of the node.
//!
//! Once per poll cycle the [`Reconciler`] pulls the three remote command
//! flags in a fixed order (light, alarm, position), compares each against
//! the value last *applied to hardware*, and acts only on a change.
//!
//! ```text
//!  StorePort ──get_bool──▶ ┌──────────────────────┐ ──set_light/alarm──▶ ActuatorPort
//!                          │      Reconciler       │ ──set_angle (sweep)─▶
//!  DelayPort ◀──sleep───── │  last-applied state   │ ──emit──▶ EventSink
//!                          └──────────────────────┘
//! ```
//!
//! A failed fetch leaves that field's last-applied value untouched and
//! writes nothing; the next scheduled cycle is the retry.  A position change
//! runs a full [`Sweep`] before the cycle continues, and last-applied only
//! moves once the sweep is complete.

use core::time::Duration;

use heapless::String;
use log::{debug, info};

use crate::config::{NodeConfig, PATH_CAP};
use crate::error::StoreError;

use super::events::NodeEvent;
use super::model::CommandField;
use super::ports::{ActuatorPort, DelayPort, EventSink, StorePort};
use super::sweep::{Sweep, SweepProfile};

// ───────────────────────────────────────────────────────────────
// Last-applied state
// ───────────────────────────────────────────────────────────────

/// Values most recently written to hardware, one per [`CommandField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedState {
    pub light: bool,
    pub alarm: bool,
    pub position: bool,
}

impl AppliedState {
    /// Boot state: everything inactive.  Nothing survives a restart.
    pub const BASELINE: Self = Self {
        light: false,
        alarm: false,
        position: false,
    };

    pub fn get(&self, field: CommandField) -> bool {
        match field {
            CommandField::Light => self.light,
            CommandField::Alarm => self.alarm,
            CommandField::Position => self.position,
        }
    }

    fn set(&mut self, field: CommandField, value: bool) {
        match field {
            CommandField::Light => self.light = value,
            CommandField::Alarm => self.alarm = value,
            CommandField::Position => self.position = value,
        }
    }
}

impl Default for AppliedState {
    fn default() -> Self {
        Self::BASELINE
    }
}

// ───────────────────────────────────────────────────────────────
// Paths
// ───────────────────────────────────────────────────────────────

/// Remote document path bound to each command field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPaths {
    pub light: String<PATH_CAP>,
    pub alarm: String<PATH_CAP>,
    pub position: String<PATH_CAP>,
}

impl FieldPaths {
    pub fn from_config(cfg: &NodeConfig) -> Self {
        Self {
            light: cfg.light_path.clone(),
            alarm: cfg.alarm_path.clone(),
            position: cfg.position_path.clone(),
        }
    }

    pub fn path(&self, field: CommandField) -> &str {
        match field {
            CommandField::Light => &self.light,
            CommandField::Alarm => &self.alarm,
            CommandField::Position => &self.position,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Cycle report
// ───────────────────────────────────────────────────────────────

/// What happened to one field in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    /// Fetched value matched last-applied; nothing written.
    Unchanged,
    /// Fetched value differed and was applied.
    Applied(bool),
    /// Fetch failed; field skipped for this cycle.
    Skipped(StoreError),
}

/// Per-field outcomes of one cycle, indexed by [`CommandField::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub outcomes: [FieldOutcome; 3],
}

impl CycleReport {
    pub fn outcome(&self, field: CommandField) -> FieldOutcome {
        self.outcomes[field.index()]
    }

    pub fn applied_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FieldOutcome::Applied(_)))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FieldOutcome::Skipped(_)))
            .count()
    }
}

// ───────────────────────────────────────────────────────────────
// Reconciler
// ───────────────────────────────────────────────────────────────

/// Owns last-applied state for the three command fields.
pub struct Reconciler {
    applied: AppliedState,
    /// Last angle commanded to the actuator.
    angle: i16,
    paths: FieldPaths,
    profile: SweepProfile,
    cycles: u64,
}

impl Reconciler {
    pub fn new(paths: FieldPaths, profile: SweepProfile) -> Self {
        Self {
            applied: AppliedState::BASELINE,
            angle: profile.rest_deg,
            paths,
            profile,
            cycles: 0,
        }
    }

    pub fn from_config(cfg: &NodeConfig) -> Self {
        Self::new(FieldPaths::from_config(cfg), SweepProfile::from_config(cfg))
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive every output to the baseline the state starts from.
    ///
    /// Called once at boot so hardware and last-applied agree before the
    /// first poll.
    pub fn apply_baseline(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.applied = AppliedState::BASELINE;
        hw.set_light(false);
        hw.set_alarm(false);
        self.angle = self.profile.rest_deg;
        if let Err(e) = hw.set_angle(self.angle) {
            sink.emit(&NodeEvent::SweepStepRejected {
                angle: self.angle,
                error: e,
            });
        }
        sink.emit(&NodeEvent::BaselineApplied);
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Fetch, compare and apply each field once, in fixed order.
    pub async fn run_cycle(
        &mut self,
        store: &mut impl StorePort,
        hw: &mut impl ActuatorPort,
        delay: &mut impl DelayPort,
        sink: &mut impl EventSink,
    ) -> CycleReport {
        self.cycles += 1;
        let mut outcomes = [FieldOutcome::Unchanged; 3];
        for field in CommandField::ALL {
            outcomes[field.index()] = self.reconcile_field(field, store, hw, delay, sink).await;
        }
        CycleReport { outcomes }
    }

    async fn reconcile_field(
        &mut self,
        field: CommandField,
        store: &mut impl StorePort,
        hw: &mut impl ActuatorPort,
        delay: &mut impl DelayPort,
        sink: &mut impl EventSink,
    ) -> FieldOutcome {
        let fetched = match store.get_bool(self.paths.path(field)) {
            Ok(v) => v,
            Err(error) => {
                sink.emit(&NodeEvent::FieldFetchFailed { field, error });
                return FieldOutcome::Skipped(error);
            }
        };

        if fetched == self.applied.get(field) {
            debug!("Reconciler: {} unchanged ({})", field, fetched);
            return FieldOutcome::Unchanged;
        }

        match field {
            CommandField::Light => hw.set_light(fetched),
            CommandField::Alarm => hw.set_alarm(fetched),
            CommandField::Position => {
                let sweep = self.profile.toward(fetched);
                self.run_sweep(sweep, hw, delay, sink).await;
            }
        }

        self.applied.set(field, fetched);
        info!("Reconciler: {} -> {}", field, fetched);
        sink.emit(&NodeEvent::FieldApplied {
            field,
            value: fetched,
        });
        FieldOutcome::Applied(fetched)
    }

    /// Command every angle of `sweep`, pausing after each one.  Runs to
    /// completion; a rejected step is reported and skipped.
    async fn run_sweep(
        &mut self,
        mut sweep: Sweep,
        hw: &mut impl ActuatorPort,
        delay: &mut impl DelayPort,
        sink: &mut impl EventSink,
    ) {
        sink.emit(&NodeEvent::SweepStarted {
            from: sweep.start(),
            to: sweep.target(),
        });

        let step_delay = Duration::from_millis(self.profile.step_delay_ms as u64);
        let mut steps: u16 = 0;
        while let Some(angle) = sweep.advance() {
            match hw.set_angle(angle) {
                Ok(()) => self.angle = angle,
                Err(error) => sink.emit(&NodeEvent::SweepStepRejected { angle, error }),
            }
            steps = steps.saturating_add(1);
            delay.sleep(step_delay).await;
        }

        sink.emit(&NodeEvent::SweepFinished { steps });
    }

    // ── Queries ───────────────────────────────────────────────

    /// Values last written to hardware.
    pub fn applied(&self) -> AppliedState {
        self.applied
    }

    /// Last angle the driver accepted.
    pub fn angle(&self) -> i16 {
        self.angle
    }

    /// Cycles run since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn profile(&self) -> &SweepProfile {
        &self.profile
    }
}
