//! Outbound domain events.
//!
//! The reconciler and the telemetry publisher emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them: log to serial or forward to the supervisor.

use crate::error::{ActuatorError, StoreError};

use super::model::{CommandField, LocationSample};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeEvent {
    /// Baseline outputs were driven at boot.
    BaselineApplied,

    /// A fetched value differed from last-applied and was written to hardware.
    FieldApplied { field: CommandField, value: bool },

    /// Fetching a field failed; last-applied is unchanged.
    FieldFetchFailed { field: CommandField, error: StoreError },

    /// A position sweep began.
    SweepStarted { from: i16, to: i16 },

    /// The driver rejected one step of a sweep; the sweep continued.
    SweepStepRejected { angle: i16, error: ActuatorError },

    /// A position sweep ran to completion.
    SweepFinished { steps: u16 },

    /// A location sample was written upstream.
    TelemetryPublished(LocationSample),

    /// The sensor reported the no-fix sentinel; nothing was published.
    TelemetryNoFix,

    /// The sample carried a non-finite coordinate and was discarded.
    TelemetryRejected(LocationSample),

    /// The upstream write failed; the sample was discarded.
    TelemetryFailed(StoreError),

    /// The link was down at cycle start; remote work was skipped.
    LinkDown,
}
