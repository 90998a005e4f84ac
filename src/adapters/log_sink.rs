//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured node events to the
//! ESP-IDF logger (UART / USB-CDC in production), one tagged line each.

use log::{info, warn};

use crate::app::events::NodeEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`NodeEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events rendered since construction.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &NodeEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            NodeEvent::BaselineApplied => {
                info!("CMD | baseline applied (light=off alarm=off)");
            }
            NodeEvent::FieldApplied { field, value } => {
                info!("CMD | {} -> {}", field, if *value { "ON" } else { "OFF" });
            }
            NodeEvent::FieldFetchFailed { field, error } => {
                warn!("CMD | {} fetch failed: {}", field, error);
            }
            NodeEvent::SweepStarted { from, to } => {
                info!("SWEEP | {}\u{00b0} -> {}\u{00b0}", from, to);
            }
            NodeEvent::SweepStepRejected { angle, error } => {
                warn!("SWEEP | step {}\u{00b0} rejected: {}", angle, error);
            }
            NodeEvent::SweepFinished { steps } => {
                info!("SWEEP | done ({} steps)", steps);
            }
            NodeEvent::TelemetryPublished(s) => {
                info!("GPS | published lat={:.6} lon={:.6}", s.latitude, s.longitude);
            }
            NodeEvent::TelemetryNoFix => {
                warn!("GPS | no fix, waiting");
            }
            NodeEvent::TelemetryRejected(s) => {
                warn!("GPS | discarded non-finite sample ({}, {})", s.latitude, s.longitude);
            }
            NodeEvent::TelemetryFailed(e) => {
                warn!("GPS | publish failed: {}", e);
            }
            NodeEvent::LinkDown => {
                warn!("LINK | down, skipping remote work");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::model::CommandField;

    #[test]
    fn counts_every_event() {
        let mut sink = LogEventSink::new();
        sink.emit(&NodeEvent::BaselineApplied);
        sink.emit(&NodeEvent::FieldApplied { field: CommandField::Light, value: true });
        sink.emit(&NodeEvent::LinkDown);
        assert_eq!(sink.emitted(), 3);
    }
}
