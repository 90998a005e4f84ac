//! Telemetry publisher: the upstream half of the node.
//!
//! One cycle reads a fresh [`LocationSample`] and writes it to the store
//! when it carries a real fix.  Nothing is queued: a failed publish is
//! dropped and the next cycle's sample supersedes it.

use heapless::String;
use log::debug;

use crate::config::{NodeConfig, PATH_CAP};
use crate::error::StoreError;

use super::events::NodeEvent;
use super::model::LocationSample;
use super::ports::{EventSink, LocationPort, StorePort};

/// Result of one publish cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PublishOutcome {
    Published(LocationSample),
    /// Sensor reported the no-fix sentinel.
    NoFix,
    /// Sample had a NaN or infinite coordinate.
    Rejected,
    Failed(StoreError),
}

/// Stateless apart from the target path and a few counters.
pub struct TelemetryPublisher {
    path: String<PATH_CAP>,
    published: u32,
    skipped: u32,
}

impl TelemetryPublisher {
    pub fn new(path: String<PATH_CAP>) -> Self {
        Self {
            path,
            published: 0,
            skipped: 0,
        }
    }

    pub fn from_config(cfg: &NodeConfig) -> Self {
        Self::new(cfg.gps_path.clone())
    }

    /// Read one sample and publish it if it is a real fix.
    pub fn publish_cycle(
        &mut self,
        gps: &mut impl LocationPort,
        store: &mut impl StorePort,
        sink: &mut impl EventSink,
    ) -> PublishOutcome {
        let sample = gps.read_sample();

        if !sample.has_fix() {
            self.skipped = self.skipped.wrapping_add(1);
            sink.emit(&NodeEvent::TelemetryNoFix);
            return PublishOutcome::NoFix;
        }
        if !sample.latitude.is_finite() || !sample.longitude.is_finite() {
            self.skipped = self.skipped.wrapping_add(1);
            sink.emit(&NodeEvent::TelemetryRejected(sample));
            return PublishOutcome::Rejected;
        }

        match store.put_json(&self.path, &sample) {
            Ok(()) => {
                self.published = self.published.wrapping_add(1);
                debug!("Telemetry: {} samples published", self.published);
                sink.emit(&NodeEvent::TelemetryPublished(sample));
                PublishOutcome::Published(sample)
            }
            Err(e) => {
                sink.emit(&NodeEvent::TelemetryFailed(e));
                PublishOutcome::Failed(e)
            }
        }
    }

    pub fn published_count(&self) -> u32 {
        self.published
    }

    pub fn skipped_count(&self) -> u32 {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportCause;
    use serde::Serialize;

    struct Fixed(LocationSample);

    impl LocationPort for Fixed {
        fn read_sample(&mut self) -> LocationSample {
            self.0
        }
    }

    struct Recorder {
        status: Result<(), StoreError>,
        writes: Vec<(std::string::String, std::string::String)>,
    }

    impl StorePort for Recorder {
        fn get_bool(&mut self, _path: &str) -> Result<bool, StoreError> {
            Err(StoreError::Parse)
        }

        fn put_json<T: Serialize>(&mut self, path: &str, fields: &T) -> Result<(), StoreError> {
            self.writes
                .push((path.into(), serde_json::to_string(fields).unwrap()));
            self.status
        }
    }

    struct Events(Vec<NodeEvent>);

    impl EventSink for Events {
        fn emit(&mut self, event: &NodeEvent) {
            self.0.push(*event);
        }
    }

    fn recorder(status: Result<(), StoreError>) -> Recorder {
        Recorder {
            status,
            writes: Vec::new(),
        }
    }

    #[test]
    fn valid_fix_is_written_to_gps_path() {
        let mut p = TelemetryPublisher::from_config(&NodeConfig::default());
        let mut store = recorder(Ok(()));
        let sample = LocationSample::new(12.34, 56.78);
        let out = p.publish_cycle(&mut Fixed(sample), &mut store, &mut Events(Vec::new()));
        assert_eq!(out, PublishOutcome::Published(sample));
        assert_eq!(store.writes.len(), 1);
        assert_eq!(store.writes[0].0, "gps");
        assert_eq!(store.writes[0].1, r#"{"latitude":12.34,"longitude":56.78}"#);
        assert_eq!(p.published_count(), 1);
    }

    #[test]
    fn sentinel_never_reaches_store() {
        let mut p = TelemetryPublisher::from_config(&NodeConfig::default());
        let mut store = recorder(Ok(()));
        let mut events = Events(Vec::new());
        let out = p.publish_cycle(&mut Fixed(LocationSample::NO_FIX), &mut store, &mut events);
        assert_eq!(out, PublishOutcome::NoFix);
        assert!(store.writes.is_empty());
        assert_eq!(events.0, vec![NodeEvent::TelemetryNoFix]);
    }

    #[test]
    fn non_finite_sample_is_rejected() {
        let mut p = TelemetryPublisher::from_config(&NodeConfig::default());
        let mut store = recorder(Ok(()));
        let sample = LocationSample::new(f64::NAN, 56.78);
        let out = p.publish_cycle(&mut Fixed(sample), &mut store, &mut Events(Vec::new()));
        assert_eq!(out, PublishOutcome::Rejected);
        assert!(store.writes.is_empty());
        assert_eq!(p.skipped_count(), 1);
    }

    #[test]
    fn store_failure_is_reported_not_retried() {
        let mut p = TelemetryPublisher::from_config(&NodeConfig::default());
        let err = StoreError::Transport(TransportCause::Status(500));
        let mut store = recorder(Err(err));
        let mut events = Events(Vec::new());
        let sample = LocationSample::new(12.34, 56.78);
        let out = p.publish_cycle(&mut Fixed(sample), &mut store, &mut events);
        assert_eq!(out, PublishOutcome::Failed(err));
        assert_eq!(store.writes.len(), 1);
        assert_eq!(events.0, vec![NodeEvent::TelemetryFailed(err)]);
    }
}
