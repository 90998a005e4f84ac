//! Mock adapters for integration tests.
//!
//! Records every actuator call and remote request so tests can assert on
//! the full history without touching real GPIO/PWM registers or sockets.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use railgate::app::events::NodeEvent;
use railgate::app::model::LocationSample;
use railgate::app::ports::{ActuatorPort, DelayPort, EventSink, LinkPort, LocationPort, StorePort};
use railgate::error::{ActuatorError, StoreError};
use serde::Serialize;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Light(bool),
    Alarm(bool),
    Angle(i16),
}

// ── MockHardware ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockHardware {
    pub calls: Vec<ActuatorCall>,
    /// Angles the mock refuses, as a driver rejecting a step would.
    pub reject_angles: Vec<i16>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn angles(&self) -> Vec<i16> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::Angle(a) => Some(*a),
                _ => None,
            })
            .collect()
    }

    pub fn light_writes(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, ActuatorCall::Light(_))).count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl ActuatorPort for MockHardware {
    fn set_light(&mut self, on: bool) {
        self.calls.push(ActuatorCall::Light(on));
    }

    fn set_alarm(&mut self, on: bool) {
        self.calls.push(ActuatorCall::Alarm(on));
    }

    fn set_angle(&mut self, degrees: i16) -> Result<(), ActuatorError> {
        if self.reject_angles.contains(&degrees) {
            return Err(ActuatorError::PwmWriteFailed);
        }
        self.calls.push(ActuatorCall::Angle(degrees));
        Ok(())
    }
}

// ── ScriptedStore ─────────────────────────────────────────────

/// Replays queued replies per path; an exhausted queue answers `false`.
#[derive(Default)]
pub struct ScriptedStore {
    replies: HashMap<String, VecDeque<Result<bool, StoreError>>>,
    pub gets: Vec<String>,
    pub puts: Vec<(String, serde_json::Value)>,
    pub put_results: VecDeque<Result<(), StoreError>>,
}

#[allow(dead_code)]
impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&mut self, path: &str, replies: impl IntoIterator<Item = Result<bool, StoreError>>) {
        self.replies.entry(path.to_string()).or_default().extend(replies);
    }

    pub fn script_values(&mut self, path: &str, values: &[bool]) {
        self.script(path, values.iter().copied().map(Ok));
    }
}

impl StorePort for ScriptedStore {
    fn get_bool(&mut self, path: &str) -> Result<bool, StoreError> {
        self.gets.push(path.to_string());
        self.replies
            .get_mut(path)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(false))
    }

    fn put_json<T: Serialize>(&mut self, path: &str, fields: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(fields).map_err(|_| StoreError::Parse)?;
        self.puts.push((path.to_string(), value));
        self.put_results.pop_front().unwrap_or(Ok(()))
    }
}

// ── Instant delay ─────────────────────────────────────────────

/// Records requested sleeps and returns immediately.
#[derive(Default)]
pub struct InstantDelay {
    pub sleeps: Vec<Duration>,
}

impl DelayPort for InstantDelay {
    async fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
    }
}

// ── Event recorder ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<NodeEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&NodeEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &NodeEvent) {
        self.events.push(*event);
    }
}

// ── Link / GPS fakes ──────────────────────────────────────────

pub struct FixedLink(pub bool);

impl LinkPort for FixedLink {
    fn is_up(&self) -> bool {
        self.0
    }
}

/// Replays samples; an exhausted script reports no fix.
#[derive(Default)]
pub struct ScriptedGps {
    pub samples: VecDeque<LocationSample>,
}

#[allow(dead_code)]
impl ScriptedGps {
    pub fn new(samples: impl IntoIterator<Item = LocationSample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }
}

impl LocationPort for ScriptedGps {
    fn read_sample(&mut self) -> LocationSample {
        self.samples.pop_front().unwrap_or(LocationSample::NO_FIX)
    }
}
