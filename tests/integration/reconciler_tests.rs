//! Command reconciler against recording mocks.

use futures_lite::future::block_on;

use railgate::app::events::NodeEvent;
use railgate::app::model::CommandField;
use railgate::app::reconciler::{AppliedState, FieldOutcome, Reconciler};
use railgate::config::NodeConfig;
use railgate::error::{StoreError, TransportCause};
use railgate::scheduler::ReconcilerTask;

use crate::mock_hw::{
    ActuatorCall, FixedLink, InstantDelay, MockHardware, RecordingSink, ScriptedStore,
};

const LIGHT: &str = "led/led1";
const ALARM: &str = "buzzer/buzzer1";
const POSITION: &str = "servo/servo1";

struct Rig {
    reconciler: Reconciler,
    store: ScriptedStore,
    hw: MockHardware,
    delay: InstantDelay,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self {
            reconciler: Reconciler::from_config(&NodeConfig::default()),
            store: ScriptedStore::new(),
            hw: MockHardware::new(),
            delay: InstantDelay::default(),
            sink: RecordingSink::new(),
        }
    }

    fn cycle(&mut self) -> railgate::app::reconciler::CycleReport {
        block_on(self.reconciler.run_cycle(
            &mut self.store,
            &mut self.hw,
            &mut self.delay,
            &mut self.sink,
        ))
    }

    fn sweeps(&self) -> Vec<(i16, i16)> {
        self.sink
            .events
            .iter()
            .filter_map(|e| match e {
                NodeEvent::SweepStarted { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn position_sequence_produces_exactly_two_sweeps() {
    let mut rig = Rig::new();
    rig.store.script_values(POSITION, &[false, false, true, true, false]);

    let mut sweeps_after_cycle = Vec::new();
    for _ in 0..5 {
        rig.cycle();
        sweeps_after_cycle.push(rig.sweeps().len());
    }

    // Forward on the 2nd→3rd transition, return on the 4th→5th.
    assert_eq!(sweeps_after_cycle, vec![0, 0, 1, 1, 2]);
    assert_eq!(rig.sweeps(), vec![(0, 90), (90, -90)]);

    let angles = rig.hw.angles();
    let (forward, retract) = angles.split_at(19);
    assert_eq!(forward.first(), Some(&0));
    assert_eq!(forward.last(), Some(&90));
    assert!(forward.windows(2).all(|w| w[1] - w[0] == 5));
    assert_eq!(retract.first(), Some(&90));
    assert_eq!(retract.last(), Some(&-90));
    assert!(retract.windows(2).all(|w| w[0] - w[1] == 5));
    assert_eq!(retract.len(), 37);
}

#[test]
fn every_sweep_step_is_followed_by_the_step_delay() {
    let mut rig = Rig::new();
    rig.store.script_values(POSITION, &[true]);
    rig.cycle();

    assert_eq!(rig.delay.sleeps.len(), 19);
    assert!(rig
        .delay
        .sleeps
        .iter()
        .all(|d| *d == std::time::Duration::from_millis(100)));
    assert_eq!(rig.reconciler.angle(), 90);
}

#[test]
fn transport_error_leaves_state_and_outputs_untouched() {
    let mut rig = Rig::new();
    rig.store.script_values(LIGHT, &[true]);
    rig.cycle();
    let before = rig.reconciler.applied();
    rig.hw.clear();

    let timeout = StoreError::Transport(TransportCause::Timeout);
    rig.store.script(LIGHT, [Err(timeout)]);
    rig.store.script(ALARM, [Err(StoreError::Transport(TransportCause::Status(500)))]);
    rig.store.script(POSITION, [Err(StoreError::Parse)]);
    let report = rig.cycle();

    assert_eq!(rig.reconciler.applied(), before);
    assert!(rig.hw.calls.is_empty());
    assert_eq!(report.failed_count(), 3);
    assert_eq!(report.outcome(CommandField::Light), FieldOutcome::Skipped(timeout));
    assert_eq!(
        rig.sink.count(|e| matches!(e, NodeEvent::FieldFetchFailed { .. })),
        3
    );

    // The next cycle proceeds normally.
    rig.store.script_values(LIGHT, &[false]);
    rig.cycle();
    assert_eq!(rig.hw.calls, vec![ActuatorCall::Light(false)]);
}

#[test]
fn identical_fetches_write_hardware_once() {
    let mut rig = Rig::new();
    rig.store.script_values(LIGHT, &[true, true, true]);
    rig.store.script_values(ALARM, &[true, true, true]);

    let first = rig.cycle();
    assert_eq!(first.applied_count(), 2);
    rig.cycle();
    let third = rig.cycle();
    assert_eq!(third.applied_count(), 0);

    assert_eq!(
        rig.hw.calls,
        vec![ActuatorCall::Light(true), ActuatorCall::Alarm(true)]
    );
    assert_eq!(
        rig.reconciler.applied(),
        AppliedState {
            light: true,
            alarm: true,
            position: false
        }
    );
}

#[test]
fn fields_are_fetched_light_alarm_position() {
    let mut rig = Rig::new();
    rig.cycle();
    rig.cycle();
    assert_eq!(
        rig.store.gets,
        vec![LIGHT, ALARM, POSITION, LIGHT, ALARM, POSITION]
    );
}

#[test]
fn rejected_step_does_not_abort_sweep() {
    let mut rig = Rig::new();
    rig.hw.reject_angles = vec![45];
    rig.store.script_values(POSITION, &[true]);
    rig.cycle();

    assert!(!rig.hw.angles().contains(&45));
    assert_eq!(rig.hw.angles().last(), Some(&90));
    assert_eq!(
        rig.sink.count(|e| matches!(e, NodeEvent::SweepStepRejected { angle: 45, .. })),
        1
    );
    assert!(rig
        .sink
        .events
        .contains(&NodeEvent::SweepFinished { steps: 19 }));
    assert!(rig.reconciler.applied().position);
}

#[test]
fn baseline_drives_every_output_to_rest() {
    let mut rig = Rig::new();
    rig.reconciler.apply_baseline(&mut rig.hw, &mut rig.sink);
    assert_eq!(
        rig.hw.calls,
        vec![
            ActuatorCall::Light(false),
            ActuatorCall::Alarm(false),
            ActuatorCall::Angle(0)
        ]
    );
    assert_eq!(rig.sink.events, vec![NodeEvent::BaselineApplied]);
}

#[test]
fn link_down_skips_remote_work() {
    let mut task = ReconcilerTask {
        reconciler: Reconciler::from_config(&NodeConfig::default()),
        store: ScriptedStore::new(),
        hw: MockHardware::new(),
        link: FixedLink(false),
        delay: InstantDelay::default(),
        sink: RecordingSink::new(),
    };
    assert!(block_on(task.tick()).is_none());
    assert!(task.store.gets.is_empty());
    assert!(task.hw.calls.is_empty());
    assert_eq!(task.sink.events, vec![NodeEvent::LinkDown]);

    task.link = FixedLink(true);
    task.store.script_values(ALARM, &[true]);
    let report = block_on(task.tick()).unwrap();
    assert_eq!(report.outcome(CommandField::Alarm), FieldOutcome::Applied(true));
}
