//! Telemetry publisher against recording mocks and the simulated GPS.

use railgate::app::events::NodeEvent;
use railgate::app::model::LocationSample;
use railgate::app::telemetry::{PublishOutcome, TelemetryPublisher};
use railgate::config::NodeConfig;
use railgate::error::{StoreError, TransportCause};
use railgate::scheduler::TelemetryTask;
use railgate::sensors::gps::{nmea_checksum, GpsReader};

use crate::mock_hw::{FixedLink, InstantDelay, RecordingSink, ScriptedGps, ScriptedStore};

fn publisher() -> TelemetryPublisher {
    TelemetryPublisher::from_config(&NodeConfig::default())
}

fn rmc(body: &str) -> String {
    format!("${}*{:02X}", body, nmea_checksum(body))
}

#[test]
fn sentinel_samples_are_never_published() {
    let mut gps = ScriptedGps::new([
        LocationSample::NO_FIX,
        LocationSample::new(12.34, 56.78),
        LocationSample::NO_FIX,
    ]);
    let mut store = ScriptedStore::new();
    let mut sink = RecordingSink::new();
    let mut p = publisher();

    let outcomes: Vec<PublishOutcome> = (0..3)
        .map(|_| p.publish_cycle(&mut gps, &mut store, &mut sink))
        .collect();

    assert_eq!(outcomes[0], PublishOutcome::NoFix);
    assert_eq!(outcomes[2], PublishOutcome::NoFix);
    assert_eq!(store.puts.len(), 1);
    assert_eq!(
        store.puts[0],
        (
            "gps".to_string(),
            serde_json::json!({ "latitude": 12.34, "longitude": 56.78 })
        )
    );
    assert_eq!(p.published_count(), 1);
    assert_eq!(p.skipped_count(), 2);
}

#[test]
fn failed_publish_is_dropped_and_next_cycle_proceeds() {
    let sample = LocationSample::new(12.34, 56.78);
    let mut gps = ScriptedGps::new([sample, sample]);
    let mut store = ScriptedStore::new();
    let failure = StoreError::Transport(TransportCause::Status(500));
    store.put_results.push_back(Err(failure));
    let mut sink = RecordingSink::new();
    let mut p = publisher();

    assert_eq!(
        p.publish_cycle(&mut gps, &mut store, &mut sink),
        PublishOutcome::Failed(failure)
    );
    assert_eq!(
        p.publish_cycle(&mut gps, &mut store, &mut sink),
        PublishOutcome::Published(sample)
    );
    assert_eq!(store.puts.len(), 2);
    assert_eq!(
        sink.events,
        vec![
            NodeEvent::TelemetryFailed(failure),
            NodeEvent::TelemetryPublished(sample)
        ]
    );
}

#[test]
fn simulated_receiver_feeds_the_gps_document() {
    let mut gps = GpsReader::new().unwrap();
    gps.sim_push_sentence(&rmc("GPRMC,123519,V,,,,,,,230394,,"));
    let mut store = ScriptedStore::new();
    let mut sink = RecordingSink::new();
    let mut p = publisher();

    assert_eq!(p.publish_cycle(&mut gps, &mut store, &mut sink), PublishOutcome::NoFix);
    assert!(store.puts.is_empty());

    gps.sim_push_sentence(&rmc(
        "GPRMC,123520,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W",
    ));
    assert!(matches!(
        p.publish_cycle(&mut gps, &mut store, &mut sink),
        PublishOutcome::Published(_)
    ));

    let (path, doc) = &store.puts[0];
    assert_eq!(path, "gps");
    let lat = doc["latitude"].as_f64().unwrap();
    let lon = doc["longitude"].as_f64().unwrap();
    assert!((lat - 48.1173).abs() < 1e-6);
    assert!((lon - 11.516_666_7).abs() < 1e-6);
}

#[test]
fn link_down_skips_the_sensor_read() {
    let mut task = TelemetryTask {
        publisher: publisher(),
        gps: ScriptedGps::new([LocationSample::new(1.0, 2.0)]),
        store: ScriptedStore::new(),
        link: FixedLink(false),
        delay: InstantDelay::default(),
        sink: RecordingSink::new(),
    };
    assert!(task.tick().is_none());
    assert_eq!(task.gps.samples.len(), 1);
    assert!(task.store.puts.is_empty());

    task.link = FixedLink(true);
    assert!(matches!(task.tick(), Some(PublishOutcome::Published(_))));
}
