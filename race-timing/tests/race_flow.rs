//! Full pipeline test: TCP reader -> engine -> leaderboard
//!
//! Plays a race against a real socket: a fake reader device writes tag
//! frames, the TCP reader decodes and filters them, the engine scores them
//! and the final classification is checked.

use race_timing::{
    LeaderboardEntry, Lap, MemoryStore, Outcome, RaceBroadcast, RaceEngine, RaceEvent, RaceMode,
    RaceType, Rider, RiderStatus, Timestamp,
};
use rfid_reader::{ReaderConfig, ReaderRegistry, TcpIpConfig};
use std::io::Write;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Broadcast stub that records everything it is handed
#[derive(Default)]
struct RecordingBroadcast {
    tag_readings: Mutex<Vec<String>>,
    laps: Mutex<Vec<Lap>>,
}

impl RaceBroadcast for RecordingBroadcast {
    fn tag_reading(&self, _event_id: i64, tag_id: &str, _reader_id: &str, _timestamp: Timestamp) {
        self.tag_readings.lock().unwrap().push(tag_id.to_string());
    }

    fn lap_recorded(&self, lap: &Lap) {
        self.laps.lock().unwrap().push(lap.clone());
    }

    fn leaderboard_updated(&self, _event_id: i64, _standings: &[LeaderboardEntry]) {}
}

fn rider(id: i64, number: u32, name: &str, tag: &str) -> Rider {
    Rider {
        id,
        name: name.into(),
        number,
        team: None,
        category: "MX1".into(),
        tag_id: tag.into(),
    }
}

fn wait_for(mut check: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !check() {
        assert!(Instant::now() < deadline, "timed out waiting for condition");
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn test_detections_become_laps_and_standings() {
    let store = Arc::new(MemoryStore::new());
    store.add_event(
        RaceEvent::new(1, "Heat 1", RaceMode::Motocross, RaceType::Laps).with_max_laps(5),
    );
    store.add_rider(rider(1, 42, "A. Fast", "AABBCCDD"));
    store.add_rider(rider(2, 7, "B. Steady", "11223344"));

    let broadcast = Arc::new(RecordingBroadcast::default());
    let engine = Arc::new(RaceEngine::new(Arc::clone(&store), broadcast.clone()));
    engine.start_event(1, chrono::Utc::now()).unwrap();

    // Fake reader device
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut config = TcpIpConfig::new("finish_line", "127.0.0.1").with_port(port);
    config.read_timeout_ms = 100;
    config.anti_bounce_secs = 0.0; // consecutive crossings arrive fast here
    let registry = ReaderRegistry::from_configs(&[ReaderConfig::TcpIp(config)]).unwrap();

    let handler = {
        let engine = Arc::clone(&engine);
        Arc::new(move |detection: rfid_reader::TagDetection| {
            let _ = engine.process_detection(&detection);
        })
    };
    registry.start_all(handler).unwrap();

    let (mut conn, _) = listener.accept().unwrap();
    conn.write_all(b"AABBCCDD,-50.1,1\r\n").unwrap();
    conn.write_all(b"11223344\r\n").unwrap();
    conn.write_all(b"DEADBEEF\r\n").unwrap(); // nobody registered this tag
    conn.write_all(b"AABBCCDD\r\n").unwrap();

    wait_for(|| store.lap_count() == 3);
    registry.stop_all();

    let standings = engine.stop_event(1, chrono::Utc::now()).unwrap();
    assert_eq!(standings.len(), 2);
    assert_eq!(standings[0].rider_id, 1); // two laps beat one
    assert_eq!(standings[0].total_laps, 2);
    assert_eq!(standings[0].position, 1);
    assert_eq!(standings[0].status, RiderStatus::Finished);
    assert_eq!(standings[1].rider_id, 2);

    // The unknown tag was resolved-and-dropped before any broadcast
    let readings = broadcast.tag_readings.lock().unwrap();
    assert_eq!(readings.len(), 3);
    assert!(!readings.iter().any(|t| t == "DEADBEEF"));

    let laps = broadcast.laps.lock().unwrap();
    assert_eq!(laps.len(), 3);
    assert!(laps.iter().all(|l| l.event_id == 1));
}

#[test]
fn test_detections_after_stop_are_dropped() {
    let store = Arc::new(MemoryStore::new());
    store.add_event(
        RaceEvent::new(1, "Heat 2", RaceMode::Motocross, RaceType::Laps).with_max_laps(5),
    );
    store.add_rider(rider(1, 42, "A. Fast", "AABBCCDD"));

    let engine = RaceEngine::new(
        Arc::clone(&store),
        Arc::new(RecordingBroadcast::default()),
    );
    engine.start_event(1, chrono::Utc::now()).unwrap();
    engine.stop_event(1, chrono::Utc::now()).unwrap();

    let outcome = engine
        .process_detection(&rfid_reader::TagDetection::new("AABBCCDD", "finish_line"))
        .unwrap();
    assert!(matches!(outcome, Outcome::Dropped(_)));
    assert_eq!(store.lap_count(), 0);
}
