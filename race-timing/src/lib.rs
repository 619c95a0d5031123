//! Race Timing Library
//!
//! Application layer of the RFID race timing system. It consumes validated
//! tag detections from the rfid-reader library and adds:
//! - The domain model (events, riders, laps, results)
//! - The race timing engine (lap assignment, race-type acceptance rules)
//! - Live and final leaderboards
//! - Collaborator interfaces for persistence and live broadcast
//!
//! Lap sequencing is the invariant everything else leans on: per rider and
//! event, lap numbers run 1, 2, 3, ... with no gaps or repeats, and the
//! engine serializes concurrent detections per event to keep it that way.
//!
//! # Example Usage
//!
//! ```
//! use race_timing::{
//!     LogBroadcast, MemoryStore, RaceEngine, RaceEvent, RaceMode, RaceType, Rider,
//! };
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! store.add_event(
//!     RaceEvent::new(1, "Heat 1", RaceMode::Motocross, RaceType::Laps).with_max_laps(10),
//! );
//! store.add_rider(Rider {
//!     id: 1,
//!     name: "A. Rider".into(),
//!     number: 42,
//!     team: None,
//!     category: "MX1".into(),
//!     tag_id: "AABBCCDD".into(),
//! });
//!
//! let engine = RaceEngine::new(store, Arc::new(LogBroadcast));
//! engine.start_event(1, chrono::Utc::now()).unwrap();
//! // readers feed engine.process_detection(...) while the event runs
//! let standings = engine.stop_event(1, chrono::Utc::now()).unwrap();
//! assert!(standings.is_empty());
//! ```

// Public modules
pub mod broadcast;
pub mod engine;
pub mod leaderboard;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use broadcast::{LogBroadcast, RaceBroadcast};
pub use engine::{DropReason, Outcome, RaceEngine};
pub use leaderboard::{finalize, standings, LeaderboardEntry};
pub use store::{MemoryStore, RaceStore};
pub use types::{
    format_duration, EventId, Lap, RaceError, RaceEvent, RaceMode, RaceResult, RaceType,
    Result, Rider, RiderId, RiderStatus, Timestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
