//! Broadcast collaborator interface
//!
//! The engine emits domain events for a collaborator to forward to live
//! viewers; the wire protocol of that fan-out is not defined here.

use crate::leaderboard::LeaderboardEntry;
use crate::types::{EventId, Lap, Timestamp};

/// Sink for live domain events produced by the engine
pub trait RaceBroadcast: Send + Sync {
    /// A detection was resolved to a rider in an active event
    fn tag_reading(&self, event_id: EventId, tag_id: &str, reader_id: &str, timestamp: Timestamp);

    /// A lap was accepted and persisted
    fn lap_recorded(&self, lap: &Lap);

    /// Standings changed following a result mutation
    fn leaderboard_updated(&self, event_id: EventId, standings: &[LeaderboardEntry]);
}

/// Broadcast implementation that writes to the log
///
/// Stands in wherever no live fan-out is attached (the daemon without a
/// push channel, tests that don't inspect broadcasts).
#[derive(Default)]
pub struct LogBroadcast;

impl RaceBroadcast for LogBroadcast {
    fn tag_reading(&self, event_id: EventId, tag_id: &str, reader_id: &str, _timestamp: Timestamp) {
        log::debug!(
            "Broadcast tag_reading: event={} tag={} reader={}",
            event_id,
            tag_id,
            reader_id
        );
    }

    fn lap_recorded(&self, lap: &Lap) {
        log::debug!(
            "Broadcast lap_recorded: event={} rider={} lap={}",
            lap.event_id,
            lap.rider_id,
            lap.lap_number
        );
    }

    fn leaderboard_updated(&self, event_id: EventId, standings: &[LeaderboardEntry]) {
        log::debug!(
            "Broadcast leaderboard_updated: event={} entries={}",
            event_id,
            standings.len()
        );
        // Same JSON payload a live fan-out would forward
        if log::log_enabled!(log::Level::Trace) {
            match serde_json::to_string(standings) {
                Ok(payload) => log::trace!("leaderboard payload: {}", payload),
                Err(e) => log::trace!("leaderboard payload unserializable: {}", e),
            }
        }
    }
}
