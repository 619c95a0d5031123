//! Domain model for race timing
//!
//! Events, riders, laps and results. Laps are append-only and immutable
//! once created; results are the mutable per-rider aggregate recomputed
//! after every accepted lap. All durations are `std::time::Duration` -
//! floating-point seconds exist only at the presentation edge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Wall-clock timestamp used for records
pub type Timestamp = DateTime<Utc>;

/// Event identifier
pub type EventId = i64;

/// Rider identifier
pub type RiderId = i64;

/// Result type for race operations
pub type Result<T> = std::result::Result<T, RaceError>;

/// Race discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceMode {
    Motocross,
    Enduro,
}

/// What ends the race: a lap ceiling or a duration ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceType {
    /// Time-based: laps count while total time <= max_duration
    Time,
    /// Lap-based: laps count while lap_number <= max_laps
    Laps,
}

/// Rider classification within an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiderStatus {
    /// Still on track
    Racing,
    /// Crossed into a final classification at event stop
    Finished,
    /// Did not finish
    Dnf,
    /// Did not start
    Dns,
    /// Disqualified
    Disqualified,
}

impl fmt::Display for RiderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiderStatus::Racing => write!(f, "racing"),
            RiderStatus::Finished => write!(f, "finished"),
            RiderStatus::Dnf => write!(f, "dnf"),
            RiderStatus::Dns => write!(f, "dns"),
            RiderStatus::Disqualified => write!(f, "disqualified"),
        }
    }
}

/// A registered rider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rider {
    pub id: RiderId,
    pub name: String,
    /// Race number on the plate
    pub number: u32,
    pub team: Option<String>,
    pub category: String,
    /// EPC of the rider's transponder, hex string
    pub tag_id: String,
}

/// A timed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceEvent {
    pub id: EventId,
    pub name: String,
    pub race_mode: RaceMode,
    pub race_type: RaceType,
    /// Lap ceiling for lap-based races
    pub max_laps: Option<u32>,
    /// Duration ceiling for time-based races
    pub max_duration: Option<Duration>,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub is_active: bool,
}

impl RaceEvent {
    pub fn new(id: EventId, name: impl Into<String>, race_mode: RaceMode, race_type: RaceType) -> Self {
        Self {
            id,
            name: name.into(),
            race_mode,
            race_type,
            max_laps: None,
            max_duration: None,
            start_time: None,
            end_time: None,
            is_active: false,
        }
    }

    /// Builder method: set the lap ceiling
    pub fn with_max_laps(mut self, max_laps: u32) -> Self {
        self.max_laps = Some(max_laps);
        self
    }

    /// Builder method: set the duration ceiling
    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }
}

/// One completed lap, immutable once created
///
/// `lap_number` is strictly increasing per (event, rider), starting at 1.
/// The first lap's `lap_time` equals its `total_time` (measured from the
/// event start).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    pub event_id: EventId,
    pub rider_id: RiderId,
    pub lap_number: u32,
    pub lap_time: Option<Duration>,
    /// Time from event start to this lap's line crossing
    pub total_time: Duration,
    pub timestamp: Timestamp,
}

/// Per-rider aggregate, recomputed after every accepted lap
///
/// `position` is populated only by finalization; live rankings are derived
/// without mutating stored results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub event_id: EventId,
    pub rider_id: RiderId,
    pub total_laps: u32,
    pub total_time: Option<Duration>,
    pub best_lap_time: Option<Duration>,
    pub average_lap_time: Option<Duration>,
    pub position: Option<u32>,
    pub status: RiderStatus,
}

impl RaceResult {
    /// Fresh result for a rider's first accepted lap
    pub fn new(event_id: EventId, rider_id: RiderId) -> Self {
        Self {
            event_id,
            rider_id,
            total_laps: 0,
            total_time: None,
            best_lap_time: None,
            average_lap_time: None,
            position: None,
            status: RiderStatus::Racing,
        }
    }
}

/// Errors that can occur in the race timing engine
///
/// Steady-state noise (unknown tags, inactive events, rejected laps) is
/// dropped, not raised - the engine reports those through its outcome type.
/// Errors are reserved for a missing event named explicitly by the caller
/// and for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RaceError {
    #[error("Event {0} not found")]
    EventNotFound(EventId),

    #[error("Store error: {0}")]
    Store(String),
}

/// Format a duration as `M:SS.mmm` for logs and leaderboard display
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let minutes = total_ms / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{}:{:02}.{:03}", minutes, seconds, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = RaceEvent::new(1, "Club MX", RaceMode::Motocross, RaceType::Laps)
            .with_max_laps(10);
        assert_eq!(event.max_laps, Some(10));
        assert!(event.max_duration.is_none());
        assert!(!event.is_active);
    }

    #[test]
    fn test_race_type_wire_names() {
        assert_eq!(serde_json::to_string(&RaceType::Time).unwrap(), "\"time\"");
        assert_eq!(serde_json::to_string(&RaceType::Laps).unwrap(), "\"laps\"");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(83_450)), "1:23.450");
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00.000");
        assert_eq!(format_duration(Duration::from_secs(600)), "10:00.000");
    }
}
