//! Race timing engine
//!
//! Turns validated tag detections into laps and results. Detections arrive
//! from multiple readers concurrently; lap-number assignment and result
//! recomputation are serialized per event so two simultaneous crossings can
//! never read a stale lap count.
//!
//! The engine never raises for noisy steady-state input. Unknown tags,
//! detections outside an active event and laps rejected by the race-type
//! bounds are dropped and reported through [`Outcome`]; only storage
//! failures surface as errors.

use crate::broadcast::RaceBroadcast;
use crate::leaderboard::{self, LeaderboardEntry};
use crate::store::RaceStore;
use crate::types::{
    format_duration, EventId, Lap, RaceEvent, RaceResult, RaceType, Result, RiderId,
    RiderStatus, Timestamp,
};
use rfid_reader::TagDetection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the engine did with one detection
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The detection produced a lap
    LapRecorded(Lap),
    /// The detection was dropped without any mutation
    Dropped(DropReason),
}

/// Why a detection produced no lap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No rider registered for the tag
    UnknownTag,
    /// No event is currently active
    NoActiveEvent,
    /// The active event has no start time yet
    NotStarted,
    /// Timestamp earlier than the rider's previous lap
    OutOfOrder,
    /// Lap-based race already at its lap ceiling
    LapLimitReached,
    /// Time-based race already past its duration ceiling
    TimeLimitReached,
}

/// The race timing engine
pub struct RaceEngine<S: RaceStore> {
    store: Arc<S>,
    broadcast: Arc<dyn RaceBroadcast>,
    event_locks: Mutex<HashMap<EventId, Arc<Mutex<()>>>>,
}

impl<S: RaceStore> RaceEngine<S> {
    pub fn new(store: Arc<S>, broadcast: Arc<dyn RaceBroadcast>) -> Self {
        Self {
            store,
            broadcast,
            event_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Start an event: activate it and stamp the start time
    pub fn start_event(&self, event_id: EventId, now: Timestamp) -> Result<()> {
        let mut event = self.store.get_event(event_id)?;
        event.is_active = true;
        event.start_time = Some(now);
        event.end_time = None;
        self.store.update_event(event.clone())?;
        log::info!("Started event {}: {}", event_id, event.name);
        Ok(())
    }

    /// Stop an event and run the one-time finalization pass
    ///
    /// Returns the final standings in position order.
    pub fn stop_event(&self, event_id: EventId, now: Timestamp) -> Result<Vec<LeaderboardEntry>> {
        let mut event = self.store.get_event(event_id)?;
        event.is_active = false;
        event.end_time = Some(now);
        self.store.update_event(event.clone())?;

        // Final ranking happens under the event lock so a crossing racing
        // the stop cannot interleave with position assignment
        let lock = self.event_lock(event_id);
        let _guard = lock.lock().unwrap();

        let mut results = self.store.results_for_event(event_id);
        leaderboard::finalize(&mut results);
        for result in &results {
            self.store.upsert_result(result.clone())?;
        }

        log::info!("Stopped event {}: {}", event_id, event.name);
        Ok(leaderboard::standings(&results))
    }

    /// Process one validated tag detection
    ///
    /// This is the single ingestion entry point all readers funnel into.
    /// Safe to call concurrently from any number of reader threads.
    pub fn process_detection(&self, detection: &TagDetection) -> Result<Outcome> {
        let rider = match self.store.rider_by_tag(&detection.tag_id) {
            Some(rider) => rider,
            None => {
                log::warn!("Unknown RFID tag: {}", detection.tag_id);
                return Ok(Outcome::Dropped(DropReason::UnknownTag));
            }
        };

        let event = match self.store.get_active_event() {
            Some(event) => event,
            None => {
                log::debug!(
                    "Tag {} read with no active event, dropped",
                    detection.tag_id
                );
                return Ok(Outcome::Dropped(DropReason::NoActiveEvent));
            }
        };

        let start_time = match event.start_time {
            Some(start_time) => start_time,
            None => {
                log::warn!("Event {} active without a start time", event.id);
                return Ok(Outcome::Dropped(DropReason::NotStarted));
            }
        };

        self.broadcast.tag_reading(
            event.id,
            &detection.tag_id,
            &detection.reader_id,
            detection.timestamp,
        );

        let lock = self.event_lock(event.id);
        let _guard = lock.lock().unwrap();

        // Re-check under the lock: the event may have been stopped while
        // this detection waited its turn
        let event = self.store.get_event(event.id)?;
        if !event.is_active {
            return Ok(Outcome::Dropped(DropReason::NoActiveEvent));
        }

        self.process_lap(&event, rider.id, start_time, detection.timestamp)
    }

    /// Mark a rider DNF/DNS/disqualified (operator action)
    ///
    /// Creates the result if the rider never produced a lap, so a DNS rider
    /// still appears in the final classification.
    pub fn mark_status(
        &self,
        event_id: EventId,
        rider_id: RiderId,
        status: RiderStatus,
    ) -> Result<()> {
        let mut result = self
            .store
            .result_for(event_id, rider_id)
            .unwrap_or_else(|| RaceResult::new(event_id, rider_id));
        result.status = status;
        self.store.upsert_result(result)?;
        log::info!(
            "Rider {} in event {} marked {}",
            rider_id,
            event_id,
            status
        );
        Ok(())
    }

    /// Current live standings for an event (no mutation)
    pub fn live_leaderboard(&self, event_id: EventId) -> Vec<LeaderboardEntry> {
        leaderboard::standings(&self.store.results_for_event(event_id))
    }

    /// Lap assignment and acceptance, serialized per event by the caller
    fn process_lap(
        &self,
        event: &RaceEvent,
        rider_id: RiderId,
        start_time: Timestamp,
        timestamp: Timestamp,
    ) -> Result<Outcome> {
        let laps = self.store.laps_for(event.id, rider_id);
        let lap_number = laps.len() as u32 + 1;

        let total_time = match (timestamp - start_time).to_std() {
            Ok(total_time) => total_time,
            Err(_) => {
                log::warn!(
                    "Rider {} detection predates event {} start, dropped",
                    rider_id,
                    event.id
                );
                return Ok(Outcome::Dropped(DropReason::OutOfOrder));
            }
        };

        let lap_time = match laps.last() {
            Some(previous) => match (timestamp - previous.timestamp).to_std() {
                Ok(lap_time) => lap_time,
                Err(_) => {
                    log::warn!(
                        "Rider {} detection out of order in event {}, dropped",
                        rider_id,
                        event.id
                    );
                    return Ok(Outcome::Dropped(DropReason::OutOfOrder));
                }
            },
            // First lap runs from the event start
            None => total_time,
        };

        if let Some(reason) = rejection(event, lap_number, total_time) {
            log::debug!(
                "Lap {} not accepted for rider {} in event {} ({:?})",
                lap_number,
                rider_id,
                event.id,
                reason
            );
            return Ok(Outcome::Dropped(reason));
        }

        let lap = Lap {
            event_id: event.id,
            rider_id,
            lap_number,
            lap_time: Some(lap_time),
            total_time,
            timestamp,
        };
        self.store.append_lap(lap.clone())?;
        log::info!(
            "Lap {} recorded for rider {}: {}",
            lap_number,
            rider_id,
            format_duration(lap_time)
        );

        self.update_result(event.id, rider_id)?;
        self.broadcast.lap_recorded(&lap);
        self.broadcast
            .leaderboard_updated(event.id, &self.live_leaderboard(event.id));

        Ok(Outcome::LapRecorded(lap))
    }

    /// Recompute a rider's aggregate from their persisted laps
    fn update_result(&self, event_id: EventId, rider_id: RiderId) -> Result<()> {
        let laps = self.store.laps_for(event_id, rider_id);
        if laps.is_empty() {
            return Ok(());
        }

        let mut result = self
            .store
            .result_for(event_id, rider_id)
            .unwrap_or_else(|| RaceResult::new(event_id, rider_id));

        let lap_times: Vec<Duration> = laps.iter().filter_map(|l| l.lap_time).collect();

        result.total_laps = laps.len() as u32;
        // Per-rider timestamps are non-decreasing, so the last lap carries
        // the running total
        result.total_time = laps.last().map(|l| l.total_time);
        result.best_lap_time = lap_times.iter().min().copied();
        result.average_lap_time = if lap_times.is_empty() {
            None
        } else {
            Some(lap_times.iter().sum::<Duration>() / lap_times.len() as u32)
        };

        self.store.upsert_result(result)
    }

    fn event_lock(&self, event_id: EventId) -> Arc<Mutex<()>> {
        self.event_locks
            .lock()
            .unwrap()
            .entry(event_id)
            .or_default()
            .clone()
    }
}

/// Race-type acceptance rules
///
/// Both bounds are inclusive: the lap exactly at `max_laps`, or the
/// crossing exactly at `max_duration`, still counts.
fn rejection(event: &RaceEvent, lap_number: u32, total_time: Duration) -> Option<DropReason> {
    match event.race_type {
        RaceType::Laps => match event.max_laps {
            Some(max_laps) if lap_number > max_laps => Some(DropReason::LapLimitReached),
            _ => None,
        },
        RaceType::Time => match event.max_duration {
            Some(max_duration) if total_time > max_duration => {
                Some(DropReason::TimeLimitReached)
            }
            _ => None,
        },
    }
}
