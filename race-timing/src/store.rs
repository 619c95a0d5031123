//! Persistence collaborator interface
//!
//! The engine consumes storage through [`RaceStore`]; durable storage is an
//! external concern. [`MemoryStore`] is the in-process implementation used
//! by the daemon and the tests.

use crate::types::{
    EventId, Lap, RaceError, RaceEvent, RaceResult, Result, Rider, RiderId,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Storage operations the timing engine depends on
pub trait RaceStore: Send + Sync {
    /// Fetch an event by id
    fn get_event(&self, event_id: EventId) -> Result<RaceEvent>;

    /// The currently active event, if any
    fn get_active_event(&self) -> Option<RaceEvent>;

    /// Persist event changes (activation, start/end times)
    fn update_event(&self, event: RaceEvent) -> Result<()>;

    /// Resolve a tag identifier to its rider
    fn rider_by_tag(&self, tag_id: &str) -> Option<Rider>;

    /// Append an immutable lap record
    fn append_lap(&self, lap: Lap) -> Result<()>;

    /// All laps for a rider within an event, in lap-number order
    fn laps_for(&self, event_id: EventId, rider_id: RiderId) -> Vec<Lap>;

    /// Insert or replace a rider's result
    fn upsert_result(&self, result: RaceResult) -> Result<()>;

    /// A rider's result within an event, if one exists
    fn result_for(&self, event_id: EventId, rider_id: RiderId) -> Option<RaceResult>;

    /// All results for an event
    fn results_for_event(&self, event_id: EventId) -> Vec<RaceResult>;
}

/// In-memory store backing the daemon and the tests
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    events: HashMap<EventId, RaceEvent>,
    riders: Vec<Rider>,
    laps: Vec<Lap>,
    results: HashMap<(EventId, RiderId), RaceResult>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event
    pub fn add_event(&self, event: RaceEvent) {
        self.inner.lock().unwrap().events.insert(event.id, event);
    }

    /// Seed a rider
    pub fn add_rider(&self, rider: Rider) {
        self.inner.lock().unwrap().riders.push(rider);
    }

    /// Total number of laps across all events (test observability)
    pub fn lap_count(&self) -> usize {
        self.inner.lock().unwrap().laps.len()
    }
}

impl RaceStore for MemoryStore {
    fn get_event(&self, event_id: EventId) -> Result<RaceEvent> {
        self.inner
            .lock()
            .unwrap()
            .events
            .get(&event_id)
            .cloned()
            .ok_or(RaceError::EventNotFound(event_id))
    }

    fn get_active_event(&self) -> Option<RaceEvent> {
        self.inner
            .lock()
            .unwrap()
            .events
            .values()
            .find(|e| e.is_active)
            .cloned()
    }

    fn update_event(&self, event: RaceEvent) -> Result<()> {
        self.inner.lock().unwrap().events.insert(event.id, event);
        Ok(())
    }

    fn rider_by_tag(&self, tag_id: &str) -> Option<Rider> {
        self.inner
            .lock()
            .unwrap()
            .riders
            .iter()
            .find(|r| r.tag_id == tag_id)
            .cloned()
    }

    fn append_lap(&self, lap: Lap) -> Result<()> {
        self.inner.lock().unwrap().laps.push(lap);
        Ok(())
    }

    fn laps_for(&self, event_id: EventId, rider_id: RiderId) -> Vec<Lap> {
        let mut laps: Vec<_> = self
            .inner
            .lock()
            .unwrap()
            .laps
            .iter()
            .filter(|l| l.event_id == event_id && l.rider_id == rider_id)
            .cloned()
            .collect();
        laps.sort_by_key(|l| l.lap_number);
        laps
    }

    fn upsert_result(&self, result: RaceResult) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .results
            .insert((result.event_id, result.rider_id), result);
        Ok(())
    }

    fn result_for(&self, event_id: EventId, rider_id: RiderId) -> Option<RaceResult> {
        self.inner
            .lock()
            .unwrap()
            .results
            .get(&(event_id, rider_id))
            .cloned()
    }

    fn results_for_event(&self, event_id: EventId) -> Vec<RaceResult> {
        self.inner
            .lock()
            .unwrap()
            .results
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RaceMode, RaceType, RiderStatus};
    use chrono::Utc;
    use std::time::Duration;

    fn rider(id: RiderId, tag: &str) -> Rider {
        Rider {
            id,
            name: format!("Rider {}", id),
            number: id as u32,
            team: None,
            category: "MX1".into(),
            tag_id: tag.into(),
        }
    }

    #[test]
    fn test_rider_lookup_by_tag() {
        let store = MemoryStore::new();
        store.add_rider(rider(1, "AABBCCDD"));

        assert_eq!(store.rider_by_tag("AABBCCDD").unwrap().id, 1);
        assert!(store.rider_by_tag("11223344").is_none());
    }

    #[test]
    fn test_laps_returned_in_lap_order() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for n in [2u32, 1, 3] {
            store
                .append_lap(Lap {
                    event_id: 1,
                    rider_id: 1,
                    lap_number: n,
                    lap_time: Some(Duration::from_secs(90)),
                    total_time: Duration::from_secs(90 * n as u64),
                    timestamp: base,
                })
                .unwrap();
        }

        let numbers: Vec<_> = store.laps_for(1, 1).iter().map(|l| l.lap_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_active_event_lookup() {
        let store = MemoryStore::new();
        let mut event = RaceEvent::new(1, "Heat 1", RaceMode::Motocross, RaceType::Laps);
        store.add_event(event.clone());
        assert!(store.get_active_event().is_none());

        event.is_active = true;
        store.update_event(event).unwrap();
        assert_eq!(store.get_active_event().unwrap().id, 1);
    }

    #[test]
    fn test_result_upsert_replaces() {
        let store = MemoryStore::new();
        let mut result = RaceResult::new(1, 1);
        result.total_laps = 1;
        store.upsert_result(result.clone()).unwrap();

        result.total_laps = 2;
        result.status = RiderStatus::Racing;
        store.upsert_result(result).unwrap();

        assert_eq!(store.result_for(1, 1).unwrap().total_laps, 2);
        assert_eq!(store.results_for_event(1).len(), 1);
    }
}
