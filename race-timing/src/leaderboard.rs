//! Leaderboard and final ranking
//!
//! Ranking order is the same live and at finalization: most laps first,
//! then lowest total time (results without a total time sort last), then
//! best lap time, then rider id. The two trailing keys make the order total
//! so equal (laps, time) pairs cannot flap between queries.
//!
//! Live queries never mutate stored results; `position` is written exactly
//! once, by the finalization pass that runs when an event stops.

use crate::types::{RaceResult, RiderId, RiderStatus};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;

/// One row of a live or final leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based rank in display order
    pub position: u32,
    pub rider_id: RiderId,
    pub total_laps: u32,
    pub total_time: Option<Duration>,
    pub best_lap_time: Option<Duration>,
    pub average_lap_time: Option<Duration>,
    pub status: RiderStatus,
}

/// Ranking order shared by live standings and finalization
fn rank_order(a: &RaceResult, b: &RaceResult) -> Ordering {
    b.total_laps
        .cmp(&a.total_laps)
        .then_with(|| cmp_missing_last(a.total_time, b.total_time))
        .then_with(|| cmp_missing_last(a.best_lap_time, b.best_lap_time))
        .then_with(|| a.rider_id.cmp(&b.rider_id))
}

/// Ascending order with `None` sorting after every `Some`
fn cmp_missing_last(a: Option<Duration>, b: Option<Duration>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Compute the live leaderboard for a set of results
///
/// Pure derivation: ranks are assigned for display only and nothing is
/// written back to the results.
pub fn standings(results: &[RaceResult]) -> Vec<LeaderboardEntry> {
    let mut ordered: Vec<&RaceResult> = results.iter().collect();
    ordered.sort_by(|a, b| rank_order(a, b));

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, r)| LeaderboardEntry {
            position: i as u32 + 1,
            rider_id: r.rider_id,
            total_laps: r.total_laps,
            total_time: r.total_time,
            best_lap_time: r.best_lap_time,
            average_lap_time: r.average_lap_time,
            status: r.status,
        })
        .collect()
}

/// Finalize results when an event stops
///
/// Writes `position` 1..N into every result in ranking order and moves
/// riders still `Racing` to `Finished`. Terminal statuses (DNF, DNS,
/// disqualified) keep their status but still receive a position.
pub fn finalize(results: &mut [RaceResult]) {
    results.sort_by(rank_order);
    for (i, result) in results.iter_mut().enumerate() {
        result.position = Some(i as u32 + 1);
        if result.status == RiderStatus::Racing {
            result.status = RiderStatus::Finished;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(rider_id: RiderId, laps: u32, total_secs: Option<u64>) -> RaceResult {
        RaceResult {
            event_id: 1,
            rider_id,
            total_laps: laps,
            total_time: total_secs.map(Duration::from_secs),
            best_lap_time: None,
            average_lap_time: None,
            position: None,
            status: RiderStatus::Racing,
        }
    }

    #[test]
    fn test_more_laps_ranks_first() {
        // A:5 laps/300s, B:5 laps/295s, C:4 laps
        let results = vec![
            result(1, 5, Some(300)),
            result(2, 5, Some(295)),
            result(3, 4, Some(280)),
        ];

        let board = standings(&results);
        let order: Vec<_> = board.iter().map(|e| e.rider_id).collect();
        assert_eq!(order, vec![2, 1, 3]);
        assert_eq!(board[0].position, 1);
        assert_eq!(board[2].position, 3);
    }

    #[test]
    fn test_missing_total_time_sorts_last() {
        let results = vec![result(1, 3, None), result(2, 3, Some(500))];
        let board = standings(&results);
        assert_eq!(board[0].rider_id, 2);
        assert_eq!(board[1].rider_id, 1);
    }

    #[test]
    fn test_tie_break_falls_to_best_lap_then_rider_id() {
        let mut a = result(1, 5, Some(300));
        a.best_lap_time = Some(Duration::from_secs(58));
        let mut b = result(2, 5, Some(300));
        b.best_lap_time = Some(Duration::from_secs(55));

        let board = standings(&[a, b]);
        assert_eq!(board[0].rider_id, 2);

        // Full tie: lowest rider id wins
        let board = standings(&[result(4, 2, Some(100)), result(3, 2, Some(100))]);
        assert_eq!(board[0].rider_id, 3);
    }

    #[test]
    fn test_standings_do_not_mutate() {
        let results = vec![result(1, 5, Some(300))];
        let _ = standings(&results);
        assert_eq!(results[0].position, None);
        assert_eq!(results[0].status, RiderStatus::Racing);
    }

    #[test]
    fn test_finalize_assigns_positions_and_statuses() {
        let mut dnf = result(3, 1, Some(90));
        dnf.status = RiderStatus::Dnf;
        let mut results = vec![result(1, 5, Some(300)), result(2, 5, Some(295)), dnf];

        finalize(&mut results);

        let by_rider = |id: RiderId| results.iter().find(|r| r.rider_id == id).unwrap().clone();
        assert_eq!(by_rider(2).position, Some(1));
        assert_eq!(by_rider(1).position, Some(2));
        assert_eq!(by_rider(2).status, RiderStatus::Finished);

        // DNF keeps its status but still gets ranked
        assert_eq!(by_rider(3).position, Some(3));
        assert_eq!(by_rider(3).status, RiderStatus::Dnf);
    }

    #[test]
    fn test_finalize_positions_are_gapless() {
        let mut results: Vec<_> = (1..=6).map(|id| result(id, id as u32, Some(100))).collect();
        finalize(&mut results);

        let mut positions: Vec<_> = results.iter().map(|r| r.position.unwrap()).collect();
        positions.sort();
        assert_eq!(positions, vec![1, 2, 3, 4, 5, 6]);
    }
}
