//! Queue position assignment.
//!
//! Positions grow monotonically within a clinic day. A new tail is one past
//! both the highest position ever assigned and the highest position still
//! waiting, so a returning patient never lands in a slot someone else held.

use super::day_state::DayState;
use shared_types::{AppointmentId, QueueStatus};
use std::collections::HashSet;

pub struct PositionAssigner;

impl PositionAssigner {
    /// Position the next appended entry would receive.
    #[must_use]
    pub fn next_tail(state: &DayState) -> u64 {
        state
            .position_high_water()
            .max(state.max_waiting_position().unwrap_or(0))
            + 1
    }

    /// Reserve and return the next tail position.
    pub fn assign_tail(state: &mut DayState) -> u64 {
        let position = Self::next_tail(state);
        state.raise_high_water(position);
        position
    }

    /// Whether every waiting entry holds a distinct position.
    #[must_use]
    pub fn positions_unique(state: &DayState) -> bool {
        let mut seen = HashSet::new();
        state
            .entries()
            .filter(|e| matches!(e.status, QueueStatus::Waiting | QueueStatus::Scheduled))
            .filter_map(|e| e.queue_position)
            .all(|p| seen.insert(p))
    }

    /// Waiting entries whose position is missing.
    #[must_use]
    pub fn unpositioned_waiting(state: &DayState) -> Vec<AppointmentId> {
        state
            .entries()
            .filter(|e| e.status == QueueStatus::Waiting && e.queue_position.is_none())
            .map(|e| e.id)
            .collect()
    }
}
