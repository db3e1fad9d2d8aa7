//! Value objects returned by queue operations and queries.

use super::entities::{AbsenceRecord, QueueEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{AppointmentId, DayKey, QueueStatus, StaffId};

/// Number of entries per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub scheduled: usize,
    pub waiting: usize,
    pub in_progress: usize,
    pub absent: usize,
    pub completed: usize,
    pub no_show: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub fn tally<'a>(entries: impl IntoIterator<Item = &'a QueueEntry>) -> Self {
        let mut counts = Self::default();
        for entry in entries {
            *counts.slot(entry.status) += 1;
        }
        counts
    }

    #[must_use]
    pub fn get(&self, status: QueueStatus) -> usize {
        match status {
            QueueStatus::Scheduled => self.scheduled,
            QueueStatus::Waiting => self.waiting,
            QueueStatus::InProgress => self.in_progress,
            QueueStatus::Absent => self.absent,
            QueueStatus::Completed => self.completed,
            QueueStatus::NoShow => self.no_show,
            QueueStatus::Cancelled => self.cancelled,
        }
    }

    fn slot(&mut self, status: QueueStatus) -> &mut usize {
        match status {
            QueueStatus::Scheduled => &mut self.scheduled,
            QueueStatus::Waiting => &mut self.waiting,
            QueueStatus::InProgress => &mut self.in_progress,
            QueueStatus::Absent => &mut self.absent,
            QueueStatus::Completed => &mut self.completed,
            QueueStatus::NoShow => &mut self.no_show,
            QueueStatus::Cancelled => &mut self.cancelled,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        QueueStatus::ALL.into_iter().map(|s| self.get(s)).sum()
    }
}

/// Naive moving average of check-in to start waits, in minutes.
///
/// Uses the `window` most recently finished consultations. `None` until at
/// least one consultation has started and finished.
pub fn moving_average_wait<'a>(
    entries: impl IntoIterator<Item = &'a QueueEntry>,
    window: usize,
) -> Option<f64> {
    let mut finished: Vec<(&DateTime<Utc>, f64)> = entries
        .into_iter()
        .filter(|e| e.status == QueueStatus::Completed)
        .filter_map(|e| Some((e.actual_end_time.as_ref()?, e.wait_minutes()?)))
        .collect();
    if finished.is_empty() || window == 0 {
        return None;
    }
    finished.sort_by(|a, b| b.0.cmp(a.0));
    let recent = &finished[..finished.len().min(window)];
    Some(recent.iter().map(|(_, w)| w).sum::<f64>() / recent.len() as f64)
}

/// Aggregate figures for a queue view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub counts: StatusCounts,
    pub average_wait_minutes: Option<f64>,
    pub total_skips: u64,
}

/// An absent entry and its open absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsentView {
    pub entry: QueueEntry,
    pub absence: Option<AbsenceRecord>,
}

/// Consistent read of a clinic day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStatusView {
    pub day: DayKey,
    pub staff_id: Option<StaffId>,
    /// Revision of the snapshot the view was built from.
    pub revision: u64,
    pub in_progress: Vec<QueueEntry>,
    /// Present waiting entries in queue order.
    pub waiting: Vec<QueueEntry>,
    pub absent: Vec<AbsentView>,
    pub stats: QueueStats,
}

impl QueueStatusView {
    /// Waiting appointment ids in queue order.
    #[must_use]
    pub fn waiting_ids(&self) -> Vec<AppointmentId> {
        self.waiting.iter().map(|e| e.id).collect()
    }
}

/// Effect `endDay` would have, computed without mutating anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosurePreview {
    pub day: DayKey,
    pub staff_id: StaffId,
    pub counts: StatusCounts,
    /// Waiting and absent entries, in queue order.
    pub would_mark_no_show: Vec<AppointmentId>,
    pub would_complete: Vec<AppointmentId>,
    /// An active closure already exists for this staff member.
    pub already_closed: bool,
}

/// Result of calling a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub entry: QueueEntry,
    /// Present patients bypassed by the call, in queue order.
    pub skipped: Vec<AppointmentId>,
}

/// Result of a late arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LateArrivalOutcome {
    pub entry: QueueEntry,
    pub previous_position: Option<u64>,
    pub new_position: u64,
}

/// Why an expiry attempt did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpirySkip {
    /// The entry moved on (returned, swept or otherwise changed).
    Superseded,
    /// The grace period has not ended yet.
    NotDue,
}

/// Result of an automated grace-period expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpiryOutcome {
    Expired(QueueEntry),
    Skipped(ExpirySkip),
}

/// An open absence awaiting its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingExpiry {
    pub day: DayKey,
    pub appointment_id: AppointmentId,
    pub grace_period_ends_at: DateTime<Utc>,
}
