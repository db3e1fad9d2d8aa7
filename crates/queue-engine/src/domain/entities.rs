//! Core domain entities for the clinic queue.

use super::errors::QueueResult;
use super::state_machine::{self, Trigger};
use super::value_objects::StatusCounts;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{
    AppointmentId, AuditId, ClinicId, ClosureId, DayKey, PatientRef, QueueStatus, StaffId,
};
use std::collections::BTreeMap;

// =============================================================================
// QUEUE ENTRY
// =============================================================================

/// One appointment or walk-in visit on a clinic day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: AppointmentId,
    pub clinic_id: ClinicId,
    pub staff_id: StaffId,
    pub patient_ref: PatientRef,
    pub appointment_type: String,
    pub date: NaiveDate,
    pub status: QueueStatus,
    /// Ordering key while waiting. Kept as history once the entry moves on.
    pub queue_position: Option<u64>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub marked_absent_at: Option<DateTime<Utc>>,
    pub grace_period_ends_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    /// Times this entry was bypassed by an out-of-order call.
    pub skip_count: u32,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub actual_end_time: Option<DateTime<Utc>>,
    /// Bumped on every committed change; the compare-and-swap token.
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl QueueEntry {
    /// A freshly registered, not yet checked-in entry.
    pub fn scheduled(
        id: AppointmentId,
        day: &DayKey,
        staff_id: StaffId,
        patient_ref: PatientRef,
        appointment_type: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            clinic_id: day.clinic_id.clone(),
            staff_id,
            patient_ref,
            appointment_type: appointment_type.into(),
            date: day.date,
            status: QueueStatus::Scheduled,
            queue_position: None,
            checked_in_at: None,
            marked_absent_at: None,
            grace_period_ends_at: None,
            returned_at: None,
            skip_count: 0,
            actual_start_time: None,
            actual_end_time: None,
            version: 0,
            created_at: now,
        }
    }

    pub fn day(&self) -> DayKey {
        DayKey::new(self.clinic_id.clone(), self.date)
    }

    /// Apply a trigger through the state machine and bump the version.
    pub fn apply(&mut self, trigger: Trigger) -> QueueResult<QueueStatus> {
        let to = state_machine::target_for(self.id, self.status, trigger)?;
        self.status = to;
        self.touch();
        Ok(to)
    }

    /// Reverse a closure-induced no-show back to waiting.
    pub fn revert_no_show(&mut self, position: u64) -> QueueResult<()> {
        state_machine::ensure_reversal(self.id, self.status)?;
        self.status = QueueStatus::Waiting;
        self.queue_position = Some(position);
        self.touch();
        Ok(())
    }

    /// Record a non-status change.
    pub fn touch(&mut self) {
        self.version += 1;
    }

    /// Minutes between check-in and the start of the consultation.
    #[must_use]
    pub fn wait_minutes(&self) -> Option<f64> {
        let checked_in = self.checked_in_at?;
        let started = self.actual_start_time?;
        Some((started - checked_in).num_seconds().max(0) as f64 / 60.0)
    }
}

// =============================================================================
// ABSENCE RECORD
// =============================================================================

/// A period during which a checked-in patient was not present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsenceRecord {
    pub appointment_id: AppointmentId,
    pub clinic_id: ClinicId,
    pub patient_ref: PatientRef,
    pub marked_by: StaffId,
    pub reason: Option<String>,
    pub marked_absent_at: DateTime<Utc>,
    pub grace_period_ends_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub auto_cancelled: bool,
    /// Set when a day closure turned this absence into a no-show.
    pub swept_by_closure: Option<ClosureId>,
}

impl AbsenceRecord {
    /// Neither returned, expired nor swept.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none() && !self.auto_cancelled && self.swept_by_closure.is_none()
    }

    #[must_use]
    pub fn grace_elapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.grace_period_ends_at
    }

    /// How the absence ended, for error messages.
    #[must_use]
    pub fn resolution(&self) -> &'static str {
        if self.returned_at.is_some() {
            "patient already returned"
        } else if self.auto_cancelled {
            "grace period already expired"
        } else if self.swept_by_closure.is_some() {
            "absence closed by day closure"
        } else {
            "open"
        }
    }
}

// =============================================================================
// OVERRIDE AUDIT
// =============================================================================

/// Kind of non-trivial queue action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    CallPresent,
    MarkAbsent,
    LateArrival,
    Next,
    Complete,
    /// Grace period ran out; written by the scheduler as the system actor.
    AutoCancel,
    /// Reserved for manual reordering; no operation produces it yet.
    Reorder,
    CloseDay,
    ReopenDay,
}

/// Append-only record of an action taken on the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideAudit {
    pub id: AuditId,
    pub clinic_id: ClinicId,
    pub date: NaiveDate,
    /// Absent for day-level actions.
    pub appointment_id: Option<AppointmentId>,
    pub closure_id: Option<ClosureId>,
    pub action_type: ActionType,
    pub performed_by: StaffId,
    pub reason: Option<String>,
    pub previous_position: Option<u64>,
    pub new_position: Option<u64>,
    pub skipped_appointment_ids: Vec<AppointmentId>,
    /// Strictly increasing within a clinic-day.
    pub sequence_number: u64,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// DAY CLOSURE
// =============================================================================

/// Snapshot of an end-of-day operation, kept for reporting and reopen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueDayClosure {
    pub id: ClosureId,
    pub clinic_id: ClinicId,
    pub staff_id: StaffId,
    pub closure_date: NaiveDate,
    pub before_state_counts: StatusCounts,
    /// In queue order.
    pub marked_no_show_ids: Vec<AppointmentId>,
    pub marked_completed_ids: Vec<AppointmentId>,
    pub reason: Option<String>,
    pub closed_by: StaffId,
    pub closed_at: DateTime<Utc>,
    pub reopenable_until: DateTime<Utc>,
    pub reopened_at: Option<DateTime<Utc>>,
    pub reopened_by: Option<StaffId>,
    pub reopen_reason: Option<String>,
    /// Entry versions written by the closure, used to detect later edits.
    pub affected_versions: BTreeMap<AppointmentId, u64>,
}

impl QueueDayClosure {
    pub fn day(&self) -> DayKey {
        DayKey::new(self.clinic_id.clone(), self.closure_date)
    }

    #[must_use]
    pub fn is_reopened(&self) -> bool {
        self.reopened_at.is_some()
    }

    /// Still in force (not reversed).
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_reopened()
    }

    #[must_use]
    pub fn window_open(&self, now: DateTime<Utc>) -> bool {
        now <= self.reopenable_until
    }
}
