//! # Inbound Port - QueueApi
//!
//! Primary driving port exposing queue commands and reads to staff-facing
//! adapters (front desk, practitioner screen, waiting-room display).
//!
//! | Method | Scope locked | Audited |
//! |--------|--------------|---------|
//! | `schedule_appointment` | clinic-day | no |
//! | `check_in` | clinic-day | no |
//! | `call_next` | clinic-day | `NEXT` |
//! | `call_present` | clinic-day | `CALL_PRESENT` |
//! | `mark_absent` | clinic-day | `MARK_ABSENT` |
//! | `handle_late_arrival` | clinic-day | `LATE_ARRIVAL` |
//! | `complete_current` | clinic-day | `COMPLETE` |
//! | `end_day` | clinic-day | `CLOSE_DAY` |
//! | `reopen_day` | clinic-day | `REOPEN_DAY` |
//! | `get_queue_status` | none (snapshot) | no |
//! | `get_closure_preview` | none (snapshot) | no |

use crate::domain::{
    AbsenceRecord, CallOutcome, ClosurePreview, LateArrivalOutcome, QueueDayClosure, QueueEntry,
    QueueResult, QueueStatusView,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared_types::{AppointmentId, ClinicId, ClosureId, DayKey, PatientRef, StaffId};
use std::sync::Arc;

/// Register an appointment before the patient arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Identifier from the booking system; generated when absent.
    pub appointment_id: Option<AppointmentId>,
    pub clinic_id: ClinicId,
    pub date: NaiveDate,
    pub staff_id: StaffId,
    pub patient_ref: PatientRef,
    pub appointment_type: String,
}

impl ScheduleRequest {
    pub fn day(&self) -> DayKey {
        DayKey::new(self.clinic_id.clone(), self.date)
    }
}

/// Check a patient in.
///
/// A known scheduled appointment moves to `WAITING`. An unknown or missing
/// id registers a walk-in for `staff_id` and checks it in directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub appointment_id: Option<AppointmentId>,
    pub clinic_id: ClinicId,
    pub date: NaiveDate,
    pub staff_id: StaffId,
    pub patient_ref: PatientRef,
    pub appointment_type: String,
    pub performed_by: StaffId,
}

impl CheckInRequest {
    pub fn day(&self) -> DayKey {
        DayKey::new(self.clinic_id.clone(), self.date)
    }
}

/// Call a specific present patient, possibly out of order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPresentRequest {
    pub appointment_id: AppointmentId,
    pub performed_by: StaffId,
    pub reason: Option<String>,
}

/// Mark a waiting patient absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkAbsentRequest {
    pub appointment_id: AppointmentId,
    pub performed_by: StaffId,
    /// Overrides the configured default when set.
    pub grace_period_minutes: Option<u32>,
    pub reason: Option<String>,
}

/// Close a staff member's queue for the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndDayRequest {
    pub clinic_id: ClinicId,
    pub date: NaiveDate,
    pub staff_id: StaffId,
    pub reason: Option<String>,
}

impl EndDayRequest {
    pub fn day(&self) -> DayKey {
        DayKey::new(self.clinic_id.clone(), self.date)
    }
}

/// Reverse a closure within its window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReopenDayRequest {
    pub closure_id: ClosureId,
    pub performed_by: StaffId,
    pub reason: Option<String>,
}

/// Primary API of the clinic queue.
///
/// Every mutation is atomic for its clinic day: it either commits all of
/// its entry changes, audit rows and events, or none of them. Events are
/// published only after the commit.
#[async_trait]
pub trait QueueApi: Send + Sync {
    /// Register a `SCHEDULED` entry.
    ///
    /// # Errors
    /// - `BusinessRuleViolation`: id already registered
    async fn schedule_appointment(&self, request: ScheduleRequest) -> QueueResult<QueueEntry>;

    /// `SCHEDULED → WAITING` at the tail of the queue.
    ///
    /// # Errors
    /// - `InvalidStateTransition`: entry is not `SCHEDULED`
    /// - `BusinessRuleViolation`: entry belongs to another clinic day
    async fn check_in(&self, request: CheckInRequest) -> QueueResult<QueueEntry>;

    /// Call the first present waiting patient of `staff_id`.
    ///
    /// # Errors
    /// - `BusinessRuleViolation`: no patient available, or one already in progress
    async fn call_next(&self, day: &DayKey, staff_id: &StaffId) -> QueueResult<CallOutcome>;

    /// Call a specific present patient; those ahead of it are recorded as skipped.
    ///
    /// # Errors
    /// - `NotFound`, `InvalidStateTransition`, `BusinessRuleViolation`
    async fn call_present(&self, request: CallPresentRequest) -> QueueResult<CallOutcome>;

    /// `WAITING → ABSENT` with a grace period.
    ///
    /// # Errors
    /// - `BusinessRuleViolation`: already absent
    /// - `InvalidStateTransition`: entry is not `WAITING`
    async fn mark_absent(&self, request: MarkAbsentRequest) -> QueueResult<AbsenceRecord>;

    /// `ABSENT → WAITING` at the tail of the queue.
    ///
    /// # Errors
    /// - `NotFound`: entry or absence record unknown
    /// - `Conflict`: the absence was already resolved
    async fn handle_late_arrival(
        &self,
        appointment_id: AppointmentId,
        performed_by: &StaffId,
    ) -> QueueResult<LateArrivalOutcome>;

    /// `IN_PROGRESS → COMPLETED` for the entry `staff_id` is seeing.
    async fn complete_current(&self, day: &DayKey, staff_id: &StaffId)
        -> QueueResult<QueueEntry>;

    /// Close every open entry of `staff_id` in one atomic operation.
    async fn end_day(&self, request: EndDayRequest) -> QueueResult<QueueDayClosure>;

    /// Reverse a closure within its window.
    ///
    /// # Errors
    /// - `StaleClosure`: window elapsed or restored entries edited since
    async fn reopen_day(&self, request: ReopenDayRequest) -> QueueResult<QueueDayClosure>;

    /// Snapshot view of the day, optionally for one staff member.
    async fn get_queue_status(
        &self,
        day: &DayKey,
        staff_id: Option<&StaffId>,
    ) -> QueueResult<QueueStatusView>;

    /// What `end_day` would do, without doing it.
    async fn get_closure_preview(
        &self,
        day: &DayKey,
        staff_id: &StaffId,
    ) -> QueueResult<ClosurePreview>;
}

#[async_trait]
impl<A: QueueApi + ?Sized> QueueApi for Arc<A> {
    async fn schedule_appointment(&self, request: ScheduleRequest) -> QueueResult<QueueEntry> {
        (**self).schedule_appointment(request).await
    }

    async fn check_in(&self, request: CheckInRequest) -> QueueResult<QueueEntry> {
        (**self).check_in(request).await
    }

    async fn call_next(&self, day: &DayKey, staff_id: &StaffId) -> QueueResult<CallOutcome> {
        (**self).call_next(day, staff_id).await
    }

    async fn call_present(&self, request: CallPresentRequest) -> QueueResult<CallOutcome> {
        (**self).call_present(request).await
    }

    async fn mark_absent(&self, request: MarkAbsentRequest) -> QueueResult<AbsenceRecord> {
        (**self).mark_absent(request).await
    }

    async fn handle_late_arrival(
        &self,
        appointment_id: AppointmentId,
        performed_by: &StaffId,
    ) -> QueueResult<LateArrivalOutcome> {
        (**self).handle_late_arrival(appointment_id, performed_by).await
    }

    async fn complete_current(
        &self,
        day: &DayKey,
        staff_id: &StaffId,
    ) -> QueueResult<QueueEntry> {
        (**self).complete_current(day, staff_id).await
    }

    async fn end_day(&self, request: EndDayRequest) -> QueueResult<QueueDayClosure> {
        (**self).end_day(request).await
    }

    async fn reopen_day(&self, request: ReopenDayRequest) -> QueueResult<QueueDayClosure> {
        (**self).reopen_day(request).await
    }

    async fn get_queue_status(
        &self,
        day: &DayKey,
        staff_id: Option<&StaffId>,
    ) -> QueueResult<QueueStatusView> {
        (**self).get_queue_status(day, staff_id).await
    }

    async fn get_closure_preview(
        &self,
        day: &DayKey,
        staff_id: &StaffId,
    ) -> QueueResult<ClosurePreview> {
        (**self).get_closure_preview(day, staff_id).await
    }
}
