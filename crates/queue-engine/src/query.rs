//! # Query Facade
//!
//! Read-only views built from a single committed snapshot, so every view
//! is internally consistent. Reads never take the writer lease.

use crate::domain::{
    moving_average_wait, AbsenceRecord, AbsentView, ClosurePreview, DayState, OverrideAudit,
    QueueDayClosure, QueueEntry, QueueError, QueueResult, QueueStats, QueueStatusView,
    StatusCounts, APPOINTMENT,
};
use crate::ports::QueueRepository;
use shared_types::{AppointmentId, ClosureId, DayKey, QueueStatus, StaffId};
use std::sync::Arc;

pub struct QueryFacade<R> {
    repository: Arc<R>,
    wait_average_window: usize,
}

impl<R: QueueRepository> QueryFacade<R> {
    pub fn new(repository: Arc<R>, wait_average_window: usize) -> Self {
        Self {
            repository,
            wait_average_window,
        }
    }

    /// Current view of a clinic day, optionally for one staff member.
    pub async fn queue_status(
        &self,
        day: &DayKey,
        staff_id: Option<&StaffId>,
    ) -> QueueResult<QueueStatusView> {
        let state = self.repository.snapshot(day).await?;
        Ok(status_view(&state, staff_id, self.wait_average_window))
    }

    /// The patient `staff_id` is currently seeing.
    pub async fn current_patient(
        &self,
        day: &DayKey,
        staff_id: &StaffId,
    ) -> QueueResult<Option<QueueEntry>> {
        let state = self.repository.snapshot(day).await?;
        Ok(state.in_progress_for(staff_id).cloned())
    }

    pub async fn closure_preview(
        &self,
        day: &DayKey,
        staff_id: &StaffId,
    ) -> QueueResult<ClosurePreview> {
        let state = self.repository.snapshot(day).await?;
        Ok(closure_preview(&state, staff_id))
    }

    pub async fn entry(&self, appointment_id: &AppointmentId) -> QueueResult<QueueEntry> {
        let day = self
            .repository
            .locate(appointment_id)
            .await?
            .ok_or_else(|| QueueError::not_found(APPOINTMENT, appointment_id))?;
        let state = self.repository.snapshot(&day).await?;
        state.require_entry(appointment_id).cloned()
    }

    /// Absence history of one entry, oldest first.
    pub async fn absences_of(
        &self,
        appointment_id: &AppointmentId,
    ) -> QueueResult<Vec<AbsenceRecord>> {
        let Some(day) = self.repository.locate(appointment_id).await? else {
            return Err(QueueError::not_found(APPOINTMENT, appointment_id));
        };
        let state = self.repository.snapshot(&day).await?;
        Ok(state
            .absences()
            .iter()
            .filter(|a| &a.appointment_id == appointment_id)
            .cloned()
            .collect())
    }

    pub async fn closure(&self, closure_id: &ClosureId) -> QueueResult<QueueDayClosure> {
        let day = self
            .repository
            .locate_closure(closure_id)
            .await?
            .ok_or_else(|| QueueError::not_found("closure", closure_id))?;
        let state = self.repository.snapshot(&day).await?;
        state
            .closure(closure_id)
            .cloned()
            .ok_or_else(|| QueueError::not_found("closure", closure_id))
    }

    /// All closures of a day, reopened ones included.
    pub async fn closures(&self, day: &DayKey) -> QueueResult<Vec<QueueDayClosure>> {
        let state = self.repository.snapshot(day).await?;
        let mut closures: Vec<_> = state.closures().cloned().collect();
        closures.sort_by_key(|c| c.closed_at);
        Ok(closures)
    }

    pub async fn audit_trail(&self, day: &DayKey) -> QueueResult<Vec<OverrideAudit>> {
        self.repository.audit_trail(day).await
    }
}

/// Build a status view from one snapshot.
pub fn status_view(state: &DayState, staff_id: Option<&StaffId>, window: usize) -> QueueStatusView {
    let scoped = state.entries_for(staff_id);
    let absent = state
        .in_queue_order(QueueStatus::Absent, staff_id)
        .into_iter()
        .map(|entry| AbsentView {
            entry: entry.clone(),
            absence: state.open_absence(&entry.id).cloned(),
        })
        .collect();

    QueueStatusView {
        day: state.day.clone(),
        staff_id: staff_id.cloned(),
        revision: state.revision,
        in_progress: state
            .in_queue_order(QueueStatus::InProgress, staff_id)
            .into_iter()
            .cloned()
            .collect(),
        waiting: state
            .present_waiting(staff_id)
            .into_iter()
            .cloned()
            .collect(),
        absent,
        stats: QueueStats {
            counts: StatusCounts::tally(scoped.iter().copied()),
            average_wait_minutes: moving_average_wait(scoped.iter().copied(), window),
            total_skips: scoped.iter().map(|e| u64::from(e.skip_count)).sum(),
        },
    }
}

/// What closing `staff_id`'s queue would change.
pub fn closure_preview(state: &DayState, staff_id: &StaffId) -> ClosurePreview {
    let ids = |statuses: &[QueueStatus]| -> Vec<AppointmentId> {
        state
            .in_queue_order_any(statuses, Some(staff_id))
            .into_iter()
            .map(|e| e.id)
            .collect()
    };
    ClosurePreview {
        day: state.day.clone(),
        staff_id: staff_id.clone(),
        counts: StatusCounts::tally(state.entries_for(Some(staff_id))),
        would_mark_no_show: ids(&[QueueStatus::Waiting, QueueStatus::Absent]),
        would_complete: ids(&[QueueStatus::InProgress]),
        already_closed: state.active_closure_for(staff_id).is_some(),
    }
}
