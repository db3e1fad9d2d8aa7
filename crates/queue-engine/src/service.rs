//! # Queue Service
//!
//! Implements [`QueueApi`]. Every command follows the same shape:
//!
//! ```text
//! begin(day)  ──→  validate  ──→  mutate working copy  ──→  stage audits/events
//!     │                                                             │
//!     └── LockTimeout                                     commit ───┴──→ publish events
//!                                 (any error drops the transaction: nothing applied)
//! ```
//!
//! Events leave the process only after the commit succeeded, in the order
//! they were staged.

use crate::auditor::{AuditDraft, OverrideAuditor};
use crate::config::QueueConfig;
use crate::domain::{
    moving_average_wait, AbsenceRecord, ActionType, CallOutcome, ClosurePreview, DayState,
    ExpiryOutcome, ExpirySkip, LateArrivalOutcome, PositionAssigner, QueueDayClosure, QueueEntry,
    QueueError, QueueResult, QueueStatusView, StatusCounts, Trigger, APPOINTMENT,
};
use crate::ports::{
    CallPresentRequest, CheckInRequest, DayTransaction, EndDayRequest, MarkAbsentRequest,
    QueueApi, QueueEventSink, QueueRepository, ReopenDayRequest, ScheduleRequest, TimeSource,
};
use crate::query::QueryFacade;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use shared_bus::{EventMeta, QueueEvent};
use shared_types::{AppointmentId, ClosureId, DayKey, QueueStatus, StaffId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct QueueService<R, E, T> {
    repository: Arc<R>,
    events: Arc<E>,
    time: T,
    config: QueueConfig,
    auditor: OverrideAuditor<R>,
    query: QueryFacade<R>,
}

impl<R, E, T> QueueService<R, E, T>
where
    R: QueueRepository,
    E: QueueEventSink,
    T: TimeSource,
{
    pub fn new(repository: Arc<R>, events: Arc<E>, time: T, config: QueueConfig) -> Self {
        if let Err(e) = config.validate() {
            warn!(error = %e, "Queue config out of range, clamping");
        }
        Self {
            auditor: OverrideAuditor::new(repository.clone()),
            query: QueryFacade::new(repository.clone(), config.wait_average_window),
            repository,
            events,
            time,
            config,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn query(&self) -> &QueryFacade<R> {
        &self.query
    }

    pub fn auditor(&self) -> &OverrideAuditor<R> {
        &self.auditor
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    // =========================================================================
    // SYSTEM COMMANDS
    // =========================================================================

    /// `ABSENT → NO_SHOW` once the grace period has ended.
    ///
    /// Compare-and-swap on status and version: if the entry changed since
    /// the caller observed `expected_version`, nothing happens and the
    /// outcome is `Skipped(Superseded)`.
    #[instrument(skip(self, day), fields(day = %day))]
    pub async fn expire_absence(
        &self,
        day: &DayKey,
        appointment_id: AppointmentId,
        expected_version: u64,
    ) -> QueueResult<ExpiryOutcome> {
        let now = self.now();
        let mut tx = self.begin(day).await?;

        let Some(entry) = tx.state().entry(&appointment_id) else {
            return Ok(ExpiryOutcome::Skipped(ExpirySkip::Superseded));
        };
        if entry.status != QueueStatus::Absent || entry.version != expected_version {
            debug!(
                status = %entry.status,
                version = entry.version,
                "Expiry superseded by a newer change"
            );
            return Ok(ExpiryOutcome::Skipped(ExpirySkip::Superseded));
        }
        match tx.state().open_absence(&appointment_id) {
            None => return Ok(ExpiryOutcome::Skipped(ExpirySkip::Superseded)),
            Some(absence) if !absence.grace_elapsed(now) => {
                return Ok(ExpiryOutcome::Skipped(ExpirySkip::NotDue))
            }
            Some(_) => {}
        }

        let entry = {
            let entry = tx.state_mut().require_entry_mut(&appointment_id)?;
            entry.apply(Trigger::GraceExpiry)?;
            entry.clone()
        };
        if let Some(absence) = tx.state_mut().open_absence_mut(&appointment_id) {
            absence.auto_cancelled = true;
        }

        let system = StaffId::system();
        self.auditor.record(
            &mut tx,
            AuditDraft::new(ActionType::AutoCancel, system.clone())
                .appointment(appointment_id)
                .reason(Some("grace period expired".to_string()))
                .positions(entry.queue_position, None),
            now,
        );
        tx.emit(QueueEvent::PatientAutoCancelled {
            meta: EventMeta::new(day, system.clone(), now),
            appointment_id,
            patient_ref: entry.patient_ref.clone(),
        });
        let updated = self.queue_updated(tx.state(), &entry.staff_id, &system, now);
        tx.emit(updated);
        self.finish(tx).await?;

        info!(appointment_id = %appointment_id, "Grace period expired, marked no-show");
        Ok(ExpiryOutcome::Expired(entry))
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    async fn begin(&self, day: &DayKey) -> QueueResult<DayTransaction> {
        self.repository
            .begin(day, self.config.lock_timeout())
            .await
    }

    async fn locate(&self, appointment_id: AppointmentId) -> QueueResult<DayKey> {
        self.repository
            .locate(&appointment_id)
            .await?
            .ok_or_else(|| QueueError::not_found(APPOINTMENT, appointment_id))
    }

    /// Commit, publish the staged events, then let the next writer in.
    async fn finish(&self, tx: DayTransaction) -> QueueResult<u64> {
        let mut receipt = self.repository.commit(tx).await?;
        self.events
            .publish_all(std::mem::take(&mut receipt.events))
            .await;
        Ok(receipt.release())
    }

    fn queue_updated(
        &self,
        state: &DayState,
        staff_id: &StaffId,
        actor: &StaffId,
        now: DateTime<Utc>,
    ) -> QueueEvent {
        QueueEvent::QueueUpdated {
            meta: EventMeta::new(&state.day, actor.clone(), now),
            staff_id: staff_id.clone(),
            waiting_count: state.present_waiting(Some(staff_id)).len(),
            average_wait_minutes: moving_average_wait(
                state.entries_for(Some(staff_id)),
                self.config.wait_average_window,
            ),
        }
    }
}

/// One consultation per staff member at a time.
fn ensure_staff_free(state: &DayState, staff_id: &StaffId) -> QueueResult<()> {
    match state.in_progress_for(staff_id) {
        Some(current) => Err(QueueError::rule_for(
            format!("{staff_id} already has a patient in progress"),
            current.id,
        )),
        None => Ok(()),
    }
}

fn start_consultation(
    tx: &mut DayTransaction,
    appointment_id: &AppointmentId,
    now: DateTime<Utc>,
) -> QueueResult<QueueEntry> {
    let entry = tx.state_mut().require_entry_mut(appointment_id)?;
    entry.apply(Trigger::Call)?;
    entry.actual_start_time = Some(now);
    Ok(entry.clone())
}

fn called_event(entry: &QueueEntry, actor: &StaffId, now: DateTime<Utc>) -> QueueEvent {
    QueueEvent::PatientCalled {
        meta: EventMeta::new(&entry.day(), actor.clone(), now),
        appointment_id: entry.id,
        patient_ref: entry.patient_ref.clone(),
        staff_id: entry.staff_id.clone(),
        position: entry.queue_position,
    }
}

#[async_trait]
impl<R, E, T> QueueApi for QueueService<R, E, T>
where
    R: QueueRepository,
    E: QueueEventSink,
    T: TimeSource,
{
    #[instrument(skip_all, fields(day = %request.day()))]
    async fn schedule_appointment(&self, request: ScheduleRequest) -> QueueResult<QueueEntry> {
        let day = request.day();
        let id = request.appointment_id.unwrap_or_default();
        if self.repository.locate(&id).await?.is_some() {
            return Err(QueueError::rule_for("appointment already registered", id));
        }

        let now = self.now();
        let mut tx = self.begin(&day).await?;
        if tx.state().contains(&id) {
            return Err(QueueError::rule_for("appointment already registered", id));
        }
        let entry = QueueEntry::scheduled(
            id,
            &day,
            request.staff_id,
            request.patient_ref,
            request.appointment_type,
            now,
        );
        tx.state_mut().insert_entry(entry.clone());
        self.finish(tx).await?;

        debug!(appointment_id = %id, "Appointment scheduled");
        Ok(entry)
    }

    #[instrument(skip_all, fields(day = %request.day()))]
    async fn check_in(&self, request: CheckInRequest) -> QueueResult<QueueEntry> {
        let day = request.day();
        if let Some(id) = request.appointment_id {
            if let Some(registered) = self.repository.locate(&id).await? {
                if registered != day {
                    return Err(QueueError::rule_for(
                        format!("appointment belongs to {registered}"),
                        id,
                    ));
                }
            }
        }

        let now = self.now();
        let mut tx = self.begin(&day).await?;
        let id = request.appointment_id.unwrap_or_default();
        let walk_in = !tx.state().contains(&id);
        if walk_in {
            tx.state_mut().insert_entry(QueueEntry::scheduled(
                id,
                &day,
                request.staff_id.clone(),
                request.patient_ref.clone(),
                request.appointment_type.clone(),
                now,
            ));
        }

        let position = PositionAssigner::assign_tail(tx.state_mut());
        let entry = {
            let entry = tx.state_mut().require_entry_mut(&id)?;
            entry.apply(Trigger::CheckIn)?;
            entry.queue_position = Some(position);
            entry.checked_in_at = Some(now);
            entry.clone()
        };

        tx.emit(QueueEvent::PatientAddedToQueue {
            meta: EventMeta::new(&day, request.performed_by.clone(), now),
            appointment_id: id,
            patient_ref: entry.patient_ref.clone(),
            staff_id: entry.staff_id.clone(),
            position,
        });
        let updated = self.queue_updated(tx.state(), &entry.staff_id, &request.performed_by, now);
        tx.emit(updated);
        self.finish(tx).await?;

        info!(appointment_id = %id, position, walk_in, "Patient checked in");
        Ok(entry)
    }

    #[instrument(skip_all, fields(day = %day, staff_id = %staff_id))]
    async fn call_next(&self, day: &DayKey, staff_id: &StaffId) -> QueueResult<CallOutcome> {
        let now = self.now();
        let mut tx = self.begin(day).await?;
        ensure_staff_free(tx.state(), staff_id)?;

        let next = tx
            .state()
            .present_waiting(Some(staff_id))
            .first()
            .map(|e| e.id)
            .ok_or_else(|| QueueError::rule("no patient available"))?;
        let entry = start_consultation(&mut tx, &next, now)?;

        self.auditor.record(
            &mut tx,
            AuditDraft::new(ActionType::Next, staff_id.clone())
                .appointment(next)
                .positions(entry.queue_position, None),
            now,
        );
        tx.emit(called_event(&entry, staff_id, now));
        let updated = self.queue_updated(tx.state(), staff_id, staff_id, now);
        tx.emit(updated);
        self.finish(tx).await?;

        info!(appointment_id = %next, "Next patient called");
        Ok(CallOutcome {
            entry,
            skipped: Vec::new(),
        })
    }

    #[instrument(skip_all, fields(appointment_id = %request.appointment_id))]
    async fn call_present(&self, request: CallPresentRequest) -> QueueResult<CallOutcome> {
        let id = request.appointment_id;
        let day = self.locate(id).await?;
        let now = self.now();
        let mut tx = self.begin(&day).await?;

        let target = tx.state().require_entry(&id)?.clone();
        if target.status == QueueStatus::Absent || tx.state().open_absence(&id).is_some() {
            return Err(QueueError::rule_for("patient is not present", id));
        }
        crate::domain::state_machine::ensure_transition(
            id,
            target.status,
            QueueStatus::InProgress,
        )?;
        ensure_staff_free(tx.state(), &target.staff_id)?;

        let candidates: Vec<AppointmentId> = tx
            .state()
            .present_waiting(Some(&target.staff_id))
            .into_iter()
            .map(|e| e.id)
            .collect();
        let index = candidates
            .iter()
            .position(|c| *c == id)
            .ok_or_else(|| QueueError::rule_for("no patient available", id))?;
        let skipped = candidates[..index].to_vec();

        for skipped_id in &skipped {
            let entry = tx.state_mut().require_entry_mut(skipped_id)?;
            entry.skip_count += 1;
            entry.touch();
        }
        let entry = start_consultation(&mut tx, &id, now)?;

        self.auditor.record(
            &mut tx,
            AuditDraft::new(ActionType::CallPresent, request.performed_by.clone())
                .appointment(id)
                .reason(request.reason.clone())
                .positions(target.queue_position, None)
                .skipped(skipped.clone()),
            now,
        );
        tx.emit(called_event(&entry, &request.performed_by, now));
        if !skipped.is_empty() {
            tx.emit(QueueEvent::PatientSkipped {
                meta: EventMeta::new(&day, request.performed_by.clone(), now),
                called: id,
                skipped: skipped.clone(),
            });
        }
        let updated = self.queue_updated(tx.state(), &entry.staff_id, &request.performed_by, now);
        tx.emit(updated);
        self.finish(tx).await?;

        info!(skipped = skipped.len(), "Present patient called");
        Ok(CallOutcome { entry, skipped })
    }

    #[instrument(skip_all, fields(appointment_id = %request.appointment_id))]
    async fn mark_absent(&self, request: MarkAbsentRequest) -> QueueResult<AbsenceRecord> {
        let id = request.appointment_id;
        let day = self.locate(id).await?;
        let now = self.now();
        let mut tx = self.begin(&day).await?;

        let current = tx.state().require_entry(&id)?;
        if current.status == QueueStatus::Absent || tx.state().open_absence(&id).is_some() {
            return Err(QueueError::rule_for("already absent", id));
        }
        let minutes = request
            .grace_period_minutes
            .unwrap_or(self.config.default_grace_period_minutes);
        if minutes == 0 {
            return Err(QueueError::rule_for("grace period must be positive", id));
        }
        let grace_period_ends_at = now + Duration::minutes(i64::from(minutes));

        let entry = {
            let entry = tx.state_mut().require_entry_mut(&id)?;
            entry.apply(Trigger::MarkAbsent)?;
            entry.marked_absent_at = Some(now);
            entry.grace_period_ends_at = Some(grace_period_ends_at);
            entry.returned_at = None;
            entry.clone()
        };
        let record = AbsenceRecord {
            appointment_id: id,
            clinic_id: entry.clinic_id.clone(),
            patient_ref: entry.patient_ref.clone(),
            marked_by: request.performed_by.clone(),
            reason: request.reason.clone(),
            marked_absent_at: now,
            grace_period_ends_at,
            returned_at: None,
            auto_cancelled: false,
            swept_by_closure: None,
        };
        tx.state_mut().push_absence(record.clone());

        self.auditor.record(
            &mut tx,
            AuditDraft::new(ActionType::MarkAbsent, request.performed_by.clone())
                .appointment(id)
                .reason(request.reason.clone())
                .positions(entry.queue_position, None),
            now,
        );
        tx.emit(QueueEvent::PatientMarkedAbsent {
            meta: EventMeta::new(&day, request.performed_by.clone(), now),
            appointment_id: id,
            patient_ref: entry.patient_ref.clone(),
            grace_period_ends_at,
        });
        let updated = self.queue_updated(tx.state(), &entry.staff_id, &request.performed_by, now);
        tx.emit(updated);
        self.finish(tx).await?;

        info!(grace_minutes = minutes, %grace_period_ends_at, "Patient marked absent");
        Ok(record)
    }

    #[instrument(skip_all, fields(appointment_id = %appointment_id))]
    async fn handle_late_arrival(
        &self,
        appointment_id: AppointmentId,
        performed_by: &StaffId,
    ) -> QueueResult<LateArrivalOutcome> {
        let day = self.locate(appointment_id).await?;
        let now = self.now();
        let mut tx = self.begin(&day).await?;

        let previous_position = tx.state().require_entry(&appointment_id)?.queue_position;
        let absence = tx
            .state()
            .latest_absence(&appointment_id)
            .ok_or_else(|| QueueError::not_found("absence record", appointment_id))?;
        if !absence.is_open() {
            return Err(QueueError::settled(
                absence.resolution(),
                vec![appointment_id],
            ));
        }

        let new_position = PositionAssigner::assign_tail(tx.state_mut());
        let entry = {
            let entry = tx.state_mut().require_entry_mut(&appointment_id)?;
            entry.apply(Trigger::LateArrival)?;
            entry.queue_position = Some(new_position);
            entry.returned_at = Some(now);
            entry.clone()
        };
        if let Some(absence) = tx.state_mut().open_absence_mut(&appointment_id) {
            absence.returned_at = Some(now);
        }

        self.auditor.record(
            &mut tx,
            AuditDraft::new(ActionType::LateArrival, performed_by.clone())
                .appointment(appointment_id)
                .positions(previous_position, Some(new_position)),
            now,
        );
        tx.emit(QueueEvent::PatientReturned {
            meta: EventMeta::new(&day, performed_by.clone(), now),
            appointment_id,
            patient_ref: entry.patient_ref.clone(),
            previous_position,
            new_position,
        });
        let updated = self.queue_updated(tx.state(), &entry.staff_id, performed_by, now);
        tx.emit(updated);
        self.finish(tx).await?;

        info!(?previous_position, new_position, "Absent patient returned");
        Ok(LateArrivalOutcome {
            entry,
            previous_position,
            new_position,
        })
    }

    #[instrument(skip_all, fields(day = %day, staff_id = %staff_id))]
    async fn complete_current(
        &self,
        day: &DayKey,
        staff_id: &StaffId,
    ) -> QueueResult<QueueEntry> {
        let now = self.now();
        let mut tx = self.begin(day).await?;

        let id = tx
            .state()
            .in_progress_for(staff_id)
            .map(|e| e.id)
            .ok_or_else(|| QueueError::rule("no patient in progress"))?;
        let entry = {
            let entry = tx.state_mut().require_entry_mut(&id)?;
            entry.apply(Trigger::Complete)?;
            entry.actual_end_time = Some(now);
            entry.clone()
        };

        self.auditor.record(
            &mut tx,
            AuditDraft::new(ActionType::Complete, staff_id.clone()).appointment(id),
            now,
        );
        tx.emit(QueueEvent::AppointmentCompleted {
            meta: EventMeta::new(day, staff_id.clone(), now),
            appointment_id: id,
            patient_ref: entry.patient_ref.clone(),
            staff_id: staff_id.clone(),
        });
        let updated = self.queue_updated(tx.state(), staff_id, staff_id, now);
        tx.emit(updated);
        self.finish(tx).await?;

        info!(appointment_id = %id, "Consultation completed");
        Ok(entry)
    }

    #[instrument(skip_all, fields(day = %request.day(), staff_id = %request.staff_id))]
    async fn end_day(&self, request: EndDayRequest) -> QueueResult<QueueDayClosure> {
        let day = request.day();
        let staff_id = &request.staff_id;
        let now = self.now();
        let mut tx = self.begin(&day).await?;

        if let Some(active) = tx.state().active_closure_for(staff_id) {
            return Err(QueueError::rule(format!(
                "queue already closed for the day by closure {}",
                active.id
            )));
        }

        let closure_id = ClosureId::new();
        let before_state_counts = StatusCounts::tally(tx.state().entries_for(Some(staff_id)));
        let to_no_show: Vec<AppointmentId> = tx
            .state()
            .in_queue_order_any(&[QueueStatus::Waiting, QueueStatus::Absent], Some(staff_id))
            .into_iter()
            .map(|e| e.id)
            .collect();
        let to_complete: Vec<AppointmentId> = tx
            .state()
            .in_queue_order(QueueStatus::InProgress, Some(staff_id))
            .into_iter()
            .map(|e| e.id)
            .collect();

        let mut affected_versions = BTreeMap::new();
        for id in to_no_show.iter().chain(&to_complete) {
            let entry = tx.state_mut().require_entry_mut(id)?;
            if entry.apply(Trigger::DayClosure)? == QueueStatus::Completed {
                entry.actual_end_time = Some(now);
            }
            affected_versions.insert(*id, entry.version);
            if let Some(absence) = tx.state_mut().open_absence_mut(id) {
                absence.swept_by_closure = Some(closure_id);
            }
        }

        let closure = QueueDayClosure {
            id: closure_id,
            clinic_id: day.clinic_id.clone(),
            staff_id: staff_id.clone(),
            closure_date: day.date,
            before_state_counts,
            marked_no_show_ids: to_no_show,
            marked_completed_ids: to_complete,
            reason: request.reason.clone(),
            closed_by: staff_id.clone(),
            closed_at: now,
            reopenable_until: now + self.config.reopen_window(),
            reopened_at: None,
            reopened_by: None,
            reopen_reason: None,
            affected_versions,
        };
        tx.state_mut().insert_closure(closure.clone());

        self.auditor.record(
            &mut tx,
            AuditDraft::new(ActionType::CloseDay, staff_id.clone())
                .closure(closure_id)
                .reason(request.reason.clone()),
            now,
        );
        tx.emit(QueueEvent::DayClosed {
            meta: EventMeta::new(&day, staff_id.clone(), now),
            closure_id,
            staff_id: staff_id.clone(),
            no_show_ids: closure.marked_no_show_ids.clone(),
            completed_ids: closure.marked_completed_ids.clone(),
            reopenable_until: closure.reopenable_until,
        });
        let updated = self.queue_updated(tx.state(), staff_id, staff_id, now);
        tx.emit(updated);
        self.finish(tx).await?;

        info!(
            closure_id = %closure_id,
            no_shows = closure.marked_no_show_ids.len(),
            completed = closure.marked_completed_ids.len(),
            "Day closed"
        );
        Ok(closure)
    }

    #[instrument(skip_all, fields(closure_id = %request.closure_id))]
    async fn reopen_day(&self, request: ReopenDayRequest) -> QueueResult<QueueDayClosure> {
        let closure_id = request.closure_id;
        let day = self
            .repository
            .locate_closure(&closure_id)
            .await?
            .ok_or_else(|| QueueError::not_found("closure", closure_id))?;
        let now = self.now();
        let mut tx = self.begin(&day).await?;

        let closure = tx
            .state()
            .closure(&closure_id)
            .cloned()
            .ok_or_else(|| QueueError::not_found("closure", closure_id))?;
        if closure.is_reopened() {
            return Err(QueueError::rule("closure already reopened"));
        }
        if !closure.window_open(now) {
            return Err(QueueError::StaleClosure {
                closure_id,
                reason: format!("reopen window ended at {}", closure.reopenable_until),
                changed_ids: Vec::new(),
            });
        }

        let changed: Vec<AppointmentId> = closure
            .marked_no_show_ids
            .iter()
            .filter(|id| match tx.state().entry(*id) {
                Some(entry) => {
                    entry.status != QueueStatus::NoShow
                        || closure.affected_versions.get(*id) != Some(&entry.version)
                }
                None => true,
            })
            .copied()
            .collect();
        if !changed.is_empty() {
            return Err(QueueError::StaleClosure {
                closure_id,
                reason: "entries changed since the closure".to_string(),
                changed_ids: changed,
            });
        }

        for id in &closure.marked_no_show_ids {
            let position = PositionAssigner::assign_tail(tx.state_mut());
            tx.state_mut()
                .require_entry_mut(id)?
                .revert_no_show(position)?;
        }
        let reopened = {
            let stored = tx
                .state_mut()
                .closure_mut(&closure_id)
                .ok_or_else(|| QueueError::not_found("closure", closure_id))?;
            stored.reopened_at = Some(now);
            stored.reopened_by = Some(request.performed_by.clone());
            stored.reopen_reason = request.reason.clone();
            stored.clone()
        };

        self.auditor.record(
            &mut tx,
            AuditDraft::new(ActionType::ReopenDay, request.performed_by.clone())
                .closure(closure_id)
                .reason(request.reason.clone()),
            now,
        );
        tx.emit(QueueEvent::DayReopened {
            meta: EventMeta::new(&day, request.performed_by.clone(), now),
            closure_id,
            staff_id: closure.staff_id.clone(),
            restored_ids: closure.marked_no_show_ids.clone(),
        });
        let updated = self.queue_updated(tx.state(), &closure.staff_id, &request.performed_by, now);
        tx.emit(updated);
        self.finish(tx).await?;

        info!(restored = closure.marked_no_show_ids.len(), "Day reopened");
        Ok(reopened)
    }

    async fn get_queue_status(
        &self,
        day: &DayKey,
        staff_id: Option<&StaffId>,
    ) -> QueueResult<QueueStatusView> {
        self.query.queue_status(day, staff_id).await
    }

    async fn get_closure_preview(
        &self,
        day: &DayKey,
        staff_id: &StaffId,
    ) -> QueueResult<ClosurePreview> {
        self.query.closure_preview(day, staff_id).await
    }
}
