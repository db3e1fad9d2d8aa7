//! # Override Auditor
//!
//! Records every non-trivial queue action as an append-only row. Rows are
//! staged on the caller's transaction, so they commit or vanish together
//! with the change they describe. Sequence numbers are strictly increasing
//! within a clinic day and are allocated under the day's writer lease.

use crate::domain::{ActionType, OverrideAudit, QueueResult};
use crate::ports::{DayTransaction, QueueRepository};
use chrono::{DateTime, Utc};
use shared_types::{AppointmentId, AuditId, ClosureId, DayKey, StaffId};
use std::sync::Arc;
use thiserror::Error;

/// A broken audit sequence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Audit sequence broken at row {index}: expected {expected}, found {found}")]
pub struct SequenceBreak {
    pub index: usize,
    pub expected: u64,
    pub found: u64,
}

/// Fields of an audit row before it is numbered.
#[derive(Debug, Clone)]
pub struct AuditDraft {
    action: ActionType,
    performed_by: StaffId,
    appointment_id: Option<AppointmentId>,
    closure_id: Option<ClosureId>,
    reason: Option<String>,
    previous_position: Option<u64>,
    new_position: Option<u64>,
    skipped: Vec<AppointmentId>,
}

impl AuditDraft {
    pub fn new(action: ActionType, performed_by: StaffId) -> Self {
        Self {
            action,
            performed_by,
            appointment_id: None,
            closure_id: None,
            reason: None,
            previous_position: None,
            new_position: None,
            skipped: Vec::new(),
        }
    }

    pub fn appointment(mut self, id: AppointmentId) -> Self {
        self.appointment_id = Some(id);
        self
    }

    pub fn closure(mut self, id: ClosureId) -> Self {
        self.closure_id = Some(id);
        self
    }

    pub fn reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn positions(mut self, previous: Option<u64>, new: Option<u64>) -> Self {
        self.previous_position = previous;
        self.new_position = new;
        self
    }

    pub fn skipped(mut self, skipped: Vec<AppointmentId>) -> Self {
        self.skipped = skipped;
        self
    }
}

pub struct OverrideAuditor<R> {
    repository: Arc<R>,
}

impl<R: QueueRepository> OverrideAuditor<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Number and stage an audit row on `tx`.
    pub fn record(
        &self,
        tx: &mut DayTransaction,
        draft: AuditDraft,
        now: DateTime<Utc>,
    ) -> OverrideAudit {
        let sequence_number = tx.state_mut().next_audit_sequence();
        let day = tx.day().clone();
        let audit = OverrideAudit {
            id: AuditId::new(),
            clinic_id: day.clinic_id,
            date: day.date,
            appointment_id: draft.appointment_id,
            closure_id: draft.closure_id,
            action_type: draft.action,
            performed_by: draft.performed_by,
            reason: draft.reason,
            previous_position: draft.previous_position,
            new_position: draft.new_position,
            skipped_appointment_ids: draft.skipped,
            sequence_number,
            timestamp: now,
        };
        tx.stage_audit(audit.clone());
        audit
    }

    /// Committed rows of a clinic day, in sequence order.
    pub async fn history(&self, day: &DayKey) -> QueueResult<Vec<OverrideAudit>> {
        let mut rows = self.repository.audit_trail(day).await?;
        rows.sort_by_key(|r| r.sequence_number);
        Ok(rows)
    }

    /// Committed rows touching one appointment.
    pub async fn history_for(
        &self,
        day: &DayKey,
        appointment_id: &AppointmentId,
    ) -> QueueResult<Vec<OverrideAudit>> {
        Ok(self
            .history(day)
            .await?
            .into_iter()
            .filter(|r| {
                r.appointment_id.as_ref() == Some(appointment_id)
                    || r.skipped_appointment_ids.contains(appointment_id)
            })
            .collect())
    }

    /// Check that rows are numbered 1, 2, 3... without gaps.
    pub fn verify_sequence(rows: &[OverrideAudit]) -> Result<(), SequenceBreak> {
        for (index, row) in rows.iter().enumerate() {
            let expected = index as u64 + 1;
            if row.sequence_number != expected {
                return Err(SequenceBreak {
                    index,
                    expected,
                    found: row.sequence_number,
                });
            }
        }
        Ok(())
    }

    /// How often an appointment was bypassed, according to the trail.
    pub fn skips_of(rows: &[OverrideAudit], appointment_id: &AppointmentId) -> usize {
        rows.iter()
            .filter(|r| r.skipped_appointment_ids.contains(appointment_id))
            .count()
    }
}
