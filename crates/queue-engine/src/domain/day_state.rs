//! # Clinic-Day State
//!
//! Everything that belongs to one clinic on one service day: entries,
//! absence history, closures, the position high-water mark and the audit
//! sequence counter. Mutations operate on a private working copy that the
//! repository swaps in on commit, so readers always see a whole revision.

use super::entities::{AbsenceRecord, QueueDayClosure, QueueEntry};
use super::errors::{QueueError, QueueResult, APPOINTMENT};
use serde::{Deserialize, Serialize};
use shared_types::{AppointmentId, ClosureId, DayKey, QueueStatus, StaffId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayState {
    pub day: DayKey,
    /// Number of commits applied to this day.
    pub revision: u64,
    entries: BTreeMap<AppointmentId, QueueEntry>,
    absences: Vec<AbsenceRecord>,
    closures: BTreeMap<ClosureId, QueueDayClosure>,
    position_high_water: u64,
    audit_sequence: u64,
}

impl DayState {
    pub fn new(day: DayKey) -> Self {
        Self {
            day,
            revision: 0,
            entries: BTreeMap::new(),
            absences: Vec::new(),
            closures: BTreeMap::new(),
            position_high_water: 0,
            audit_sequence: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Entries
    // -------------------------------------------------------------------------

    pub fn entry(&self, id: &AppointmentId) -> Option<&QueueEntry> {
        self.entries.get(id)
    }

    pub fn require_entry(&self, id: &AppointmentId) -> QueueResult<&QueueEntry> {
        self.entries
            .get(id)
            .ok_or_else(|| QueueError::not_found(APPOINTMENT, id))
    }

    pub fn require_entry_mut(&mut self, id: &AppointmentId) -> QueueResult<&mut QueueEntry> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| QueueError::not_found(APPOINTMENT, id))
    }

    pub fn contains(&self, id: &AppointmentId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn insert_entry(&mut self, entry: QueueEntry) {
        self.entries.insert(entry.id, entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.values()
    }

    /// Entries, optionally restricted to one staff member.
    pub fn entries_for(&self, staff_id: Option<&StaffId>) -> Vec<&QueueEntry> {
        self.entries
            .values()
            .filter(|e| staff_id.map_or(true, |s| &e.staff_id == s))
            .collect()
    }

    /// Entries with `status` in queue order.
    pub fn in_queue_order(
        &self,
        status: QueueStatus,
        staff_id: Option<&StaffId>,
    ) -> Vec<&QueueEntry> {
        self.in_queue_order_any(&[status], staff_id)
    }

    /// Entries with any of `statuses`, merged in queue order.
    pub fn in_queue_order_any(
        &self,
        statuses: &[QueueStatus],
        staff_id: Option<&StaffId>,
    ) -> Vec<&QueueEntry> {
        let mut selected: Vec<&QueueEntry> = self
            .entries_for(staff_id)
            .into_iter()
            .filter(|e| statuses.contains(&e.status))
            .collect();
        selected.sort_by_key(|e| queue_key(e));
        selected
    }

    /// Waiting entries with no open absence, in queue order.
    pub fn present_waiting(&self, staff_id: Option<&StaffId>) -> Vec<&QueueEntry> {
        self.in_queue_order(QueueStatus::Waiting, staff_id)
            .into_iter()
            .filter(|e| self.open_absence(&e.id).is_none())
            .collect()
    }

    pub fn in_progress_for(&self, staff_id: &StaffId) -> Option<&QueueEntry> {
        self.entries
            .values()
            .find(|e| e.status == QueueStatus::InProgress && &e.staff_id == staff_id)
    }

    pub fn max_waiting_position(&self) -> Option<u64> {
        self.entries
            .values()
            .filter(|e| e.status == QueueStatus::Waiting)
            .filter_map(|e| e.queue_position)
            .max()
    }

    // -------------------------------------------------------------------------
    // Absences
    // -------------------------------------------------------------------------

    pub fn absences(&self) -> &[AbsenceRecord] {
        &self.absences
    }

    pub fn open_absences(&self) -> impl Iterator<Item = &AbsenceRecord> {
        self.absences.iter().filter(|a| a.is_open())
    }

    pub fn open_absence(&self, id: &AppointmentId) -> Option<&AbsenceRecord> {
        self.absences
            .iter()
            .find(|a| &a.appointment_id == id && a.is_open())
    }

    pub fn open_absence_mut(&mut self, id: &AppointmentId) -> Option<&mut AbsenceRecord> {
        self.absences
            .iter_mut()
            .find(|a| &a.appointment_id == id && a.is_open())
    }

    /// Most recent absence of an entry, open or not.
    pub fn latest_absence(&self, id: &AppointmentId) -> Option<&AbsenceRecord> {
        self.absences
            .iter()
            .rev()
            .find(|a| &a.appointment_id == id)
    }

    pub fn push_absence(&mut self, record: AbsenceRecord) {
        self.absences.push(record);
    }

    // -------------------------------------------------------------------------
    // Closures
    // -------------------------------------------------------------------------

    pub fn closure(&self, id: &ClosureId) -> Option<&QueueDayClosure> {
        self.closures.get(id)
    }

    pub fn closure_mut(&mut self, id: &ClosureId) -> Option<&mut QueueDayClosure> {
        self.closures.get_mut(id)
    }

    pub fn closures(&self) -> impl Iterator<Item = &QueueDayClosure> {
        self.closures.values()
    }

    pub fn insert_closure(&mut self, closure: QueueDayClosure) {
        self.closures.insert(closure.id, closure);
    }

    pub fn active_closure_for(&self, staff_id: &StaffId) -> Option<&QueueDayClosure> {
        self.closures
            .values()
            .find(|c| c.is_active() && &c.staff_id == staff_id)
    }

    // -------------------------------------------------------------------------
    // Counters
    // -------------------------------------------------------------------------

    /// Highest position ever handed out on this day.
    pub fn position_high_water(&self) -> u64 {
        self.position_high_water
    }

    pub fn raise_high_water(&mut self, position: u64) {
        self.position_high_water = self.position_high_water.max(position);
    }

    pub fn audit_sequence(&self) -> u64 {
        self.audit_sequence
    }

    pub fn next_audit_sequence(&mut self) -> u64 {
        self.audit_sequence += 1;
        self.audit_sequence
    }
}

fn queue_key(entry: &QueueEntry) -> (u64, Option<chrono::DateTime<chrono::Utc>>, AppointmentId) {
    (
        entry.queue_position.unwrap_or(u64::MAX),
        entry.checked_in_at,
        entry.id,
    )
}
