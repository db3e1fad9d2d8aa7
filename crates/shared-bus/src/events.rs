//! # Queue Events
//!
//! Defines all event types that flow through the shared bus. Each event is
//! emitted only after the mutation that produced it has been committed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{AppointmentId, ClinicId, ClosureId, DayKey, PatientRef, StaffId};
use uuid::Uuid;

/// Envelope fields common to every queue event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMeta {
    /// Unique event identifier (idempotency key for consumers).
    pub event_id: Uuid,
    /// Clinic the event belongs to.
    pub clinic_id: ClinicId,
    /// Service day the event belongs to.
    pub date: NaiveDate,
    /// Who performed the action (`system` for automated transitions).
    pub actor: StaffId,
    /// Commit time of the mutation.
    pub occurred_at: DateTime<Utc>,
}

impl EventMeta {
    pub fn new(day: &DayKey, actor: StaffId, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            clinic_id: day.clinic_id.clone(),
            date: day.date,
            actor,
            occurred_at,
        }
    }

    /// The clinic-day this event is scoped to.
    pub fn day(&self) -> DayKey {
        DayKey::new(self.clinic_id.clone(), self.date)
    }
}

/// All events that can be published to the event bus.
///
/// A downstream notification collaborator subscribes to these to deliver
/// patient-facing messages; the queue never learns whether delivery worked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueueEvent {
    // =========================================================================
    // QUEUE FLOW
    // =========================================================================
    /// A patient checked in and received a queue position.
    PatientAddedToQueue {
        meta: EventMeta,
        appointment_id: AppointmentId,
        patient_ref: PatientRef,
        staff_id: StaffId,
        position: u64,
    },

    /// A patient was called into the consultation.
    PatientCalled {
        meta: EventMeta,
        appointment_id: AppointmentId,
        patient_ref: PatientRef,
        staff_id: StaffId,
        /// Position held at the time of the call.
        position: Option<u64>,
    },

    /// Present patients bypassed by an out-of-order call.
    PatientSkipped {
        meta: EventMeta,
        /// The patient called ahead of the others.
        called: AppointmentId,
        /// Bypassed patients, in queue order.
        skipped: Vec<AppointmentId>,
    },

    /// A consultation finished.
    AppointmentCompleted {
        meta: EventMeta,
        appointment_id: AppointmentId,
        patient_ref: PatientRef,
        staff_id: StaffId,
    },

    /// Aggregate queue figures after a change.
    QueueUpdated {
        meta: EventMeta,
        staff_id: StaffId,
        waiting_count: usize,
        /// Naive moving average of recent waits, in minutes.
        average_wait_minutes: Option<f64>,
    },

    // =========================================================================
    // ATTENDANCE
    // =========================================================================
    /// A waiting patient was not present when needed.
    PatientMarkedAbsent {
        meta: EventMeta,
        appointment_id: AppointmentId,
        patient_ref: PatientRef,
        grace_period_ends_at: DateTime<Utc>,
    },

    /// An absent patient came back within the grace period.
    PatientReturned {
        meta: EventMeta,
        appointment_id: AppointmentId,
        patient_ref: PatientRef,
        previous_position: Option<u64>,
        new_position: u64,
    },

    /// The grace period lapsed and the patient became a no-show.
    PatientAutoCancelled {
        meta: EventMeta,
        appointment_id: AppointmentId,
        patient_ref: PatientRef,
    },

    // =========================================================================
    // DAY CLOSURE
    // =========================================================================
    /// A staff member's queue was closed for the day.
    DayClosed {
        meta: EventMeta,
        closure_id: ClosureId,
        staff_id: StaffId,
        no_show_ids: Vec<AppointmentId>,
        completed_ids: Vec<AppointmentId>,
        reopenable_until: DateTime<Utc>,
    },

    /// A closure was reversed within its window.
    DayReopened {
        meta: EventMeta,
        closure_id: ClosureId,
        staff_id: StaffId,
        restored_ids: Vec<AppointmentId>,
    },
}

impl QueueEvent {
    /// Common envelope fields.
    #[must_use]
    pub fn meta(&self) -> &EventMeta {
        match self {
            Self::PatientAddedToQueue { meta, .. }
            | Self::PatientCalled { meta, .. }
            | Self::PatientSkipped { meta, .. }
            | Self::AppointmentCompleted { meta, .. }
            | Self::QueueUpdated { meta, .. }
            | Self::PatientMarkedAbsent { meta, .. }
            | Self::PatientReturned { meta, .. }
            | Self::PatientAutoCancelled { meta, .. }
            | Self::DayClosed { meta, .. }
            | Self::DayReopened { meta, .. } => meta,
        }
    }

    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::PatientAddedToQueue { .. }
            | Self::PatientCalled { .. }
            | Self::PatientSkipped { .. }
            | Self::AppointmentCompleted { .. }
            | Self::QueueUpdated { .. } => EventTopic::QueueFlow,
            Self::PatientMarkedAbsent { .. }
            | Self::PatientReturned { .. }
            | Self::PatientAutoCancelled { .. } => EventTopic::Attendance,
            Self::DayClosed { .. } | Self::DayReopened { .. } => EventTopic::DayClosure,
        }
    }

    /// Short event name, as used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PatientAddedToQueue { .. } => "PatientAddedToQueue",
            Self::PatientCalled { .. } => "PatientCalled",
            Self::PatientSkipped { .. } => "PatientSkipped",
            Self::AppointmentCompleted { .. } => "AppointmentCompleted",
            Self::QueueUpdated { .. } => "QueueUpdated",
            Self::PatientMarkedAbsent { .. } => "PatientMarkedAbsent",
            Self::PatientReturned { .. } => "PatientReturned",
            Self::PatientAutoCancelled { .. } => "PatientAutoCancelled",
            Self::DayClosed { .. } => "DayClosed",
            Self::DayReopened { .. } => "DayReopened",
        }
    }

    /// Appointment ids affected by this event.
    #[must_use]
    pub fn appointment_ids(&self) -> Vec<AppointmentId> {
        match self {
            Self::PatientAddedToQueue { appointment_id, .. }
            | Self::PatientCalled { appointment_id, .. }
            | Self::AppointmentCompleted { appointment_id, .. }
            | Self::PatientMarkedAbsent { appointment_id, .. }
            | Self::PatientReturned { appointment_id, .. }
            | Self::PatientAutoCancelled { appointment_id, .. } => vec![*appointment_id],
            Self::PatientSkipped { called, skipped, .. } => {
                std::iter::once(*called).chain(skipped.iter().copied()).collect()
            }
            Self::QueueUpdated { .. } => Vec::new(),
            Self::DayClosed {
                no_show_ids,
                completed_ids,
                ..
            } => no_show_ids.iter().chain(completed_ids).copied().collect(),
            Self::DayReopened { restored_ids, .. } => restored_ids.clone(),
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Check-in, calls, skips, completions and queue figures.
    QueueFlow,
    /// Absences, returns and automatic no-shows.
    Attendance,
    /// End-of-day closure and reopen.
    DayClosure,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Clinics to include. Empty means all clinics.
    pub clinics: Vec<ClinicId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            clinics: Vec::new(),
        }
    }

    /// Create a filter for events from specific clinics.
    #[must_use]
    pub fn for_clinics(clinics: Vec<ClinicId>) -> Self {
        Self {
            topics: Vec::new(),
            clinics,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &QueueEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let clinic_match =
            self.clinics.is_empty() || self.clinics.contains(&event.meta().clinic_id);

        topic_match && clinic_match
    }
}
