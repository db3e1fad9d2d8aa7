//! Test utilities for the clinic queue.
//!
//! Deterministic clock, recording event sink and a ready-wired service.
//! Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use queue_engine::test_utils::MockTimeSource;
//! use queue_engine::TimeSource;
//!
//! let clock = MockTimeSource::at_clinic_opening();
//! let opened = clock.now();
//! clock.advance_minutes(10);
//! assert_eq!((clock.now() - opened).num_minutes(), 10);
//! ```

use crate::adapters::InMemoryQueueRepository;
use crate::config::QueueConfig;
use crate::domain::QueueEntry;
use crate::ports::{CheckInRequest, QueueApi, QueueEventSink, TimeSource};
use crate::service::QueueService;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;
use shared_bus::{EventMeta, EventPublisher, InMemoryEventBus, QueueEvent};
use shared_types::{AppointmentId, DayKey, PatientRef, StaffId};
use std::sync::Arc;

/// Service day used throughout the tests.
pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap_or_default()
}

pub fn day(clinic: &str) -> DayKey {
    DayKey::new(clinic.into(), test_date())
}

/// A scheduled entry that has not checked in yet.
pub fn scheduled_entry(day: &DayKey, staff: &str, patient: &str) -> QueueEntry {
    QueueEntry::scheduled(
        AppointmentId::new(),
        day,
        StaffId::from(staff),
        PatientRef::from(patient),
        "consultation",
        Utc::now(),
    )
}

pub fn event_meta(day: &DayKey) -> EventMeta {
    EventMeta::new(day, StaffId::from("front-desk"), Utc::now())
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct MockTimeSource {
    now: Mutex<DateTime<Utc>>,
}

impl MockTimeSource {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// 08:00 UTC on the test date.
    pub fn at_clinic_opening() -> Self {
        Self::new(
            Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
        )
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.advance(Duration::minutes(minutes));
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Records every published event, optionally forwarding to a bus.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<QueueEvent>>,
    bus: Option<Arc<InMemoryEventBus>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwarding(bus: Arc<InMemoryEventBus>) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            bus: Some(bus),
        }
    }

    pub fn events(&self) -> Vec<QueueEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(QueueEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl QueueEventSink for RecordingEventSink {
    async fn publish_all(&self, events: Vec<QueueEvent>) -> usize {
        let count = events.len();
        self.events.lock().extend(events.iter().cloned());
        if let Some(bus) = &self.bus {
            for event in events {
                bus.publish(event).await;
            }
        }
        count
    }
}

pub type TestService = QueueService<InMemoryQueueRepository, RecordingEventSink, Arc<MockTimeSource>>;

/// A service over in-memory storage with a controllable clock.
pub struct Harness {
    pub day: DayKey,
    pub clock: Arc<MockTimeSource>,
    pub repository: Arc<InMemoryQueueRepository>,
    pub events: Arc<RecordingEventSink>,
    pub bus: Arc<InMemoryEventBus>,
    pub service: Arc<TestService>,
}

pub fn harness() -> Harness {
    harness_with(QueueConfig::for_testing())
}

pub fn harness_with(config: QueueConfig) -> Harness {
    let clock = Arc::new(MockTimeSource::at_clinic_opening());
    let repository = Arc::new(InMemoryQueueRepository::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let events = Arc::new(RecordingEventSink::forwarding(bus.clone()));
    let service = Arc::new(QueueService::new(
        repository.clone(),
        events.clone(),
        clock.clone(),
        config,
    ));
    Harness {
        day: day("north"),
        clock,
        repository,
        events,
        bus,
        service,
    }
}

impl Harness {
    pub fn check_in_request(&self, staff: &str, patient: &str) -> CheckInRequest {
        CheckInRequest {
            appointment_id: None,
            clinic_id: self.day.clinic_id.clone(),
            date: self.day.date,
            staff_id: StaffId::from(staff),
            patient_ref: PatientRef::from(patient),
            appointment_type: "consultation".to_string(),
            performed_by: StaffId::from("front-desk"),
        }
    }
}

/// Walk a patient in for `staff` on the harness day.
pub async fn check_in(h: &Harness, staff: &str, patient: &str) -> AppointmentId {
    match h.service.check_in(h.check_in_request(staff, patient)).await {
        Ok(entry) => entry.id,
        Err(e) => panic!("check-in failed: {e}"),
    }
}

/// Check in several patients for one staff member, in order.
pub async fn check_in_all(h: &Harness, staff: &str, patients: &[&str]) -> Vec<AppointmentId> {
    let mut ids = Vec::with_capacity(patients.len());
    for patient in patients {
        ids.push(check_in(h, staff, patient).await);
    }
    ids
}
