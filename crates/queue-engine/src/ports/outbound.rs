//! # Outbound Ports
//!
//! Dependencies the queue drives: transactional storage, the event sink
//! and a clock.

use crate::domain::{DayState, OverrideAudit, PendingExpiry, QueueResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_bus::QueueEvent;
use shared_types::{AppointmentId, ClosureId, DayKey};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

// =============================================================================
// STORAGE
// =============================================================================

/// Exclusive write access to one clinic day.
///
/// Holds the day's writer lease plus a private working copy of its state.
/// Changes become visible only through [`QueueRepository::commit`];
/// dropping the transaction discards them and releases the lease.
pub struct DayTransaction {
    base_revision: u64,
    state: DayState,
    audits: Vec<OverrideAudit>,
    events: Vec<QueueEvent>,
    lease: OwnedMutexGuard<()>,
}

/// A transaction taken apart by the storage adapter on commit.
pub struct TransactionParts {
    pub base_revision: u64,
    pub state: DayState,
    pub audits: Vec<OverrideAudit>,
    pub events: Vec<QueueEvent>,
    pub lease: OwnedMutexGuard<()>,
}

impl DayTransaction {
    pub fn new(state: DayState, lease: OwnedMutexGuard<()>) -> Self {
        Self {
            base_revision: state.revision,
            state,
            audits: Vec::new(),
            events: Vec::new(),
            lease,
        }
    }

    pub fn day(&self) -> &DayKey {
        &self.state.day
    }

    /// Revision the working copy was taken from.
    pub fn base_revision(&self) -> u64 {
        self.base_revision
    }

    pub fn state(&self) -> &DayState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DayState {
        &mut self.state
    }

    /// Stage an audit row for the commit.
    pub fn stage_audit(&mut self, audit: OverrideAudit) {
        self.audits.push(audit);
    }

    pub fn staged_audits(&self) -> &[OverrideAudit] {
        &self.audits
    }

    /// Stage an event to publish once the commit succeeds.
    pub fn emit(&mut self, event: QueueEvent) {
        self.events.push(event);
    }

    pub fn staged_events(&self) -> &[QueueEvent] {
        &self.events
    }

    pub fn into_parts(self) -> TransactionParts {
        TransactionParts {
            base_revision: self.base_revision,
            state: self.state,
            audits: self.audits,
            events: self.events,
            lease: self.lease,
        }
    }
}

impl fmt::Debug for DayTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DayTransaction")
            .field("day", self.day())
            .field("base_revision", &self.base_revision)
            .field("staged_audits", &self.audits.len())
            .field("staged_events", &self.events.len())
            .finish_non_exhaustive()
    }
}

/// What a successful commit made durable.
///
/// Keeps the day's writer lease until dropped, so the caller publishes
/// `events` before the next writer of the same day can commit.
#[derive(Debug)]
pub struct CommitReceipt {
    pub revision: u64,
    pub audits: Vec<OverrideAudit>,
    /// Events to publish, in emission order.
    pub events: Vec<QueueEvent>,
    lease: OwnedMutexGuard<()>,
}

impl CommitReceipt {
    pub fn new(
        revision: u64,
        audits: Vec<OverrideAudit>,
        events: Vec<QueueEvent>,
        lease: OwnedMutexGuard<()>,
    ) -> Self {
        Self {
            revision,
            audits,
            events,
            lease,
        }
    }

    /// Release the writer lease.
    pub fn release(self) -> u64 {
        drop(self.lease);
        self.revision
    }
}

/// Transactional storage for clinic days.
///
/// Production would put a relational store behind this trait;
/// `InMemoryQueueRepository` serves the runtime and the tests.
///
/// ## Atomicity
///
/// `commit` applies the state swap and the audit append together or not
/// at all. A failed commit leaves the previous revision untouched.
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Acquire the writer lease of `day`, waiting at most `lock_timeout`.
    ///
    /// # Errors
    /// - `LockTimeout`: lease not acquired in time
    async fn begin(&self, day: &DayKey, lock_timeout: Duration) -> QueueResult<DayTransaction>;

    /// Make a transaction's changes visible. The returned receipt still
    /// holds the writer lease.
    ///
    /// # Errors
    /// - `Conflict`: the stored revision moved since `begin`
    /// - `Storage`: the write failed; nothing was applied
    async fn commit(&self, tx: DayTransaction) -> QueueResult<CommitReceipt>;

    /// Latest committed state of `day`. Never blocks on writers.
    async fn snapshot(&self, day: &DayKey) -> QueueResult<Arc<DayState>>;

    /// Clinic day an appointment belongs to.
    async fn locate(&self, appointment_id: &AppointmentId) -> QueueResult<Option<DayKey>>;

    /// Clinic day a closure belongs to.
    async fn locate_closure(&self, closure_id: &ClosureId) -> QueueResult<Option<DayKey>>;

    /// Committed audit rows of `day`, in sequence order.
    async fn audit_trail(&self, day: &DayKey) -> QueueResult<Vec<OverrideAudit>>;

    /// Open absences across all days, for deadline recovery.
    async fn open_absences(&self) -> QueueResult<Vec<PendingExpiry>>;
}

// =============================================================================
// EVENTS
// =============================================================================

/// Where committed events go.
#[async_trait]
pub trait QueueEventSink: Send + Sync {
    /// Publish events in order. Returns how many were delivered to at
    /// least one subscriber.
    async fn publish_all(&self, events: Vec<QueueEvent>) -> usize;
}

// =============================================================================
// TIME
// =============================================================================

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
