//! # In-Memory Queue Repository
//!
//! Per clinic-day slots with a writer lease and a copy-on-write committed
//! state. Readers clone an `Arc` of the latest revision and never wait on
//! writers; writers queue on the lease with a bounded wait.

use crate::domain::{DayState, OverrideAudit, PendingExpiry, QueueError, QueueResult};
use crate::ports::{CommitReceipt, DayTransaction, QueueRepository};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use shared_types::{AppointmentId, ClosureId, DayKey};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Committed data of one clinic day.
struct Committed {
    state: Arc<DayState>,
    audits: Vec<OverrideAudit>,
}

struct DaySlot {
    writer: Arc<Mutex<()>>,
    committed: RwLock<Committed>,
}

impl DaySlot {
    fn new(day: DayKey) -> Self {
        Self {
            writer: Arc::new(Mutex::new(())),
            committed: RwLock::new(Committed {
                state: Arc::new(DayState::new(day)),
                audits: Vec::new(),
            }),
        }
    }
}

/// Repository backed by process memory.
#[derive(Default)]
pub struct InMemoryQueueRepository {
    days: DashMap<DayKey, Arc<DaySlot>>,
    appointments: DashMap<AppointmentId, DayKey>,
    closures: DashMap<ClosureId, DayKey>,
    /// Remaining commits to fail on purpose.
    failing_commits: AtomicUsize,
    commits: AtomicU64,
}

impl InMemoryQueueRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits fail with a storage error.
    pub fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    /// Days with any stored state.
    pub fn days(&self) -> Vec<DayKey> {
        self.days.iter().map(|e| e.key().clone()).collect()
    }

    fn slot(&self, day: &DayKey) -> Arc<DaySlot> {
        let slot = self
            .days
            .entry(day.clone())
            .or_insert_with(|| Arc::new(DaySlot::new(day.clone())));
        Arc::clone(slot.value())
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl QueueRepository for InMemoryQueueRepository {
    async fn begin(&self, day: &DayKey, lock_timeout: Duration) -> QueueResult<DayTransaction> {
        let slot = self.slot(day);
        let lease = match tokio::time::timeout(lock_timeout, slot.writer.clone().lock_owned()).await
        {
            Ok(lease) => lease,
            Err(_) => {
                warn!(day = %day, waited_ms = lock_timeout.as_millis() as u64, "Writer lock timed out");
                return Err(QueueError::LockTimeout {
                    day: day.clone(),
                    waited_ms: lock_timeout.as_millis() as u64,
                });
            }
        };
        let working = slot.committed.read().state.as_ref().clone();
        Ok(DayTransaction::new(working, lease))
    }

    async fn commit(&self, tx: DayTransaction) -> QueueResult<CommitReceipt> {
        let parts = tx.into_parts();
        let day = parts.state.day.clone();

        if self.take_injected_failure() {
            warn!(day = %day, "Commit failed, changes discarded");
            return Err(QueueError::storage("injected commit failure"));
        }

        let slot = self.slot(&day);
        let mut committed = slot.committed.write();
        if committed.state.revision != parts.base_revision {
            return Err(QueueError::conflict(
                format!(
                    "revision moved from {} to {}",
                    parts.base_revision, committed.state.revision
                ),
                Vec::new(),
            ));
        }

        let mut state = parts.state;
        state.revision = parts.base_revision + 1;
        for entry in state.entries() {
            self.appointments.entry(entry.id).or_insert_with(|| day.clone());
        }
        for closure in state.closures() {
            self.closures.entry(closure.id).or_insert_with(|| day.clone());
        }

        let revision = state.revision;
        committed.audits.extend(parts.audits.iter().cloned());
        committed.state = Arc::new(state);
        drop(committed);

        self.commits.fetch_add(1, Ordering::Relaxed);
        debug!(
            day = %day,
            revision,
            audits = parts.audits.len(),
            events = parts.events.len(),
            "Committed"
        );

        Ok(CommitReceipt::new(
            revision,
            parts.audits,
            parts.events,
            parts.lease,
        ))
    }

    async fn snapshot(&self, day: &DayKey) -> QueueResult<Arc<DayState>> {
        match self.days.get(day) {
            Some(slot) => Ok(Arc::clone(&slot.committed.read().state)),
            None => Ok(Arc::new(DayState::new(day.clone()))),
        }
    }

    async fn locate(&self, appointment_id: &AppointmentId) -> QueueResult<Option<DayKey>> {
        Ok(self.appointments.get(appointment_id).map(|d| d.value().clone()))
    }

    async fn locate_closure(&self, closure_id: &ClosureId) -> QueueResult<Option<DayKey>> {
        Ok(self.closures.get(closure_id).map(|d| d.value().clone()))
    }

    async fn audit_trail(&self, day: &DayKey) -> QueueResult<Vec<OverrideAudit>> {
        Ok(self
            .days
            .get(day)
            .map(|slot| slot.committed.read().audits.clone())
            .unwrap_or_default())
    }

    async fn open_absences(&self) -> QueueResult<Vec<PendingExpiry>> {
        let slots: Vec<Arc<DaySlot>> = self.days.iter().map(|e| Arc::clone(e.value())).collect();
        let mut pending = Vec::new();
        for slot in slots {
            let state = Arc::clone(&slot.committed.read().state);
            pending.extend(state.open_absences().map(|a| PendingExpiry {
                day: state.day.clone(),
                appointment_id: a.appointment_id,
                grace_period_ends_at: a.grace_period_ends_at,
            }));
        }
        pending.sort_by_key(|p| p.grace_period_ends_at);
        Ok(pending)
    }
}
