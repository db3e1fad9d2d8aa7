//! # Grace-Period Scheduler
//!
//! Turns absences whose grace period lapsed into no-shows.
//!
//! Deadlines arrive two ways: `PatientMarkedAbsent` events from the bus,
//! and periodic sweeps of open absences in storage (which also recover
//! deadlines after a restart). Due deadlines go through
//! [`QueueService::expire_absence`], the same locked, compare-and-swap
//! guarded path as staff commands. An entry that moved on in the
//! meantime is left alone.

use crate::config::SchedulerConfig;
use crate::domain::{ExpiryOutcome, ExpirySkip, PendingExpiry, QueueResult};
use crate::ports::{QueueEventSink, QueueRepository, TimeSource};
use crate::service::QueueService;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shared_bus::{QueueEvent, Subscription};
use shared_types::{AppointmentId, DayKey, QueueStatus};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Deadline {
    due: DateTime<Utc>,
    appointment_id: AppointmentId,
    day: DayKey,
}

impl From<PendingExpiry> for Deadline {
    fn from(pending: PendingExpiry) -> Self {
        Self {
            due: pending.grace_period_ends_at,
            appointment_id: pending.appointment_id,
            day: pending.day,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub expired: Vec<AppointmentId>,
    /// Deadlines whose entry had already moved on.
    pub skipped: usize,
    /// Attempts that failed and were re-queued.
    pub failed: usize,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.skipped == 0 && self.failed == 0
    }
}

pub struct GracePeriodScheduler<R, E, T> {
    service: Arc<QueueService<R, E, T>>,
    config: SchedulerConfig,
    deadlines: Mutex<BinaryHeap<Reverse<Deadline>>>,
    tracked: Mutex<HashSet<(AppointmentId, DateTime<Utc>)>>,
    ticks: AtomicU64,
}

impl<R, E, T> GracePeriodScheduler<R, E, T>
where
    R: QueueRepository,
    E: QueueEventSink,
    T: TimeSource,
{
    pub fn new(service: Arc<QueueService<R, E, T>>, config: SchedulerConfig) -> Self {
        if let Err(e) = config.validate() {
            warn!(error = %e, "Scheduler config out of range, clamping");
        }
        Self {
            service,
            config,
            deadlines: Mutex::new(BinaryHeap::new()),
            tracked: Mutex::new(HashSet::new()),
            ticks: AtomicU64::new(0),
        }
    }

    /// Start tracking a deadline. Returns false if it was already tracked.
    pub fn track(&self, pending: PendingExpiry) -> bool {
        let key = (pending.appointment_id, pending.grace_period_ends_at);
        if !self.tracked.lock().insert(key) {
            return false;
        }
        self.deadlines.lock().push(Reverse(pending.into()));
        true
    }

    /// Pick up deadlines from bus events.
    pub fn observe(&self, event: &QueueEvent) {
        if let QueueEvent::PatientMarkedAbsent {
            meta,
            appointment_id,
            grace_period_ends_at,
            ..
        } = event
        {
            let added = self.track(PendingExpiry {
                day: meta.day(),
                appointment_id: *appointment_id,
                grace_period_ends_at: *grace_period_ends_at,
            });
            if added {
                debug!(appointment_id = %appointment_id, due = %grace_period_ends_at, "Deadline tracked");
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.deadlines.lock().len()
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.deadlines.lock().peek().map(|Reverse(d)| d.due)
    }

    /// Reload open absences from storage. Returns how many were new.
    pub async fn sweep(&self) -> QueueResult<usize> {
        let open = self.service.repository().open_absences().await?;
        Ok(open
            .into_iter()
            .filter(|pending| self.track(pending.clone()))
            .count())
    }

    /// Expire every deadline that is due now.
    pub async fn tick(&self) -> TickReport {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed);
        if tick % self.config.sweep_period() == 0 {
            match self.sweep().await {
                Ok(0) => {}
                Ok(found) => debug!(found, "Sweep recovered deadlines"),
                Err(e) => warn!(error = %e, "Open-absence sweep failed"),
            }
        }

        let now = self.service.now();
        let due = self.take_due(now);
        let mut report = TickReport::default();

        for deadline in due {
            match self.expire(&deadline).await {
                Ok(ExpiryOutcome::Expired(entry)) => report.expired.push(entry.id),
                Ok(ExpiryOutcome::Skipped(reason)) => {
                    debug!(appointment_id = %deadline.appointment_id, ?reason, "Expiry skipped");
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(
                        appointment_id = %deadline.appointment_id,
                        error = %e,
                        "Expiry failed, retrying next tick"
                    );
                    report.failed += 1;
                    self.requeue(deadline);
                }
            }
        }
        report
    }

    /// Tick until shutdown, absorbing bus events in between.
    pub async fn run(self: Arc<Self>, mut events: Subscription, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut bus_open = true;
        info!(tick_ms = self.config.tick_interval_ms, "Grace-period scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    if !report.is_empty() {
                        info!(
                            expired = report.expired.len(),
                            skipped = report.skipped,
                            failed = report.failed,
                            "Grace-period tick"
                        );
                    }
                }
                event = events.recv(), if bus_open => match event {
                    Some(event) => self.observe(&event),
                    None => {
                        warn!("Event bus closed, relying on storage sweeps");
                        bus_open = false;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(pending = self.pending_count(), "Grace-period scheduler stopped");
    }

    fn take_due(&self, now: DateTime<Utc>) -> Vec<Deadline> {
        let mut heap = self.deadlines.lock();
        let mut due = Vec::new();
        while heap.peek().is_some_and(|Reverse(d)| d.due <= now) {
            if let Some(Reverse(deadline)) = heap.pop() {
                due.push(deadline);
            }
        }
        drop(heap);

        let mut tracked = self.tracked.lock();
        for deadline in &due {
            tracked.remove(&(deadline.appointment_id, deadline.due));
        }
        due
    }

    fn requeue(&self, deadline: Deadline) {
        self.tracked
            .lock()
            .insert((deadline.appointment_id, deadline.due));
        self.deadlines.lock().push(Reverse(deadline));
    }

    async fn expire(&self, deadline: &Deadline) -> QueueResult<ExpiryOutcome> {
        // Observe the current version, then let the service compare-and-swap on it.
        let snapshot = self.service.repository().snapshot(&deadline.day).await?;
        let Some(entry) = snapshot.entry(&deadline.appointment_id) else {
            return Ok(ExpiryOutcome::Skipped(ExpirySkip::Superseded));
        };
        if entry.status != QueueStatus::Absent {
            return Ok(ExpiryOutcome::Skipped(ExpirySkip::Superseded));
        }
        let version = entry.version;
        self.service
            .expire_absence(&deadline.day, deadline.appointment_id, version)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MarkAbsentRequest, QueueApi};
    use crate::adapters::InMemoryQueueRepository;
    use crate::test_utils::{check_in, harness, Harness, MockTimeSource, RecordingEventSink};
    use chrono::Duration;
    use shared_types::StaffId;

    type TestScheduler =
        GracePeriodScheduler<InMemoryQueueRepository, RecordingEventSink, Arc<MockTimeSource>>;

    fn scheduler(h: &Harness) -> TestScheduler {
        GracePeriodScheduler::new(h.service.clone(), SchedulerConfig::default())
    }

    async fn absent(h: &Harness, minutes: u32) -> AppointmentId {
        let id = check_in(h, "dr-lee", "p-1").await;
        h.service
            .mark_absent(MarkAbsentRequest {
                appointment_id: id,
                performed_by: StaffId::from("front-desk"),
                grace_period_minutes: Some(minutes),
                reason: None,
            })
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_sweep_recovers_deadlines_and_expires_when_due() {
        let h = harness();
        let id = absent(&h, 10).await;
        let scheduler = scheduler(&h);

        // First tick sweeps storage; nothing is due yet.
        assert!(scheduler.tick().await.is_empty());
        assert_eq!(scheduler.pending_count(), 1);

        h.clock.advance(Duration::minutes(10));
        let report = scheduler.tick().await;
        assert_eq!(report.expired, vec![id]);
        assert_eq!(scheduler.pending_count(), 0);

        let entry = h.service.query().entry(&id).await.unwrap();
        assert_eq!(entry.status, QueueStatus::NoShow);
        assert!(h.events.names().contains(&"PatientAutoCancelled"));
    }

    #[tokio::test]
    async fn test_zero_sweep_period_sweeps_every_tick() {
        let h = harness();
        let scheduler = GracePeriodScheduler::new(
            h.service.clone(),
            SchedulerConfig {
                tick_interval_ms: 0,
                sweep_every_ticks: 0,
            },
        );

        assert!(scheduler.tick().await.is_empty());
        let id = absent(&h, 5).await;
        scheduler.tick().await;
        assert_eq!(scheduler.pending_count(), 1);

        h.clock.advance(Duration::minutes(5));
        assert_eq!(scheduler.tick().await.expired, vec![id]);
    }

    #[tokio::test]
    async fn test_returned_patient_is_left_alone() {
        let h = harness();
        let id = absent(&h, 5).await;
        let scheduler = scheduler(&h);
        scheduler.sweep().await.unwrap();

        h.clock.advance(Duration::minutes(6));
        h.service
            .handle_late_arrival(id, &StaffId::from("front-desk"))
            .await
            .unwrap();

        let report = scheduler.tick().await;
        assert!(report.expired.is_empty());
        assert_eq!(report.skipped, 1);
        let entry = h.service.query().entry(&id).await.unwrap();
        assert_eq!(entry.status, QueueStatus::Waiting);
    }

    #[tokio::test]
    async fn test_stale_version_is_superseded() {
        let h = harness();
        let id = absent(&h, 1).await;
        h.clock.advance(Duration::minutes(2));

        let day = h.day.clone();
        let outcome = h.service.expire_absence(&day, id, 0).await.unwrap();
        assert_eq!(outcome, ExpiryOutcome::Skipped(ExpirySkip::Superseded));
    }

    #[tokio::test]
    async fn test_not_due_yet() {
        let h = harness();
        let id = absent(&h, 10).await;
        let version = h.service.query().entry(&id).await.unwrap().version;

        let day = h.day.clone();
        let outcome = h.service.expire_absence(&day, id, version).await.unwrap();
        assert_eq!(outcome, ExpiryOutcome::Skipped(ExpirySkip::NotDue));
    }

    #[tokio::test]
    async fn test_observe_tracks_once() {
        let h = harness();
        let mut sub = h.bus.subscribe(shared_bus::EventFilter::all());
        let scheduler = scheduler(&h);
        absent(&h, 10).await;

        for event in sub.drain() {
            scheduler.observe(&event);
            scheduler.observe(&event);
        }
        assert_eq!(scheduler.pending_count(), 1);
        assert_eq!(scheduler.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_expiry_is_requeued() {
        let h = harness();
        absent(&h, 1).await;
        let scheduler = scheduler(&h);
        scheduler.sweep().await.unwrap();
        h.clock.advance(Duration::minutes(1));

        h.repository.fail_next_commits(1);
        let report = scheduler.tick().await;
        assert_eq!(report.failed, 1);
        assert_eq!(scheduler.pending_count(), 1);

        let report = scheduler.tick().await;
        assert_eq!(report.expired.len(), 1);
    }
}
