//! # Clinic Queue Engine
//!
//! Runs the patient queue of a clinic day: check-in, calls in and out of
//! order, absences with a grace period, fair re-queueing of late arrivals
//! and an atomic, briefly reversible end-of-day closure.
//!
//! ## Status Lifecycle
//!
//! ```text
//! [SCHEDULED] ──checkIn──→ [WAITING] ──call──→ [IN_PROGRESS] ──complete──→ [COMPLETED]
//!                             │  ↑                                              ↑
//!                   markAbsent│  │lateArrival                       dayClosure──┘ (from IN_PROGRESS)
//!                             ↓  │
//!                          [ABSENT] ──graceExpiry / dayClosure──→ [NO_SHOW]
//!                                                                     │
//!                                      reopenDay (within window) ─────┘──→ [WAITING]
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Only legal status transitions | `domain/state_machine.rs` - `ensure_transition()` |
//! | WAITING positions unique and increasing | `domain/positions.rs` - `PositionAssigner::next_tail()` |
//! | Absent patients are never called | `service.rs` - `present_waiting()` candidate set |
//! | One consultation per staff member | `service.rs` - `ensure_staff_free()` |
//! | Scheduler never overrides manual actions | `service.rs` - `expire_absence()` version check |
//! | All-or-nothing mutations | `ports/outbound.rs` - `DayTransaction` |
//! | Gap-free audit numbering per clinic day | `auditor.rs` - `OverrideAuditor::record()` |
//!
//! ## Concurrency
//!
//! Mutations on one clinic day are serialized by a per-day writer lease with
//! a bounded wait. Reads are served from the last committed snapshot and
//! never wait for a writer. Events are published only after commit.
//!
//! ## Architecture
//!
//! Hexagonal:
//! - `domain/` - entities, state machine, positions, errors
//! - `ports/` - `QueueApi` (inbound), `QueueRepository`, `QueueEventSink`, `TimeSource` (outbound)
//! - `adapters/` - in-memory storage, bus sink, retry decorator
//! - `service` - command handlers
//! - `query` - read-only views
//! - `auditor` - override audit trail
//! - `scheduler` - grace-period background task

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod auditor;
pub mod config;
pub mod domain;
pub mod ports;
pub mod query;
pub mod scheduler;
pub mod service;

/// Deterministic clock, recording sink and a wired test service.
///
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-exports
pub use adapters::{BusEventSink, InMemoryQueueRepository, NoOpEventSink, RetryingQueueApi};
pub use auditor::{AuditDraft, OverrideAuditor, SequenceBreak};
pub use config::{ConfigError, QueueConfig, SchedulerConfig, MAX_REOPEN_WINDOW_SECS};
pub use domain::{
    AbsenceRecord, ActionType, CallOutcome, ClosurePreview, DayState, ErrorKind, ExpiryOutcome,
    ExpirySkip, LateArrivalOutcome, OverrideAudit, PendingExpiry, QueueDayClosure, QueueEntry,
    QueueError, QueueResult, QueueStats, QueueStatusView, StatusCounts,
};
pub use ports::{
    CallPresentRequest, CheckInRequest, DayTransaction, EndDayRequest, MarkAbsentRequest,
    QueueApi, QueueEventSink, QueueRepository, ReopenDayRequest, ScheduleRequest,
    SystemTimeSource, TimeSource,
};
pub use query::QueryFacade;
pub use scheduler::{GracePeriodScheduler, TickReport};
pub use service::QueueService;
