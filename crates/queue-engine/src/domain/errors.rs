//! Queue error types.
//!
//! Every operation returns a typed failure the caller can act on. Each
//! variant maps to a stable [`ErrorKind`] code and names the appointment
//! ids it concerns.

use shared_types::{AppointmentId, ClosureId, DayKey, QueueStatus};
use thiserror::Error;

/// Queue error type.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueueError {
    /// Appointment, absence record or closure does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The state machine forbids the requested status change.
    #[error("Invalid state transition for {appointment_id}: {from} -> {to}")]
    InvalidStateTransition {
        appointment_id: AppointmentId,
        from: QueueStatus,
        to: QueueStatus,
    },

    /// A precondition of the operation does not hold.
    #[error("Business rule violated: {rule}")]
    BusinessRuleViolation {
        rule: String,
        appointment_ids: Vec<AppointmentId>,
    },

    /// Another actor changed the same data first.
    #[error("Conflict: {reason}")]
    Conflict {
        reason: String,
        appointment_ids: Vec<AppointmentId>,
        /// False once the winner's change is final, e.g. a resolved absence.
        retryable: bool,
    },

    /// A closure can no longer be reversed.
    #[error("Closure {closure_id} cannot be reopened: {reason}")]
    StaleClosure {
        closure_id: ClosureId,
        reason: String,
        /// Entries edited since the closure (empty when the window elapsed).
        changed_ids: Vec<AppointmentId>,
    },

    /// The clinic-day writer lock could not be acquired in time.
    #[error("Lock for {day} unavailable after {waited_ms}ms")]
    LockTimeout { day: DayKey, waited_ms: u64 },

    /// The storage engine failed to commit or read.
    #[error("Storage error: {reason}")]
    Storage { reason: String },
}

/// Entity name used for appointment lookups.
pub const APPOINTMENT: &str = "appointment";

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Stable, machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidStateTransition,
    BusinessRuleViolation,
    Conflict,
    StaleClosure,
    LockTimeout,
    Storage,
}

impl ErrorKind {
    /// Wire code for API consumers.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            Self::BusinessRuleViolation => "BUSINESS_RULE_VIOLATION",
            Self::Conflict => "CONFLICT",
            Self::StaleClosure => "STALE_CLOSURE",
            Self::LockTimeout => "LOCK_TIMEOUT",
            Self::Storage => "STORAGE",
        }
    }
}

impl QueueError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn rule(rule: impl Into<String>) -> Self {
        Self::BusinessRuleViolation {
            rule: rule.into(),
            appointment_ids: Vec::new(),
        }
    }

    pub fn rule_for(rule: impl Into<String>, appointment_id: AppointmentId) -> Self {
        Self::BusinessRuleViolation {
            rule: rule.into(),
            appointment_ids: vec![appointment_id],
        }
    }

    /// Lost a race that a fresh attempt may win.
    pub fn conflict(reason: impl Into<String>, appointment_ids: Vec<AppointmentId>) -> Self {
        Self::Conflict {
            reason: reason.into(),
            appointment_ids,
            retryable: true,
        }
    }

    /// Lost a race whose outcome is settled; repeating cannot succeed.
    pub fn settled(reason: impl Into<String>, appointment_ids: Vec<AppointmentId>) -> Self {
        Self::Conflict {
            reason: reason.into(),
            appointment_ids,
            retryable: false,
        }
    }

    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }

    /// Stable code of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            Self::BusinessRuleViolation { .. } => ErrorKind::BusinessRuleViolation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::StaleClosure { .. } => ErrorKind::StaleClosure,
            Self::LockTimeout { .. } => ErrorKind::LockTimeout,
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Appointment ids the failure concerns.
    #[must_use]
    pub fn offending_ids(&self) -> Vec<AppointmentId> {
        match self {
            Self::NotFound {
                entity: APPOINTMENT,
                id,
            } => id.parse().into_iter().collect(),
            Self::InvalidStateTransition { appointment_id, .. } => vec![*appointment_id],
            Self::BusinessRuleViolation {
                appointment_ids, ..
            }
            | Self::Conflict {
                appointment_ids, ..
            } => appointment_ids.clone(),
            Self::StaleClosure { changed_ids, .. } => changed_ids.clone(),
            Self::NotFound { .. } | Self::LockTimeout { .. } | Self::Storage { .. } => Vec::new(),
        }
    }

    /// Whether repeating the same request may succeed.
    ///
    /// Only contention failures qualify: a lock timeout or a lost
    /// compare-and-swap. Rule violations and settled conflicts fail the
    /// same way every time.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LockTimeout { .. } => true,
            Self::Conflict { retryable, .. } => *retryable,
            _ => false,
        }
    }
}
