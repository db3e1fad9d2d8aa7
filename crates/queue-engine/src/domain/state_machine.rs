//! Legal status transitions.
//!
//! ```text
//! SCHEDULED   → WAITING       check-in
//! WAITING     → IN_PROGRESS   call
//! WAITING     → ABSENT        mark absent
//! ABSENT      → WAITING       late arrival within grace
//! ABSENT      → NO_SHOW       grace expiry or day closure
//! WAITING     → NO_SHOW       day closure
//! IN_PROGRESS → COMPLETED     completion or day closure
//! ```
//!
//! Reopening a closure reverses `NO_SHOW → WAITING`. That is a
//! compensation of a committed closure, not a forward transition, and is
//! checked separately by [`ensure_reversal`].

use super::errors::{QueueError, QueueResult};
use shared_types::{AppointmentId, QueueStatus};

/// Why a status change is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    CheckIn,
    Call,
    MarkAbsent,
    LateArrival,
    GraceExpiry,
    DayClosure,
    Complete,
}

const LEGAL: [(QueueStatus, QueueStatus); 7] = [
    (QueueStatus::Scheduled, QueueStatus::Waiting),
    (QueueStatus::Waiting, QueueStatus::InProgress),
    (QueueStatus::Waiting, QueueStatus::Absent),
    (QueueStatus::Absent, QueueStatus::Waiting),
    (QueueStatus::Absent, QueueStatus::NoShow),
    (QueueStatus::Waiting, QueueStatus::NoShow),
    (QueueStatus::InProgress, QueueStatus::Completed),
];

/// Whether `from → to` is a legal forward transition.
#[must_use]
pub fn is_legal(from: QueueStatus, to: QueueStatus) -> bool {
    LEGAL.contains(&(from, to))
}

/// Statuses reachable from `from` in one step.
#[must_use]
pub fn legal_targets(from: QueueStatus) -> Vec<QueueStatus> {
    LEGAL
        .iter()
        .filter(|(source, _)| *source == from)
        .map(|(_, target)| *target)
        .collect()
}

/// Check a forward transition for an appointment.
pub fn ensure_transition(
    appointment_id: AppointmentId,
    from: QueueStatus,
    to: QueueStatus,
) -> QueueResult<()> {
    if is_legal(from, to) {
        Ok(())
    } else {
        Err(QueueError::InvalidStateTransition {
            appointment_id,
            from,
            to,
        })
    }
}

/// Resolve the target status a trigger produces from `from`.
pub fn target_for(
    appointment_id: AppointmentId,
    from: QueueStatus,
    trigger: Trigger,
) -> QueueResult<QueueStatus> {
    let to = match (trigger, from) {
        (Trigger::CheckIn, _) => QueueStatus::Waiting,
        (Trigger::Call, _) => QueueStatus::InProgress,
        (Trigger::MarkAbsent, _) => QueueStatus::Absent,
        (Trigger::LateArrival, _) => QueueStatus::Waiting,
        (Trigger::GraceExpiry, _) => QueueStatus::NoShow,
        (Trigger::DayClosure, QueueStatus::InProgress) => QueueStatus::Completed,
        (Trigger::DayClosure, _) => QueueStatus::NoShow,
        (Trigger::Complete, _) => QueueStatus::Completed,
    };
    if trigger == Trigger::CheckIn && from != QueueStatus::Scheduled
        || trigger == Trigger::LateArrival && from != QueueStatus::Absent
        || trigger == Trigger::GraceExpiry && from != QueueStatus::Absent
    {
        return Err(QueueError::InvalidStateTransition {
            appointment_id,
            from,
            to,
        });
    }
    ensure_transition(appointment_id, from, to)?;
    Ok(to)
}

/// Check the closure-reopen compensation `NO_SHOW → WAITING`.
pub fn ensure_reversal(appointment_id: AppointmentId, from: QueueStatus) -> QueueResult<()> {
    if from == QueueStatus::NoShow {
        Ok(())
    } else {
        Err(QueueError::InvalidStateTransition {
            appointment_id,
            from,
            to: QueueStatus::Waiting,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_seven_legal_transitions() {
        let mut count = 0;
        for from in QueueStatus::ALL {
            for to in QueueStatus::ALL {
                if is_legal(from, to) {
                    count += 1;
                }
            }
        }
        assert_eq!(count, 7);
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for status in QueueStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            assert!(legal_targets(status).is_empty(), "{status} has exits");
        }
    }

    #[test]
    fn test_illegal_transition_names_both_states() {
        let id = AppointmentId::new();
        let err = ensure_transition(id, QueueStatus::Completed, QueueStatus::Waiting).unwrap_err();
        assert_eq!(
            err,
            QueueError::InvalidStateTransition {
                appointment_id: id,
                from: QueueStatus::Completed,
                to: QueueStatus::Waiting,
            }
        );
    }

    #[test]
    fn test_day_closure_targets() {
        let id = AppointmentId::new();
        assert_eq!(
            target_for(id, QueueStatus::InProgress, Trigger::DayClosure).unwrap(),
            QueueStatus::Completed
        );
        assert_eq!(
            target_for(id, QueueStatus::Waiting, Trigger::DayClosure).unwrap(),
            QueueStatus::NoShow
        );
        assert_eq!(
            target_for(id, QueueStatus::Absent, Trigger::DayClosure).unwrap(),
            QueueStatus::NoShow
        );
        assert!(target_for(id, QueueStatus::Scheduled, Trigger::DayClosure).is_err());
    }

    #[test]
    fn test_late_arrival_only_from_absent() {
        let id = AppointmentId::new();
        assert_eq!(
            target_for(id, QueueStatus::Absent, Trigger::LateArrival).unwrap(),
            QueueStatus::Waiting
        );
        assert!(target_for(id, QueueStatus::Scheduled, Trigger::LateArrival).is_err());
        assert!(target_for(id, QueueStatus::Waiting, Trigger::GraceExpiry).is_err());
    }

    #[test]
    fn test_reversal_only_from_no_show() {
        let id = AppointmentId::new();
        assert!(ensure_reversal(id, QueueStatus::NoShow).is_ok());
        assert!(ensure_reversal(id, QueueStatus::Completed).is_err());
    }
}
