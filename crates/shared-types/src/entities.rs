//! # Core Entities
//!
//! Identifiers, the clinic-day key and the queue status vocabulary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::ParseError;

// =============================================================================
// UUID-BACKED IDENTIFIERS
// =============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|e| ParseError::InvalidId {
                    value: s.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    };
}

uuid_id!(
    /// Identifier of a queue entry (one appointment or walk-in visit).
    AppointmentId
);

uuid_id!(
    /// Identifier of an end-of-day closure record.
    ClosureId
);

uuid_id!(
    /// Identifier of an override audit row.
    AuditId
);

// =============================================================================
// EXTERNAL REFERENCES
// =============================================================================

macro_rules! string_ref {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from any string-like value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Create, rejecting empty values.
            pub fn parse(value: impl Into<String>) -> Result<Self, ParseError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(ParseError::Empty { kind: $kind });
                }
                Ok(Self(value))
            }

            /// Get the reference as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_ref!(
    /// Clinic location identifier (tenant isolation happens upstream).
    ClinicId,
    "clinic"
);

string_ref!(
    /// Staff member (practitioner or front-desk operator) identifier.
    StaffId,
    "staff"
);

string_ref!(
    /// Opaque reference to the patient record held by another system.
    PatientRef,
    "patient"
);

impl StaffId {
    /// Actor recorded for transitions made by the system itself.
    pub const SYSTEM: &'static str = "system";

    /// The system actor (grace-period expiry, automated sweeps).
    pub fn system() -> Self {
        Self::new(Self::SYSTEM)
    }

    /// Whether this is the system actor.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.0 == Self::SYSTEM
    }
}

// =============================================================================
// CLINIC-DAY
// =============================================================================

/// Scope of every queue mutation: one clinic on one service day.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DayKey {
    pub clinic_id: ClinicId,
    pub date: NaiveDate,
}

impl DayKey {
    pub fn new(clinic_id: ClinicId, date: NaiveDate) -> Self {
        Self { clinic_id, date }
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.clinic_id, self.date)
    }
}

// =============================================================================
// QUEUE STATUS
// =============================================================================

/// Lifecycle status of a queue entry.
///
/// ```text
/// [SCHEDULED] ──check-in──→ [WAITING] ──call──→ [IN_PROGRESS] ──complete──→ [COMPLETED]
///                              │  ↑                     (closure) ──────────────↗
///                   mark-absent│  │late arrival
///                              ↓  │
///                           [ABSENT] ──grace expiry / closure──→ [NO_SHOW]
///                   [WAITING] ──closure──→ [NO_SHOW]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Scheduled,
    Waiting,
    InProgress,
    Absent,
    Completed,
    NoShow,
    Cancelled,
}

impl QueueStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [QueueStatus; 7] = [
        Self::Scheduled,
        Self::Waiting,
        Self::InProgress,
        Self::Absent,
        Self::Completed,
        Self::NoShow,
        Self::Cancelled,
    ];

    /// Terminal statuses accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::NoShow | Self::Cancelled)
    }

    /// Stable wire code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Waiting => "WAITING",
            Self::InProgress => "IN_PROGRESS",
            Self::Absent => "ABSENT",
            Self::Completed => "COMPLETED",
            Self::NoShow => "NO_SHOW",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for QueueStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::UnknownStatus(s.to_string()))
    }
}
