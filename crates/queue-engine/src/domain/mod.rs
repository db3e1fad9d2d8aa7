//! # Domain Layer - Clinic Queue
//!
//! Pure business logic with no I/O.
//!
//! ## Components
//!
//! - `entities`: QueueEntry, AbsenceRecord, OverrideAudit, QueueDayClosure
//! - `state_machine`: legal status transitions
//! - `positions`: monotonic tail assignment
//! - `day_state`: the per clinic-day aggregate mutated by transactions
//! - `value_objects`: query views, outcomes, counts and wait statistics
//! - `errors`: QueueError and stable error codes

pub mod day_state;
pub mod entities;
pub mod errors;
pub mod positions;
pub mod state_machine;
pub mod value_objects;

pub use day_state::*;
pub use entities::*;
pub use errors::*;
pub use positions::*;
pub use state_machine::Trigger;
pub use value_objects::*;
