//! # Shared Types Crate
//!
//! Identifier newtypes and the small vocabulary every crate in the workspace
//! agrees on.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-crate types are defined here only.
//! - **Typed identifiers**: an `AppointmentId` can never be passed where a
//!   `ClosureId` is expected.
//! - **Clinic-day scoping**: every queue mutation is scoped to a [`DayKey`].

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
