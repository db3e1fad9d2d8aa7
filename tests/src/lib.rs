//! # Clinic-Queue Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── scenarios.rs    # End-to-end walkthroughs of a clinic day
//!     ├── properties.rs   # Queue invariants, atomicity and reopen rules
//!     └── concurrency.rs  # Races between staff and the scheduler
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cq-tests
//! cargo test -p cq-tests integration::concurrency::
//! ```

#![allow(dead_code)]

pub mod integration;
