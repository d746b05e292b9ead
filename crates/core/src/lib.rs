//! Domain rules for the StudyRoom lead, session and billing lifecycle.
//!
//! Everything here is pure: no database, no clock, no I/O. The `db` and `api`
//! crates read state, call into these functions, and persist the result.

pub mod billing;
pub mod cancellation;
pub mod error;
pub mod lead;
pub mod pricing;
pub mod recurrence;
pub mod roles;
pub mod session;
pub mod types;
