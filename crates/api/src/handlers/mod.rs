//! Request handlers.
//!
//! Handlers extract and validate input, resolve the caller through the RBAC
//! extractors, and delegate to `crate::engine` for anything transactional or
//! straight to a repository for plain reads.

pub mod invoices;
pub mod leads;
pub mod sessions;
pub mod students;
pub mod tutors;
