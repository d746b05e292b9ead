//! Transactional orchestration.
//!
//! Every mutation runs inside a database transaction: it locks the rows it is
//! about to change (`SELECT ... FOR UPDATE`), checks the pure rules from
//! `studyroom_core` against the locked state, then writes through
//! compare-and-swap updates. A failure drops the transaction. The one
//! exception is forwarding to the invoice sink, which happens after the draft
//! has been committed.

pub mod billing;
pub mod claim;
pub mod sessions;
