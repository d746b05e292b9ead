//! Authentication primitives.
//!
//! - [`jwt`] -- access-token validation (and generation for tooling/tests).

pub mod jwt;
