//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` request DTOs for the endpoints that write it
//!
//! Status-like columns decode through the `TryFrom<String>` impls in
//! `studyroom_core`, so legacy spellings are normalized as rows are read.

pub mod client;
pub mod invoice;
pub mod lead;
pub mod session;
pub mod student;
pub mod tutor;
