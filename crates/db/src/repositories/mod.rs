//! Repository layer: one zero-sized struct per table.
//!
//! Single-statement operations are generic over [`sqlx::PgExecutor`] so the
//! engine can run them on the pool or inside an open transaction
//! (`&mut *tx`).

pub mod client_repo;
pub mod invoice_repo;
pub mod lead_repo;
pub mod session_repo;
pub mod student_repo;
pub mod tutor_repo;

pub use client_repo::ClientRepo;
pub use invoice_repo::InvoiceRepo;
pub use lead_repo::LeadRepo;
pub use session_repo::SessionRepo;
pub use student_repo::StudentRepo;
pub use tutor_repo::TutorRepo;
