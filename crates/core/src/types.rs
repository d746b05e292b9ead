/// Primary keys for tutors, sessions and invoices are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Family records (leads, clients, students) share UUID keys so a client and
/// student can be addressed by the id of the lead they came from.
pub type FamilyId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Monetary amounts are integer cents.
pub type Cents = i64;
