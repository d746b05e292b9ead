//! Shared response envelope types for API handlers.
//!
//! Responses use a `{ "data": ... }` envelope. The claim endpoint is the one
//! exception and answers `{ "ok": true, "studentId": ... }`.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: session }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
