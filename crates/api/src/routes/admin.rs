//! Admin routes mounted at `/admin`. Every handler requires the admin role.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{leads, sessions, tutors};
use crate::state::AppState;

/// ```text
/// POST /leads/{id}/assign       -> assign_lead
/// PUT  /leads/{id}/status       -> update_lead_status
/// POST /sessions/{id}/settle    -> settle_session
/// GET  /tutors                  -> list_tutors
/// POST /tutors                  -> create_tutor
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/leads/{id}/assign", post(leads::assign_lead))
        .route("/leads/{id}/status", put(leads::update_lead_status))
        .route("/sessions/{id}/settle", post(sessions::settle_session))
        .route(
            "/tutors",
            get(tutors::list_tutors).post(tutors::create_tutor),
        )
}
