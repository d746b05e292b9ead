//! Route definitions for sessions mounted at `/sessions`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::sessions;
use crate::state::AppState;

/// ```text
/// GET  /                   -> list_my_sessions
/// POST /                   -> create_session
/// GET  /series/{key}       -> list_series
/// GET  /{id}               -> get_session
/// POST /{id}/confirm       -> confirm_session
/// POST /{id}/reschedule    -> reschedule_session
/// POST /{id}/complete      -> complete_session
/// POST /{id}/cancel        -> cancel_session
/// POST /{id}/no-show       -> mark_no_show
/// POST /{id}/recurrence    -> expand_recurring
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(sessions::list_my_sessions).post(sessions::create_session),
        )
        .route("/series/{key}", get(sessions::list_series))
        .route("/{id}", get(sessions::get_session))
        .route("/{id}/confirm", post(sessions::confirm_session))
        .route("/{id}/reschedule", post(sessions::reschedule_session))
        .route("/{id}/complete", post(sessions::complete_session))
        .route("/{id}/cancel", post(sessions::cancel_session))
        .route("/{id}/no-show", post(sessions::mark_no_show))
        .route("/{id}/recurrence", post(sessions::expand_recurring))
}
