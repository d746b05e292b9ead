//! Route definitions for students mounted at `/students`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::students;
use crate::state::AppState;

/// ```text
/// GET  /               -> list_my_students
/// GET  /{id}           -> get_student
/// POST /{id}/confirm   -> confirm_student
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(students::list_my_students))
        .route("/{id}", get(students::get_student))
        .route("/{id}/confirm", post(students::confirm_student))
}
