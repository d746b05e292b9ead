//! Route definitions for leads mounted at `/leads`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::leads;
use crate::state::AppState;

/// ```text
/// POST /              -> create_lead (public)
/// GET  /              -> list_leads
/// GET  /{id}          -> get_lead
/// POST /{id}/claim    -> claim_lead
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(leads::list_leads).post(leads::create_lead))
        .route("/{id}", get(leads::get_lead))
        .route("/{id}/claim", post(leads::claim_lead))
}
