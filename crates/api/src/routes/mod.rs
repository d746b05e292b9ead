pub mod admin;
pub mod health;
pub mod invoices;
pub mod leads;
pub mod sessions;
pub mod students;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /leads                                           create (public), list
/// /leads/{id}                                      get
/// /leads/{id}/claim                                claim (POST)
///
/// /admin/leads/{id}/assign                         assign to a tutor (POST)
/// /admin/leads/{id}/status                         update status (PUT)
/// /admin/sessions/{id}/settle                      credit or forfeit (POST)
/// /admin/tutors                                    list, register
///
/// /students                                        list own
/// /students/{id}                                   get
/// /students/{id}/confirm                           accept assignment (POST)
///
/// /sessions                                        list own, create
/// /sessions/series/{key}                           list series
/// /sessions/{id}                                   get
/// /sessions/{id}/confirm                           (POST)
/// /sessions/{id}/reschedule                        (POST)
/// /sessions/{id}/complete                          (POST)
/// /sessions/{id}/cancel                            (POST)
/// /sessions/{id}/no-show                           (POST)
/// /sessions/{id}/recurrence                        expand weekly (POST)
///
/// /invoices                                        create
/// /invoices/{id}                                   get
/// /invoices/{id}/send                              forward draft (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Lead intake and the tutor claim pool.
        .nest("/leads", leads::router())
        // Admin-only operations.
        .nest("/admin", admin::router())
        // Materialized students.
        .nest("/students", students::router())
        // Session lifecycle.
        .nest("/sessions", sessions::router())
        // Draft invoices and forwarding.
        .nest("/invoices", invoices::router())
}
