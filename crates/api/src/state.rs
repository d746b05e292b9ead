use std::sync::Arc;

use crate::config::ServerConfig;
use crate::sink::InvoiceSink;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the pool is reference counted and everything else is
/// behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: studyroom_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// External invoicing endpoint for AUTHORISED invoices.
    pub sink: Arc<InvoiceSink>,
}
