use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::dashboard::Dashboard;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Sibling dashboard. `HttpDashboard` in production.
    pub dashboard: Arc<dyn Dashboard>,
    pub config: Arc<Config>,
}
