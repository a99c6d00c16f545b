use axum::extract::State;
use axum::Json;
use tracing::debug;

use crate::schema::models::Schema;
use crate::schema::resolver::resolve_schema;
use crate::state::AppState;

/// GET /api/public/form-config
///
/// Always answers: the built-in form is the last resort.
pub async fn handle_form_config(State(state): State<AppState>) -> Json<Schema> {
    let resolved = resolve_schema(state.dashboard.as_ref(), &state.db).await;
    debug!("Serving form config from {:?} tier", resolved.source);
    Json(resolved.schema)
}
