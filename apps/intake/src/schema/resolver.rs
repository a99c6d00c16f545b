use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::dashboard::{Dashboard, RemoteError};
use crate::schema::defaults::default_schema;
use crate::schema::models::Schema;
use crate::schema::store::load_schema_from_store;

/// Which tier of the fallback chain produced a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaSource {
    Remote,
    Store,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchema {
    pub schema: Schema,
    pub source: SchemaSource,
}

/// Resolves the form: dashboard, then the local store, then the built-in form.
///
/// Never fails. Every call re-resolves; nothing is cached.
pub async fn resolve_schema(dashboard: &dyn Dashboard, pool: &SqlitePool) -> ResolvedSchema {
    match fetch_remote(dashboard).await {
        Ok(schema) => {
            info!("Form config resolved from dashboard");
            return ResolvedSchema {
                schema,
                source: SchemaSource::Remote,
            };
        }
        Err(e) => warn!("Dashboard form config unavailable, falling back to store: {e}"),
    }
    resolve_local_schema(pool).await
}

/// The store and built-in tiers only.
pub async fn resolve_local_schema(pool: &SqlitePool) -> ResolvedSchema {
    match load_schema_from_store(pool).await {
        Ok(Some(schema)) => {
            info!("Form config resolved from store");
            ResolvedSchema {
                schema,
                source: SchemaSource::Store,
            }
        }
        Ok(None) => {
            info!("No form configured in store, using built-in form");
            built_in()
        }
        Err(e) => {
            warn!("Store form config unavailable, using built-in form: {e}");
            built_in()
        }
    }
}

async fn fetch_remote(dashboard: &dyn Dashboard) -> Result<Schema, RemoteError> {
    dashboard.health().await?;
    let schema = dashboard.fetch_form_config().await?;
    if schema.is_empty() {
        return Err(RemoteError::Malformed("empty form config".to_string()));
    }
    Ok(schema)
}

fn built_in() -> ResolvedSchema {
    ResolvedSchema {
        schema: default_schema(),
        source: SchemaSource::Default,
    }
}
