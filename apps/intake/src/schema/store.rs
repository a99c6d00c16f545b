use std::collections::HashMap;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, warn};

use crate::schema::models::{FieldDefinition, FieldType, Schema};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("form schema query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Returns whether `table` exists in the store.
pub async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool, sqlx::Error> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_optional(pool)
            .await?;
    Ok(found.is_some())
}

/// Loads the configured form from `form_config` / `form_sections`.
///
/// `Ok(None)` means no form has been configured yet: the field table is
/// missing or has no rows. `form_sections` is optional.
pub async fn load_schema_from_store(pool: &SqlitePool) -> Result<Option<Schema>, StoreError> {
    if !table_exists(pool, "form_config").await? {
        debug!("form_config table absent");
        return Ok(None);
    }

    let rows = sqlx::query("SELECT * FROM form_config ORDER BY field_order ASC, rowid ASC")
        .fetch_all(pool)
        .await?;
    if rows.is_empty() {
        debug!("form_config table is empty");
        return Ok(None);
    }
    let fields: Vec<FieldDefinition> = rows.iter().map(field_from_row).collect();

    let section_order = load_section_order(pool).await;
    debug!(
        "Loaded {} form fields and {} section ranks from store",
        fields.len(),
        section_order.len()
    );

    Ok(Some(Schema::from_fields(fields, &section_order)))
}

// Section ranks only refine ordering; an unreadable `form_sections` falls
// back to field-order ranking instead of discarding the form.
async fn load_section_order(pool: &SqlitePool) -> HashMap<String, i64> {
    match fetch_section_ranks(pool).await {
        Ok(rows) => rows
            .into_iter()
            .filter_map(|(name, rank)| rank.map(|r| (name, r)))
            .collect(),
        Err(e) => {
            warn!("form_sections unreadable, ordering sections by field order: {e}");
            HashMap::new()
        }
    }
}

async fn fetch_section_ranks(pool: &SqlitePool) -> Result<Vec<(String, Option<i64>)>, sqlx::Error> {
    if !table_exists(pool, "form_sections").await? {
        return Ok(Vec::new());
    }
    sqlx::query_as("SELECT name, section_order FROM form_sections ORDER BY section_order ASC")
        .fetch_all(pool)
        .await
}

// Columns beyond `name` are read leniently: older stores lack `label` and
// may declare `required` as BOOLEAN or INTEGER.
fn field_from_row(row: &SqliteRow) -> FieldDefinition {
    let text = |col: &str| -> Option<String> { row.try_get::<Option<String>, _>(col).ok().flatten() };

    FieldDefinition {
        name: text("name").unwrap_or_default(),
        label: text("label").filter(|l| !l.is_empty()),
        field_type: FieldType::from(text("type").unwrap_or_default()),
        subsection: text("subsection").unwrap_or_default(),
        order: row
            .try_get::<Option<i64>, _>("field_order")
            .ok()
            .flatten()
            .unwrap_or(0),
        required: row
            .try_get::<Option<bool>, _>("required")
            .ok()
            .flatten()
            .or_else(|| {
                row.try_get::<Option<i64>, _>("required")
                    .ok()
                    .flatten()
                    .map(|v| v != 0)
            })
            .unwrap_or(false),
        options: text("options").unwrap_or_default(),
        validations: text("validations").unwrap_or_default(),
    }
}
