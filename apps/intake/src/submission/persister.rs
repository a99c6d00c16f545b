//! Local fallback: writes applications straight into the shared store.

use std::collections::HashSet;

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::PersistMode;
use crate::schema::models::FieldType;
use crate::schema::resolver::resolve_local_schema;
use crate::submission::models::ApplicationRecord;

/// Form fields the baseline table has columns for, in column order.
pub const BASELINE_FIELDS: [&str; 6] = ["name", "email", "phone", "position", "location", "qualification"];

/// Column holding the stored document path in schema-driven mode.
const SCHEMA_RESUME_COLUMN: &str = "resume_path";

const CREATE_APPLICATIONS: &str = r#"
    CREATE TABLE IF NOT EXISTS applications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT,
        email TEXT,
        phone TEXT,
        position TEXT,
        location TEXT,
        qualification TEXT,
        cv_resume_path TEXT,
        submission_date TEXT,
        status TEXT DEFAULT 'Pending'
    )
"#;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("could not prepare applications table: {0}")]
    Table(#[source] sqlx::Error),

    #[error("could not insert application: {0}")]
    Insert(#[source] sqlx::Error),
}

/// Creates `applications` with the baseline columns if it does not exist.
pub async fn ensure_applications_table(pool: &SqlitePool) -> Result<(), PersistenceError> {
    sqlx::query(CREATE_APPLICATIONS)
        .execute(pool)
        .await
        .map_err(PersistenceError::Table)?;
    Ok(())
}

/// Inserts `record` as one autocommitted row and returns the new row id.
pub async fn persist(
    pool: &SqlitePool,
    mode: PersistMode,
    record: &ApplicationRecord,
) -> Result<i64, PersistenceError> {
    ensure_applications_table(pool).await?;

    let row_id = match mode {
        PersistMode::Baseline => insert_baseline(pool, record).await?,
        PersistMode::SchemaDriven => insert_schema_driven(pool, record).await?,
    };

    info!("Application {row_id} saved to local store ({mode:?} mode)");
    Ok(row_id)
}

async fn insert_baseline(pool: &SqlitePool, record: &ApplicationRecord) -> Result<i64, PersistenceError> {
    let dropped: Vec<&str> = record
        .fields()
        .keys()
        .map(String::as_str)
        .filter(|k| !BASELINE_FIELDS.contains(k))
        .collect();
    if !dropped.is_empty() {
        warn!("Fields without a baseline column were not saved: {}", dropped.join(", "));
    }

    let mut query = sqlx::query(
        r#"
        INSERT INTO applications
            (name, email, phone, position, location, qualification,
             cv_resume_path, submission_date, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    );
    for field in BASELINE_FIELDS {
        query = query.bind(record.field(field));
    }
    let result = query
        .bind(record.cv_resume_path())
        .bind(record.submission_date_iso())
        .bind(record.status().as_str())
        .execute(pool)
        .await
        .map_err(PersistenceError::Insert)?;

    Ok(result.last_insert_rowid())
}

async fn insert_schema_driven(
    pool: &SqlitePool,
    record: &ApplicationRecord,
) -> Result<i64, PersistenceError> {
    let resolved = resolve_local_schema(pool).await;

    let mut columns = vec!["submission_date".to_string(), "status".to_string()];
    let mut values: Vec<Option<String>> = vec![
        Some(record.submission_date_iso()),
        Some(record.status().as_str().to_string()),
    ];

    for field in resolved.schema.fields() {
        if field.field_type == FieldType::File || columns.contains(&field.name) {
            continue;
        }
        let Some(value) = record.field(&field.name) else {
            continue;
        };
        if !is_identifier(&field.name) {
            warn!("Skipping field '{}': not usable as a column name", field.name);
            continue;
        }
        columns.push(field.name.clone());
        values.push(Some(value.to_string()));
    }

    if let Some(path) = record.cv_resume_path() {
        columns.push(SCHEMA_RESUME_COLUMN.to_string());
        values.push(Some(path.to_string()));
    }

    add_missing_columns(pool, &columns).await?;

    let column_list = columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!("INSERT INTO applications ({column_list}) VALUES ({placeholders})");

    let mut query = sqlx::query(&sql);
    for value in &values {
        query = query.bind(value.as_deref());
    }
    let result = query.execute(pool).await.map_err(PersistenceError::Insert)?;

    Ok(result.last_insert_rowid())
}

/// Adds any of `columns` the table lacks as nullable TEXT columns.
async fn add_missing_columns(pool: &SqlitePool, columns: &[String]) -> Result<(), PersistenceError> {
    let existing = existing_columns(pool).await?;

    for column in columns.iter().filter(|c| !existing.contains(c.as_str())) {
        let ddl = format!("ALTER TABLE applications ADD COLUMN \"{column}\" TEXT");
        if let Err(e) = sqlx::query(&ddl).execute(pool).await {
            // A concurrent submission may have added it first.
            if !existing_columns(pool).await?.contains(column.as_str()) {
                return Err(PersistenceError::Table(e));
            }
        } else {
            info!("Added column '{column}' to applications");
        }
    }
    Ok(())
}

async fn existing_columns(pool: &SqlitePool) -> Result<HashSet<String>, PersistenceError> {
    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info('applications')")
        .fetch_all(pool)
        .await
        .map_err(PersistenceError::Table)?;
    Ok(names.into_iter().collect())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
