//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::dashboard::{Dashboard, RemoteError, RemoteReceipt};
use crate::schema::models::Schema;
use crate::submission::models::{ApplicationId, ApplicationRecord, UploadedDocument};

/// Single-connection in-memory store; every connection to `:memory:` would
/// otherwise see its own empty database.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database")
}

/// Creates `form_config` with three fields over two subsections.
pub async fn seed_form(pool: &SqlitePool) {
    sqlx::query(
        r#"
        CREATE TABLE form_config (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            label TEXT,
            type TEXT,
            subsection TEXT,
            field_order INTEGER,
            required INTEGER DEFAULT 0,
            options TEXT,
            validations TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .expect("Failed to create form_config");

    for (name, ty, subsection, order, required) in [
        ("github", "text", "Links", 1, 0),
        ("full_name", "text", "About You", 2, 1),
        ("cv-resume", "file", "Links", 3, 1),
    ] {
        sqlx::query(
            "INSERT INTO form_config (name, label, type, subsection, field_order, required) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(name.to_uppercase())
        .bind(ty)
        .bind(subsection)
        .bind(order)
        .bind(required)
        .execute(pool)
        .await
        .expect("Failed to seed form_config");
    }
}

pub enum SubmitBehavior {
    Accept(Option<ApplicationId>),
    Reject(u16),
}

/// Scripted stand-in for the dashboard that counts the calls it receives.
pub struct FakeDashboard {
    healthy: bool,
    schema: Option<Schema>,
    submit: SubmitBehavior,
    pub config_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
}

impl FakeDashboard {
    /// Passes the health check; config fetches fail and submissions are accepted
    /// unless configured otherwise.
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            schema: None,
            submit: SubmitBehavior::Accept(None),
            config_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
        }
    }

    /// Fails the health check.
    pub fn down() -> Self {
        Self {
            healthy: false,
            ..Self::healthy()
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_submit(mut self, submit: SubmitBehavior) -> Self {
        self.submit = submit;
        self
    }

    pub fn submit_count(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dashboard for FakeDashboard {
    async fn health(&self) -> Result<(), RemoteError> {
        if self.healthy {
            Ok(())
        } else {
            Err(RemoteError::Timeout)
        }
    }

    async fn fetch_form_config(&self) -> Result<Schema, RemoteError> {
        self.config_calls.fetch_add(1, Ordering::SeqCst);
        self.schema.clone().ok_or(RemoteError::Status {
            status: 500,
            message: "form config unavailable".to_string(),
        })
    }

    async fn submit_application(
        &self,
        _record: &ApplicationRecord,
        _document: &UploadedDocument,
    ) -> Result<RemoteReceipt, RemoteError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        match &self.submit {
            SubmitBehavior::Accept(application_id) => Ok(RemoteReceipt {
                application_id: application_id.clone(),
            }),
            SubmitBehavior::Reject(status) => Err(RemoteError::Status {
                status: *status,
                message: "rejected".to_string(),
            }),
        }
    }
}
