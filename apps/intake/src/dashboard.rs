//! Client for the recruitment dashboard, the sibling service that owns form
//! configuration and application ingestion.
//!
//! Everything that talks to the dashboard goes through the [`Dashboard`]
//! trait so the fallback logic can be exercised without a live sibling.
//! Calls are made exactly once; callers decide what to do on failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::schema::defaults::DOCUMENT_FIELD;
use crate::schema::models::Schema;
use crate::submission::models::{ApplicationId, ApplicationRecord, UploadedDocument};

const HEALTH_PATH: &str = "/api/health";
const FORM_CONFIG_PATH: &str = "/api/public/form-config";
const SUBMIT_PATH: &str = "/api/submit_application";

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("dashboard request timed out")]
    Timeout,

    #[error("dashboard unreachable: {0}")]
    Http(reqwest::Error),

    #[error("dashboard returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("dashboard response was malformed: {0}")]
    Malformed(String),

    #[error("could not read stored document: {0}")]
    Document(#[from] std::io::Error),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Timeout
        } else if e.is_decode() {
            RemoteError::Malformed(e.to_string())
        } else {
            RemoteError::Http(e)
        }
    }
}

/// Acknowledgement returned by the dashboard for a forwarded application.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteReceipt {
    pub application_id: Option<ApplicationId>,
}

#[async_trait]
pub trait Dashboard: Send + Sync {
    /// Liveness check. `Ok` only for a 2xx answer within the health timeout.
    async fn health(&self) -> Result<(), RemoteError>;

    async fn fetch_form_config(&self) -> Result<Schema, RemoteError>;

    /// Forwards the record's form fields and the stored document bytes.
    async fn submit_application(
        &self,
        record: &ApplicationRecord,
        document: &UploadedDocument,
    ) -> Result<RemoteReceipt, RemoteError>;
}

/// reqwest-backed [`Dashboard`] talking to the sibling over loopback HTTP.
#[derive(Clone)]
pub struct HttpDashboard {
    client: Client,
    base_url: String,
    health_timeout: Duration,
    request_timeout: Duration,
}

impl HttpDashboard {
    pub fn new(
        base_url: impl Into<String>,
        health_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            health_timeout,
            request_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Dashboard for HttpDashboard {
    async fn health(&self) -> Result<(), RemoteError> {
        let response = self
            .client
            .get(self.url(HEALTH_PATH))
            .timeout(self.health_timeout)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn fetch_form_config(&self) -> Result<Schema, RemoteError> {
        let response = self
            .client
            .get(self.url(FORM_CONFIG_PATH))
            .timeout(self.request_timeout)
            .send()
            .await?;
        let schema: Schema = ensure_success(response).await?.json().await?;
        debug!(
            "Fetched form config from dashboard ({} subsections)",
            schema.subsection_names().count()
        );
        Ok(schema)
    }

    async fn submit_application(
        &self,
        record: &ApplicationRecord,
        document: &UploadedDocument,
    ) -> Result<RemoteReceipt, RemoteError> {
        let bytes = tokio::fs::read(&document.stored_path).await?;
        let part = Part::bytes(bytes)
            .file_name(document.stored_file_name())
            .mime_str(document.content_type())?;

        let form = record
            .fields()
            .iter()
            .fold(Form::new(), |form, (name, value)| {
                form.text(name.clone(), value.clone())
            })
            .part(DOCUMENT_FIELD, part);

        let response = self
            .client
            .post(self.url(SUBMIT_PATH))
            .timeout(self.request_timeout)
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        // The body is informational; a 2xx without JSON still counts.
        let application_id = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("application_id").cloned())
            .and_then(|id| serde_json::from_value::<ApplicationId>(id).ok());

        Ok(RemoteReceipt { application_id })
    }
}

async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect());
    Err(RemoteError::Status {
        status: status.as_u16(),
        message,
    })
}
