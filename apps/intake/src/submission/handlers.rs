use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Local;
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::schema::defaults::DOCUMENT_FIELD;
use crate::state::AppState;
use crate::submission::models::{ApplicationId, SubmissionRoute};
use crate::submission::normalizer::{describe_size, normalize, RawDocument, RawSubmission};
use crate::submission::router::submit;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub application_id: Option<ApplicationId>,
    pub route: SubmissionRoute,
}

/// POST /api/submit_application
///
/// Multipart form: the résumé in `cv-resume`, every other part is a text field.
pub async fn handle_submit_application(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let multipart = multipart.map_err(|rejection| {
        AppError::BadRequest(format!("Malformed form submission: {}", rejection.body_text()))
    })?;
    let submission_id = Uuid::new_v4();
    async move {
        let raw = read_submission(multipart, state.config.max_upload_bytes).await?;
        let (record, document) = normalize(raw, &state.config, Local::now().naive_local()).await?;
        info!(
            "Received '{}' ({} bytes, .{})",
            document.original_name, document.size_bytes, document.extension
        );

        let outcome = submit(
            state.dashboard.as_ref(),
            &state.db,
            state.config.persist_mode,
            &record,
            &document,
        )
        .await?;

        info!("Application accepted via {:?}", outcome.route);
        Ok::<_, AppError>(Json(SubmitResponse {
            success: true,
            message: "Application submitted successfully!".to_string(),
            application_id: outcome.application_id,
            route: outcome.route,
        }))
    }
    .instrument(info_span!("submission", %submission_id))
    .await
}

async fn read_submission(mut multipart: Multipart, max_bytes: usize) -> Result<RawSubmission, AppError> {
    let mut raw = RawSubmission::default();
    let reject = |e: MultipartError| multipart_error(e, max_bytes);

    while let Some(field) = multipart.next_field().await.map_err(reject)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == DOCUMENT_FIELD && raw.document.is_none() {
            let file_name = field.file_name().map(String::from);
            let bytes = field.bytes().await.map_err(reject)?;
            raw.document = Some(RawDocument { file_name, bytes });
        } else if field.file_name().is_some() {
            // Extra file parts carry nothing the record can hold.
            warn!("Ignoring unexpected file part '{name}'");
            field.bytes().await.map_err(reject)?;
        } else {
            let value = field.text().await.map_err(reject)?;
            raw.fields.push((name, value));
        }
    }

    Ok(raw)
}

fn multipart_error(e: MultipartError, max_bytes: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!(
            "File too large. Maximum size is {}.",
            describe_size(max_bytes)
        ))
    } else {
        AppError::BadRequest(format!("Malformed form submission: {}", e.body_text()))
    }
}
