use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::schema::defaults::DOCUMENT_FIELD;
use crate::submission::models::{ApplicationRecord, UploadedDocument};
use crate::submission::sanitize::extension_of;
use crate::submission::storage::save_document;

/// The uploaded file part as received.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// A submission exactly as it arrived: text parts in arrival order plus the
/// résumé part, if one was sent.
#[derive(Debug, Clone, Default)]
pub struct RawSubmission {
    pub fields: Vec<(String, String)>,
    pub document: Option<RawDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No resume file provided")]
    MissingFile,

    #[error("Invalid file type. Allowed types: {allowed}")]
    InvalidFileType { allowed: String },

    #[error("File size exceeds {} limit", describe_size(*limit_bytes))]
    FileTooLarge { limit_bytes: usize },
}

const MIB: usize = 1024 * 1024;

/// Human form of a byte limit: whole mebibytes as `10MB`, anything else in bytes.
pub fn describe_size(bytes: usize) -> String {
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to store uploaded document: {0}")]
    Storage(#[from] std::io::Error),
}

/// Runs the upload checks in order, stopping at the first failure.
/// Returns the accepted (lower-case) extension.
pub fn validate_document(raw: &RawSubmission, config: &Config) -> Result<String, ValidationError> {
    let document = raw.document.as_ref().ok_or(ValidationError::MissingFile)?;
    let file_name = document
        .file_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .ok_or(ValidationError::MissingFile)?;

    let extension = extension_of(file_name)
        .filter(|ext| config.allows_extension(ext))
        .ok_or_else(|| ValidationError::InvalidFileType {
            allowed: config.allowed_extensions.join(", "),
        })?;

    if document.bytes.len() > config.max_upload_bytes {
        return Err(ValidationError::FileTooLarge {
            limit_bytes: config.max_upload_bytes,
        });
    }

    Ok(extension)
}

/// Validates `raw`, stores its document and builds the canonical record.
///
/// Nothing touches the filesystem unless every check passes.
pub async fn normalize(
    raw: RawSubmission,
    config: &Config,
    now: NaiveDateTime,
) -> Result<(ApplicationRecord, UploadedDocument), NormalizeError> {
    let extension = validate_document(&raw, config)?;

    let mut fields = BTreeMap::new();
    for (name, value) in raw.fields {
        if name == DOCUMENT_FIELD {
            continue;
        }
        fields.entry(name).or_insert(value);
    }

    // validate_document guarantees the document and its name are present
    let Some(RawDocument {
        file_name: Some(file_name),
        bytes,
    }) = raw.document
    else {
        return Err(ValidationError::MissingFile.into());
    };

    let document = save_document(
        &config.upload_dir,
        fields.get("email").map(String::as_str),
        &file_name,
        &extension,
        &bytes,
        now,
    )
    .await?;

    debug!("Normalized submission with {} form fields", fields.len());

    let record = ApplicationRecord::new(
        fields,
        Some(document.stored_path.to_string_lossy().into_owned()),
        now,
    );
    Ok((record, document))
}
