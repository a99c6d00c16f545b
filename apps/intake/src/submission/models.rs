use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// ISO-8601 local timestamp with microseconds, as stored in `submission_date`.
pub const SUBMISSION_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Review status written with a new application. Later statuses belong to
/// the dashboard, which owns the review workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[default]
    Pending,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
        }
    }
}

/// The résumé as written to the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub original_name: String,
    pub stored_path: PathBuf,
    pub size_bytes: u64,
    /// Lower-case, without the dot.
    pub extension: String,
}

impl UploadedDocument {
    pub fn stored_file_name(&self) -> String {
        self.stored_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.original_name.clone())
    }

    pub fn content_type(&self) -> &'static str {
        match self.extension.as_str() {
            "pdf" => "application/pdf",
            "doc" => "application/msword",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            _ => "application/octet-stream",
        }
    }
}

/// Canonical, validated form of one submission.
///
/// Form fields are kept verbatim as strings; the reserved values are typed
/// and assigned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationRecord {
    fields: BTreeMap<String, String>,
    cv_resume_path: Option<String>,
    submission_date: NaiveDateTime,
    status: ApplicationStatus,
}

impl ApplicationRecord {
    pub fn new(
        fields: BTreeMap<String, String>,
        cv_resume_path: Option<String>,
        submission_date: NaiveDateTime,
    ) -> Self {
        Self {
            fields,
            cv_resume_path,
            submission_date,
            status: ApplicationStatus::Pending,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn cv_resume_path(&self) -> Option<&str> {
        self.cv_resume_path.as_deref()
    }

    #[cfg(test)]
    pub fn submission_date(&self) -> NaiveDateTime {
        self.submission_date
    }

    pub fn submission_date_iso(&self) -> String {
        self.submission_date.format(SUBMISSION_DATE_FORMAT).to_string()
    }

    pub fn status(&self) -> ApplicationStatus {
        self.status
    }
}

/// Identifier handed back to the applicant. The dashboard may use either
/// numeric or textual ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApplicationId {
    Numeric(i64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionRoute {
    Remote,
    Local,
}

/// Terminal result of routing one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub application_id: Option<ApplicationId>,
    pub route: SubmissionRoute,
}
