use std::io::ErrorKind;
use std::path::Path;

use chrono::NaiveDateTime;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::submission::models::UploadedDocument;
use crate::submission::sanitize::{extension_of, sanitize_email, sanitize_file_name};

/// Timestamp component of stored upload names.
pub const STORED_NAME_TIMESTAMP: &str = "%Y%m%d_%H%M%S";

/// Upper bound on `_N` suffixes tried before giving up on a name.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// `{email}_{YYYYMMDD_HHMMSS}_{original}` with every part sanitized.
pub fn stored_name(email: Option<&str>, original_name: &str, extension: &str, at: NaiveDateTime) -> String {
    let mut file_name = sanitize_file_name(original_name);
    if extension_of(&file_name).as_deref() != Some(extension) {
        file_name.push('.');
        file_name.push_str(extension);
    }
    format!(
        "{}_{}_{}",
        sanitize_email(email),
        at.format(STORED_NAME_TIMESTAMP),
        file_name
    )
}

/// `name` with `_{n}` inserted before the extension.
fn disambiguated(name: &str, n: u32) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{n}.{ext}"),
        None => format!("{name}_{n}"),
    }
}

/// Writes the document bytes into `upload_dir` under its stored name.
///
/// Files are created with create-new semantics, so a same-second upload from
/// the same address gets a `_2`, `_3`, ... suffix instead of replacing the
/// earlier file.
pub async fn save_document(
    upload_dir: &Path,
    email: Option<&str>,
    original_name: &str,
    extension: &str,
    bytes: &[u8],
    at: NaiveDateTime,
) -> std::io::Result<UploadedDocument> {
    tokio::fs::create_dir_all(upload_dir).await?;
    let base = stored_name(email, original_name, extension, at);

    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let name = if attempt == 1 {
            base.clone()
        } else {
            disambiguated(&base, attempt)
        };
        let path = upload_dir.join(&name);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("Upload name {name} taken, trying next suffix");
                continue;
            }
            Err(e) => return Err(e),
        };
        let written = write_fully(&mut file, bytes).await;
        drop(file);
        discard_on_error(&path, written).await?;

        info!("Stored upload {} ({} bytes)", path.display(), bytes.len());
        return Ok(UploadedDocument {
            original_name: original_name.to_string(),
            stored_path: path,
            size_bytes: bytes.len() as u64,
            extension: extension.to_string(),
        });
    }

    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free upload name for {base} after {MAX_NAME_ATTEMPTS} attempts"),
    ))
}

async fn write_fully(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.sync_all().await
}

/// Removes a partially written upload so a failed write leaves nothing behind.
async fn discard_on_error<T>(path: &Path, written: std::io::Result<T>) -> std::io::Result<T> {
    if written.is_err() {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Could not remove partial upload {}: {e}", path.display());
        }
    }
    written
}
