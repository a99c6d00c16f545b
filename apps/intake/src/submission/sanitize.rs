//! Filename sanitization for stored uploads.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fallback when nothing usable survives sanitizing an uploaded filename.
pub const FALLBACK_FILE_NAME: &str = "upload";
/// Fallback for a missing or unusable email prefix.
pub const FALLBACK_EMAIL: &str = "unknown";

/// Reduces a client-supplied filename to a safe, flat ASCII name.
///
/// Directory components are discarded, letters are decomposed and lose
/// their diacritics, whitespace runs become `_`, anything outside `[A-Za-z0-9._-]` is
/// dropped and leading/trailing `.`/`_` are trimmed.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    let mut out = String::with_capacity(base.len());
    let mut pending_space = false;
    for c in fold_to_ascii(base).chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push('_');
        }
        pending_space = false;
        out.push(c);
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Turns an email address into a filename prefix: `jane@x.com` -> `jane_x_com`.
pub fn sanitize_email(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return FALLBACK_EMAIL.to_string();
    };

    let mut out = String::with_capacity(raw.len());
    for c in fold_to_ascii(raw).chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        FALLBACK_EMAIL.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Lower-case extension after the last dot, if any.
pub fn extension_of(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

// NFKD splits accented letters into base + combining marks; the marks go.
fn fold_to_ascii(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}
