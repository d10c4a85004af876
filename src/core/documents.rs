//! Supporting-document rules for benefit claims.
//!
//! The HTTP layer streams uploads to disk; this module decides which form
//! fields may carry files, how many, of what type, and what they are named.

use crate::{
    errors::{Error, Result},
    models::DocumentKind,
};
use chrono::{DateTime, Utc};
use std::{collections::HashMap, path::Path};

/// File types accepted for upload, matched against extension and mime type.
pub const ALLOWED_TYPES: &[&str] = &["jpeg", "jpg", "png", "pdf", "doc", "docx"];

/// Maximum number of files under `otherDocuments`.
pub const MAX_OTHER_DOCUMENTS: usize = 5;

/// Metadata of an upload already written to the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Which slot the file was uploaded under
    pub kind: DocumentKind,
    /// Name on disk
    pub filename: String,
    /// Name supplied by the client
    pub original_name: String,
    /// Path on disk
    pub storage_path: String,
    /// Mime type supplied by the client
    pub mime_type: String,
    /// File size
    pub size_bytes: i64,
}

/// Maps a multipart field name to its document slot.
#[must_use]
pub fn kind_for_field(field: &str) -> Option<DocumentKind> {
    match field {
        "aadharCard" => Some(DocumentKind::Aadhar),
        "hospitalLetter" => Some(DocumentKind::HospitalLetter),
        "paymentSlip" => Some(DocumentKind::PaymentSlip),
        "registrationCopy" => Some(DocumentKind::RegistrationCopy),
        "otherDocuments" => Some(DocumentKind::Other),
        _ => None,
    }
}

/// How many files a slot accepts.
#[must_use]
pub const fn max_files(kind: DocumentKind) -> usize {
    match kind {
        DocumentKind::Other => MAX_OTHER_DOCUMENTS,
        _ => 1,
    }
}

/// Lower-cased extension of `original_name`.
fn extension(original_name: &str) -> Option<String> {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Checks an upload's type and returns the extension to store it under.
pub fn check_file_type(original_name: &str, mime_type: &str) -> Result<String> {
    let ext = extension(original_name)
        .filter(|ext| ALLOWED_TYPES.contains(&ext.as_str()))
        .ok_or_else(|| {
            Error::validation("Only images (jpeg, jpg, png) and documents (pdf, doc, docx) are allowed")
        })?;

    let mime = mime_type.to_ascii_lowercase();
    if !ALLOWED_TYPES.iter().any(|allowed| mime.contains(allowed)) {
        return Err(Error::validation(format!(
            "File type '{mime_type}' is not allowed"
        )));
    }
    Ok(ext)
}

/// Rejects a file larger than `max_bytes`.
pub fn check_file_size(original_name: &str, size: u64, max_bytes: u64) -> Result<()> {
    if size > max_bytes {
        return Err(Error::validation(format!(
            "File '{original_name}' exceeds the {max_bytes} byte limit"
        )));
    }
    Ok(())
}

/// Name a file is stored under: `<field>-<millis>-<suffix>.<ext>`.
#[must_use]
pub fn stored_filename(field: &str, now: DateTime<Utc>, suffix: u32, ext: &str) -> String {
    format!("{field}-{}-{suffix}.{ext}", now.timestamp_millis())
}

/// Running per-slot count of the files in one submission.
#[derive(Debug, Default)]
pub struct DocumentTally {
    counts: HashMap<DocumentKind, usize>,
}

impl DocumentTally {
    /// Resolves `field` to a slot and counts one more file in it.
    pub fn admit(&mut self, field: &str) -> Result<DocumentKind> {
        let kind = kind_for_field(field)
            .ok_or_else(|| Error::validation(format!("Unexpected file field '{field}'")))?;
        let count = self.counts.entry(kind).or_insert(0);
        if *count >= max_files(kind) {
            return Err(Error::validation(format!(
                "Too many files for '{field}' (max {})",
                max_files(kind)
            )));
        }
        *count += 1;
        Ok(kind)
    }
}
