use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::entity::upload::{self, MAX_FILE_SIZE};
use crate::error::AppError;
use crate::models::shared::{sanitize_text, validate_length};

/// Source tag recorded when the form leaves it out.
pub const DEFAULT_SOURCE: &str = "upload";

/// Response DTO for a single upload.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    pub id: Uuid,
    /// Original file name as sent by the client.
    #[schema(example = "report.pdf")]
    pub name: String,
    /// Object-store key.
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001.pdf")]
    pub unique_name: String,
    #[schema(example = "application/pdf")]
    pub file_type: String,
    #[schema(example = "upload")]
    pub source: String,
    /// Size in bytes.
    #[schema(example = 142857)]
    pub file_size: i64,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<upload::Model> for UploadResponse {
    fn from(m: upload::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            unique_name: m.unique_name,
            file_type: m.file_type,
            source: m.source,
            file_size: m.file_size,
            user_id: m.user_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadListResponse {
    pub uploads: Vec<UploadResponse>,
    /// All of the caller's uploads, regardless of `skip` and `limit`.
    pub total: u64,
}

pub fn validate_file_size(size: i64) -> Result<(), AppError> {
    if !(1..=MAX_FILE_SIZE).contains(&size) {
        return Err(AppError::Validation(format!(
            "File size must be between 1 and {MAX_FILE_SIZE} bytes"
        )));
    }
    Ok(())
}

/// Check the client file name and return it trimmed.
/// Sanitize and check a client-supplied file name. Returns the trimmed, cleaned name.
pub fn validate_file_name(name: &str) -> Result<String, AppError> {
    let name = sanitize_text(name.trim());
    validate_length("File name", &name, 3, 250)?;
    let name = name.trim();
    if name.chars().any(|c| c.is_control() || matches!(c, '/' | '\\')) {
        return Err(AppError::Validation(
            "File name must not contain path separators or control characters".into(),
        ));
    }
    Ok(name.to_string())
}

/// Normalize the `source` form field, falling back to [`DEFAULT_SOURCE`].
pub fn validate_source(source: Option<&str>) -> Result<String, AppError> {
    match source.map(str::trim) {
        None | Some("") => Ok(DEFAULT_SOURCE.to_string()),
        Some(s) => {
            validate_length("Source", s, 1, 50)?;
            if !s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
            {
                return Err(AppError::Validation(
                    "Source may only contain letters, digits, '-' and '_'".into(),
                ));
            }
            Ok(s.to_string())
        }
    }
}

/// Build the object-store key for a new upload: `<uuid>.<ext>`, or the bare
/// uuid when the name has no usable extension.
pub fn storage_key(name: &str) -> String {
    let id = Uuid::now_v7();
    let ext = name
        .rsplit_once('.')
        .map(|(stem, ext)| (stem, ext.to_ascii_lowercase()))
        .filter(|(stem, ext)| {
            !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 16
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|(_, ext)| ext);
    match ext {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}
