use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use sea_orm::ActiveValue::Set;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use tokio_util::io::ReaderStream;
use tracing::instrument;
use uuid::Uuid;

use crate::crud::Crud;
use crate::entity::upload;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::csrf::CsrfGuard;
use crate::models::shared::{ListQuery, sanitize_text};
use crate::models::upload::*;
use crate::state::AppState;
use crate::utils::htmx::HxResponse;

const ALERT_SOURCE: &str = "upload";

/// Multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn upload_body_limit(max_upload_size: u64) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_upload_size as usize + MULTIPART_OVERHEAD)
}

struct FilePart {
    name: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/uploads",
    tag = "Uploads",
    operation_id = "uploadFile",
    summary = "Upload a file",
    description = "Stores the `file` multipart field in the object store under a generated \
        `<uuid>.<ext>` key and records its metadata. An optional `source` field tags the upload \
        (defaults to `upload`). Files must be 1 to 10,000,000 bytes.",
    request_body(content_type = "multipart/form-data", description = "`file` plus optional `source`"),
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (CSRF_INVALID)", body = ErrorBody),
        (status = 502, description = "Object store unavailable (STORAGE_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, auth_user, _csrf, multipart), fields(user_id = %auth_user.user_id))]
pub async fn upload_file(
    auth_user: AuthUser,
    _csrf: CsrfGuard,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file: Option<FilePart> = None;
    let mut source: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let name = field
                    .file_name()
                    .map(str::to_owned)
                    .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
                let content_type = field.content_type().map(str::to_owned);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                file = Some(FilePart {
                    name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            Some("source") => {
                source = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("Failed to read source: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    let name = validate_file_name(&file.name)?;
    let source = validate_source(source.as_deref())?;
    let size = i64::try_from(file.data.len())
        .map_err(|_| AppError::Validation("File is too large".into()))?;
    validate_file_size(size)?;

    let file_type = file
        .content_type
        .map(|ct| sanitize_text(&ct))
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
        .or_else(|| mime_guess::from_path(&name).first().map(|m| m.to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let key = storage_key(&name);

    state.object_store.put(&key, file.data, &file_type).await?;

    let record = Crud::<upload::Entity>::new()
        .create(
            &state.db,
            upload::ActiveModel {
                name: Set(name),
                unique_name: Set(key.clone()),
                file_type: Set(file_type),
                source: Set(source),
                file_size: Set(size),
                user_id: Set(auth_user.user_id),
                ..Default::default()
            },
        )
        .await;

    let record = match record {
        Ok(record) => record,
        Err(e) => {
            if let Err(cleanup) = state.object_store.delete(&key).await {
                tracing::warn!(%key, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    tracing::info!(upload_id = %record.id, %key, size, "Stored upload");
    Ok((
        StatusCode::CREATED,
        HxResponse::success(format!("Uploaded {}", record.name), ALERT_SOURCE),
        Json(UploadResponse::from(record)),
    ))
}

#[utoipa::path(
    get,
    path = "/uploads",
    tag = "Uploads",
    operation_id = "listUploads",
    summary = "List the current user's uploads",
    params(ListQuery),
    responses(
        (status = 200, description = "Uploads owned by the caller", body = UploadListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_uploads(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<UploadListResponse>, AppError> {
    let uploads: Vec<UploadResponse> = Crud::<upload::Entity>::new()
        .read_by_column(
            &state.db,
            "user_id",
            auth_user.user_id,
            query.skip(),
            query.limit(),
        )
        .await?
        .into_vec()
        .into_iter()
        .map(UploadResponse::from)
        .collect();

    let total = upload::Entity::find()
        .filter(upload::Column::UserId.eq(auth_user.user_id))
        .count(&state.db)
        .await?;

    Ok(Json(UploadListResponse { uploads, total }))
}

/// Uploads are visible to their owner and to superusers.
async fn find_visible_upload(
    state: &AppState,
    auth_user: &AuthUser,
    id: Uuid,
) -> Result<upload::Model, AppError> {
    let record = Crud::<upload::Entity>::new()
        .read_by_primary_key(&state.db, id, false)
        .await?
        .into_inner();
    if record.user_id != auth_user.user_id && !auth_user.is_superuser {
        return Err(AppError::NotFound(format!("upload {id} not found")));
    }
    Ok(record)
}

#[utoipa::path(
    get,
    path = "/uploads/{id}/download",
    tag = "Uploads",
    operation_id = "downloadUpload",
    summary = "Download an uploaded file",
    params(("id" = Uuid, Path, description = "Upload ID")),
    responses(
        (status = 200, description = "File content"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Upload not found or not visible (NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Object store unavailable (STORAGE_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id, %id))]
pub async fn download_upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let record = find_visible_upload(&state, &auth_user, id).await?;
    let reader = state.object_store.get_stream(&record.unique_name).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &record.file_type)
        .header(header::CONTENT_LENGTH, record.file_size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&record.name),
        )
        .header(header::CACHE_CONTROL, "private, no-store")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    delete,
    path = "/uploads/{id}",
    tag = "Uploads",
    operation_id = "deleteUpload",
    summary = "Delete an upload and its stored file",
    params(("id" = Uuid, Path, description = "Upload ID")),
    responses(
        (status = 204, description = "Upload deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (CSRF_INVALID)", body = ErrorBody),
        (status = 404, description = "Upload not found or not visible (NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Object store unavailable (STORAGE_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, auth_user, _csrf), fields(user_id = %auth_user.user_id, %id))]
pub async fn delete_upload(
    auth_user: AuthUser,
    _csrf: CsrfGuard,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let record = find_visible_upload(&state, &auth_user, id).await?;

    if !state.object_store.delete(&record.unique_name).await? {
        tracing::warn!(key = %record.unique_name, "Stored file was already gone");
    }
    Crud::<upload::Entity>::new().delete(&state.db, id).await?;

    Ok((
        StatusCode::NO_CONTENT,
        HxResponse::success(format!("Deleted {}", record.name), ALERT_SOURCE),
        (),
    ))
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_name: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_name.is_empty() {
        "download".to_string()
    } else {
        ascii_name
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                String::from(b as char)
            }
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
