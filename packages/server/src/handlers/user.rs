use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Json, response::IntoResponse};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use serde_json::{Map, Value};
use tracing::instrument;
use uuid::Uuid;

use crate::crud::Crud;
use crate::entity::{role, upload, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::SuperUser;
use crate::extractors::csrf::CsrfGuard;
use crate::extractors::json::AppJson;
use crate::models::profile::{ProfileRequest, ProfileResponse, validate_profile};
use crate::models::shared::ListQuery;
use crate::models::user::*;
use crate::state::AppState;
use crate::utils::htmx::HxResponse;
use crate::utils::membership::{Reconciled, reconcile_user_groups};
use crate::utils::profile::save_profile;

const ALERT_SOURCE: &str = "user";

fn users_with_details() -> Result<Crud<user::Entity>, AppError> {
    Ok(Crud::with_relationships(&["role", "profile", "groups"])?)
}

async fn load_user(state: &AppState, id: Uuid) -> Result<UserResponse, AppError> {
    let loaded = users_with_details()?
        .read_by_primary_key(&state.db, id, true)
        .await?;
    UserResponse::try_from(loaded)
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List users with role, profile and groups",
    params(ListQuery),
    responses(
        (status = 200, description = "Users in store order", body = UserListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin))]
pub async fn list_users(
    _admin: SuperUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    let users = users_with_details()?
        .read_all(&state.db, query.skip(), query.limit(), true)
        .await?
        .into_iter()
        .map(UserResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(UserListResponse { users }))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Get a user with role, profile and groups",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such user (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin), fields(%id))]
pub async fn get_user(
    _admin: SuperUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(load_user(&state, id).await?))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    operation_id = "updateUser",
    summary = "Change a user's role or flags",
    description = "Accepts any subset of `role_id`, `is_active`, `is_verified` and `is_superuser`. \
        Other keys are rejected. Superusers cannot deactivate or demote themselves.",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, CSRF_INVALID)", body = ErrorBody),
        (status = 404, description = "User or role not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, admin, _csrf, changes), fields(%id))]
pub async fn update_user(
    SuperUser(admin): SuperUser,
    _csrf: CsrfGuard,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(changes): AppJson<Map<String, Value>>,
) -> Result<impl IntoResponse, AppError> {
    let role_id = validate_user_changes(&changes)?;

    if id == admin.user_id
        && ["is_active", "is_superuser"]
            .iter()
            .any(|flag| changes.get(*flag) == Some(&Value::Bool(false)))
    {
        return Err(AppError::Validation(
            "You cannot deactivate or demote your own account".into(),
        ));
    }
    if let Some(role_id) = role_id {
        Crud::<role::Entity>::new()
            .read_by_primary_key(&state.db, role_id, false)
            .await?;
    }

    let users = Crud::<user::Entity>::new();
    let am = users.from_attributes(Value::Object(changes))?;
    let updated = users.update(&state.db, id, am).await?;
    tracing::info!(user_id = %id, by = %admin.user_id, "Updated user");

    Ok((
        HxResponse::success(format!("User {} updated", updated.email), ALERT_SOURCE),
        Json(load_user(&state, id).await?),
    ))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    operation_id = "deleteUser",
    summary = "Delete a user",
    description = "Removes the account, its group links and its uploads, including the stored files.",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Tried to delete own account (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, CSRF_INVALID)", body = ErrorBody),
        (status = 404, description = "No such user (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, admin, _csrf), fields(%id))]
pub async fn delete_user(
    SuperUser(admin): SuperUser,
    _csrf: CsrfGuard,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if id == admin.user_id {
        return Err(AppError::Validation("You cannot delete your own account".into()));
    }

    let keys: Vec<String> = upload::Entity::find()
        .filter(upload::Column::UserId.eq(id))
        .select_only()
        .column(upload::Column::UniqueName)
        .into_tuple()
        .all(&state.db)
        .await?;

    Crud::<user::Entity>::new().delete(&state.db, id).await?;

    // Rows are gone by now; a file that fails to delete is only logged.
    for key in keys {
        if let Err(e) = state.object_store.delete(&key).await {
            tracing::warn!(%key, error = %e, "Failed to remove stored file of deleted user");
        }
    }

    Ok((
        StatusCode::NO_CONTENT,
        HxResponse::success("User deleted", ALERT_SOURCE).location("/users"),
        (),
    ))
}

#[utoipa::path(
    put,
    path = "/users/{id}/groups",
    tag = "Users",
    operation_id = "setUserGroups",
    summary = "Replace the group set of a user",
    description = "Groups not listed lose the user; listed groups gain them. \
        All changes are applied in one transaction.",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UserGroupsRequest,
    responses(
        (status = 200, description = "Membership reconciled", body = Reconciled),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, CSRF_INVALID)", body = ErrorBody),
        (status = 404, description = "User or group not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin, _csrf, payload), fields(%id, selected = payload.group_ids.len()))]
pub async fn set_user_groups(
    _admin: SuperUser,
    _csrf: CsrfGuard,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UserGroupsRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_user_groups(&payload)?;
    let result = reconcile_user_groups(&state.db, id, &payload.group_ids).await?;
    Ok((
        HxResponse::success(
            format!(
                "Groups updated: {} added, {} removed",
                result.added.len(),
                result.removed.len()
            ),
            ALERT_SOURCE,
        )
        .location(format!("/users/{id}")),
        Json(result),
    ))
}

#[utoipa::path(
    put,
    path = "/users/{id}/profile",
    tag = "Users",
    operation_id = "saveUserProfile",
    summary = "Create or replace a user's profile",
    description = "The first save creates the profile; later saves edit it in place.",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Profile saved", body = ProfileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, CSRF_INVALID)", body = ErrorBody),
        (status = 404, description = "No such user (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin, _csrf, payload), fields(%id))]
pub async fn save_user_profile(
    _admin: SuperUser,
    _csrf: CsrfGuard,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<ProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.sanitized();
    validate_profile(&payload)?;
    let profile = save_profile(&state.db, id, payload.into_active_model()).await?;
    Ok((
        HxResponse::success("Profile saved", ALERT_SOURCE).location(format!("/users/{id}")),
        Json(ProfileResponse::from(profile)),
    ))
}
