use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Json, response::IntoResponse};
use tracing::instrument;
use uuid::Uuid;

use crate::crud::Crud;
use crate::entity::role;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::SuperUser;
use crate::extractors::csrf::CsrfGuard;
use crate::extractors::json::AppJson;
use crate::models::role::*;
use crate::models::shared::ListQuery;
use crate::state::AppState;
use crate::utils::htmx::HxResponse;

const ALERT_SOURCE: &str = "role";

#[utoipa::path(
    get,
    path = "/roles",
    tag = "Roles",
    operation_id = "listRoles",
    summary = "List roles",
    params(ListQuery),
    responses(
        (status = 200, description = "Roles in store order", body = RoleListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin))]
pub async fn list_roles(
    _admin: SuperUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<RoleListResponse>, AppError> {
    let roles = Crud::<role::Entity>::new()
        .read_all(&state.db, query.skip(), query.limit(), false)
        .await?;
    Ok(Json(RoleListResponse {
        roles: roles
            .into_iter()
            .map(|r| RoleResponse::from(r.into_inner()))
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/roles",
    tag = "Roles",
    operation_id = "createRole",
    summary = "Create a role",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, CSRF_INVALID)", body = ErrorBody),
        (status = 409, description = "Role name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin, _csrf, payload), fields(role_name = %payload.role_name))]
pub async fn create_role(
    _admin: SuperUser,
    _csrf: CsrfGuard,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.sanitized();
    validate_create_role(&payload)?;
    let name = payload.role_name.trim().to_string();

    let role = Crud::<role::Entity>::new()
        .create(&state.db, payload.into_active_model())
        .await
        .map_err(AppError::duplicate(format!("Role '{name}' already exists")))?;

    Ok((
        StatusCode::CREATED,
        HxResponse::success(format!("Role '{name}' created"), ALERT_SOURCE).location("/roles"),
        Json(RoleResponse::from(role)),
    ))
}

#[utoipa::path(
    get,
    path = "/roles/{id}",
    tag = "Roles",
    operation_id = "getRole",
    summary = "Get a role",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "The role", body = RoleResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such role (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin), fields(%id))]
pub async fn get_role(
    _admin: SuperUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoleResponse>, AppError> {
    let role = Crud::<role::Entity>::new()
        .read_by_primary_key(&state.db, id, false)
        .await?;
    Ok(Json(RoleResponse::from(role.into_inner())))
}

#[utoipa::path(
    put,
    path = "/roles/{id}",
    tag = "Roles",
    operation_id = "updateRole",
    summary = "Update a role",
    description = "Changes only the fields present in the body.",
    params(("id" = Uuid, Path, description = "Role ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = RoleResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, CSRF_INVALID)", body = ErrorBody),
        (status = 404, description = "No such role (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Role name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin, _csrf, payload), fields(%id))]
pub async fn update_role(
    _admin: SuperUser,
    _csrf: CsrfGuard,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.sanitized();
    validate_update_role(&payload)?;

    let role = Crud::<role::Entity>::new()
        .update(&state.db, id, payload.into_active_model())
        .await
        .map_err(AppError::duplicate("Another role already has that name"))?;

    Ok((
        HxResponse::success(format!("Role '{}' updated", role.role_name), ALERT_SOURCE),
        Json(RoleResponse::from(role)),
    ))
}

#[utoipa::path(
    delete,
    path = "/roles/{id}",
    tag = "Roles",
    operation_id = "deleteRole",
    summary = "Delete a role",
    description = "Users holding the role keep their accounts with no role.",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, CSRF_INVALID)", body = ErrorBody),
        (status = 404, description = "No such role (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin, _csrf), fields(%id))]
pub async fn delete_role(
    _admin: SuperUser,
    _csrf: CsrfGuard,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Crud::<role::Entity>::new().delete(&state.db, id).await?;
    Ok((
        StatusCode::NO_CONTENT,
        HxResponse::success("Role deleted", ALERT_SOURCE).location("/roles"),
        (),
    ))
}
