use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Json, response::IntoResponse};
use tracing::instrument;
use uuid::Uuid;

use crate::crud::Crud;
use crate::entity::group;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::SuperUser;
use crate::extractors::csrf::CsrfGuard;
use crate::extractors::json::AppJson;
use crate::models::group::*;
use crate::models::shared::ListQuery;
use crate::state::AppState;
use crate::utils::htmx::HxResponse;
use crate::utils::membership::{Reconciled, reconcile_group_members};

const ALERT_SOURCE: &str = "group";

fn groups_with_members() -> Result<Crud<group::Entity>, AppError> {
    Ok(Crud::with_relationships(&["users"])?)
}

#[utoipa::path(
    get,
    path = "/groups",
    tag = "Groups",
    operation_id = "listGroups",
    summary = "List groups with their members",
    params(ListQuery),
    responses(
        (status = 200, description = "Groups in store order", body = GroupListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin))]
pub async fn list_groups(
    _admin: SuperUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<GroupListResponse>, AppError> {
    let groups = groups_with_members()?
        .read_all(&state.db, query.skip(), query.limit(), true)
        .await?
        .into_iter()
        .map(GroupDetailResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(GroupListResponse { groups }))
}

#[utoipa::path(
    post,
    path = "/groups",
    tag = "Groups",
    operation_id = "createGroup",
    summary = "Create a group",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = GroupResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, CSRF_INVALID)", body = ErrorBody),
        (status = 409, description = "Group name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin, _csrf, payload), fields(group_name = %payload.group_name))]
pub async fn create_group(
    _admin: SuperUser,
    _csrf: CsrfGuard,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.sanitized();
    validate_create_group(&payload)?;
    let name = payload.group_name.trim().to_string();

    let group = Crud::<group::Entity>::new()
        .create(&state.db, payload.into_active_model())
        .await
        .map_err(AppError::duplicate(format!("Group '{name}' already exists")))?;

    Ok((
        StatusCode::CREATED,
        HxResponse::success(format!("Group '{name}' created"), ALERT_SOURCE).location("/groups"),
        Json(GroupResponse::from(group)),
    ))
}

#[utoipa::path(
    get,
    path = "/groups/{id}",
    tag = "Groups",
    operation_id = "getGroup",
    summary = "Get a group with its members",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "The group", body = GroupDetailResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such group (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin), fields(%id))]
pub async fn get_group(
    _admin: SuperUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GroupDetailResponse>, AppError> {
    let group = groups_with_members()?
        .read_by_primary_key(&state.db, id, true)
        .await?;
    Ok(Json(GroupDetailResponse::try_from(group)?))
}

#[utoipa::path(
    put,
    path = "/groups/{id}",
    tag = "Groups",
    operation_id = "updateGroup",
    summary = "Update a group",
    description = "Changes only the fields present in the body.",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = UpdateGroupRequest,
    responses(
        (status = 200, description = "Group updated", body = GroupResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, CSRF_INVALID)", body = ErrorBody),
        (status = 404, description = "No such group (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Group name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin, _csrf, payload), fields(%id))]
pub async fn update_group(
    _admin: SuperUser,
    _csrf: CsrfGuard,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.sanitized();
    validate_update_group(&payload)?;

    let group = Crud::<group::Entity>::new()
        .update(&state.db, id, payload.into_active_model())
        .await
        .map_err(AppError::duplicate("Another group already has that name"))?;

    Ok((
        HxResponse::success(format!("Group '{}' updated", group.group_name), ALERT_SOURCE),
        Json(GroupResponse::from(group)),
    ))
}

#[utoipa::path(
    delete,
    path = "/groups/{id}",
    tag = "Groups",
    operation_id = "deleteGroup",
    summary = "Delete a group",
    description = "Membership links of the group are removed with it.",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, CSRF_INVALID)", body = ErrorBody),
        (status = 404, description = "No such group (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin, _csrf), fields(%id))]
pub async fn delete_group(
    _admin: SuperUser,
    _csrf: CsrfGuard,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Crud::<group::Entity>::new().delete(&state.db, id).await?;
    Ok((
        StatusCode::NO_CONTENT,
        HxResponse::success("Group deleted", ALERT_SOURCE).location("/groups"),
        (),
    ))
}

#[utoipa::path(
    put,
    path = "/groups/{id}/members",
    tag = "Groups",
    operation_id = "setGroupMembers",
    summary = "Replace the member set of a group",
    description = "Users not listed lose their membership; listed users gain one. \
        All changes are applied in one transaction.",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = GroupMembersRequest,
    responses(
        (status = 200, description = "Membership reconciled", body = Reconciled),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, CSRF_INVALID)", body = ErrorBody),
        (status = 404, description = "Group or user not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, _admin, _csrf, payload), fields(%id, selected = payload.user_ids.len()))]
pub async fn set_group_members(
    _admin: SuperUser,
    _csrf: CsrfGuard,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<GroupMembersRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_group_members(&payload)?;
    let result = reconcile_group_members(&state.db, id, &payload.user_ids).await?;
    Ok((
        HxResponse::success(
            format!(
                "Members updated: {} added, {} removed",
                result.added.len(),
                result.removed.len()
            ),
            ALERT_SOURCE,
        )
        .location(format!("/groups/{id}")),
        Json(result),
    ))
}
