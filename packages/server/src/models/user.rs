use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::crud::Loaded;
use crate::entity::{group, role, user, user_profile};
use crate::error::AppError;
use crate::models::group::{GroupResponse, MAX_SELECTION};
use crate::models::profile::ProfileResponse;
use crate::models::role::RoleResponse;
use crate::models::shared::validate_id_selection;

/// Columns an admin may change through `PUT /users/{id}`.
pub const EDITABLE_FIELDS: &[&str] = &["role_id", "is_active", "is_verified", "is_superuser"];

/// Compact user reference used inside other resources.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    #[schema(example = "user@example.com")]
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl From<user::Model> for UserSummary {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            is_active: m.is_active,
            is_superuser: m.is_superuser,
        }
    }
}

/// A user with role, profile and groups attached.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    #[schema(example = "user@example.com")]
    pub email: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_superuser: bool,
    pub role: Option<RoleResponse>,
    pub profile: Option<ProfileResponse>,
    pub groups: Vec<GroupResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Loaded<user::Model>> for UserResponse {
    type Error = AppError;

    fn try_from(loaded: Loaded<user::Model>) -> Result<Self, AppError> {
        let role: Option<role::Model> = loaded.related_as("role")?;
        let profile: Option<user_profile::Model> = loaded.related_as("profile")?;
        let groups: Vec<group::Model> = loaded.related_as("groups")?.unwrap_or_default();
        let m = loaded.into_inner();
        Ok(Self {
            id: m.id,
            email: m.email,
            is_active: m.is_active,
            is_verified: m.is_verified,
            is_superuser: m.is_superuser,
            role: role.map(RoleResponse::from),
            profile: profile.map(ProfileResponse::from),
            groups: groups.into_iter().map(GroupResponse::from).collect(),
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
}

/// Attribute changes for a user. Only the listed keys are accepted.
#[derive(Deserialize, utoipa::ToSchema)]
#[allow(dead_code)]
pub struct UpdateUserRequest {
    /// Role to assign, or `null` to clear it.
    pub role_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Check a raw attribute map for `PUT /users/{id}`.
///
/// Returns the role id the caller wants to assign, if any, so the handler
/// can confirm it exists.
pub fn validate_user_changes(changes: &Map<String, Value>) -> Result<Option<Uuid>, AppError> {
    if changes.is_empty() {
        return Err(AppError::Validation("No changes supplied".into()));
    }
    let mut role_id = None;
    for (key, value) in changes {
        match key.as_str() {
            "role_id" => match value {
                Value::Null => {}
                Value::String(s) => {
                    role_id = Some(
                        Uuid::parse_str(s)
                            .map_err(|_| AppError::Validation("role_id must be a UUID".into()))?,
                    );
                }
                _ => return Err(AppError::Validation("role_id must be a UUID or null".into())),
            },
            "is_active" | "is_verified" | "is_superuser" => {
                if !value.is_boolean() {
                    return Err(AppError::Validation(format!("{key} must be a boolean")));
                }
            }
            other => {
                return Err(AppError::Validation(format!(
                    "'{other}' cannot be changed; editable fields are {}",
                    EDITABLE_FIELDS.join(", ")
                )));
            }
        }
    }
    Ok(role_id)
}

/// The complete group set a user should end up in.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UserGroupsRequest {
    pub group_ids: Vec<Uuid>,
}

pub fn validate_user_groups(payload: &UserGroupsRequest) -> Result<(), AppError> {
    validate_id_selection(&payload.group_ids, "group", MAX_SELECTION)
}
