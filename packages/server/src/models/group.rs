use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crud::Loaded;
use crate::entity::group::{self, Permission};
use crate::entity::user;
use crate::error::AppError;
use crate::models::shared::{
    double_option, normalize_description, sanitize_optional, sanitize_text, validate_description,
    validate_id_selection, validate_length,
};
use crate::models::user::UserSummary;

/// Most users that one membership update may select.
pub const MAX_SELECTION: usize = 1000;

/// Request body for creating a group.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateGroupRequest {
    /// Unique group name (3-50 characters).
    #[schema(example = "engineering")]
    pub group_name: String,
    /// Optional description (5-200 characters).
    #[schema(example = "Platform engineering team")]
    pub group_desc: Option<String>,
    pub permission: Option<Permission>,
}

pub fn validate_create_group(payload: &CreateGroupRequest) -> Result<(), AppError> {
    validate_length("Group name", &payload.group_name, 3, 50)?;
    validate_description("Group description", payload.group_desc.as_deref())
}

impl CreateGroupRequest {
    pub fn sanitized(self) -> Self {
        Self {
            group_name: sanitize_text(&self.group_name),
            group_desc: sanitize_optional(self.group_desc),
            permission: self.permission,
        }
    }

    pub fn into_active_model(self) -> group::ActiveModel {
        group::ActiveModel {
            group_name: Set(self.group_name.trim().to_string()),
            group_desc: Set(normalize_description(self.group_desc)),
            permission: Set(self.permission),
            ..Default::default()
        }
    }
}

/// Request body for updating a group. Absent fields are left unchanged.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateGroupRequest {
    pub group_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub group_desc: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Permission>)]
    pub permission: Option<Option<Permission>>,
}

pub fn validate_update_group(payload: &UpdateGroupRequest) -> Result<(), AppError> {
    if let Some(name) = &payload.group_name {
        validate_length("Group name", name, 3, 50)?;
    }
    if let Some(desc) = &payload.group_desc {
        validate_description("Group description", desc.as_deref())?;
    }
    Ok(())
}

impl UpdateGroupRequest {
    pub fn sanitized(self) -> Self {
        Self {
            group_name: sanitize_optional(self.group_name),
            group_desc: self.group_desc.map(sanitize_optional),
            permission: self.permission,
        }
    }

    pub fn into_active_model(self) -> group::ActiveModel {
        let mut changes = group::ActiveModel::default();
        if let Some(name) = self.group_name {
            changes.group_name = Set(name.trim().to_string());
        }
        if let Some(desc) = self.group_desc {
            changes.group_desc = Set(normalize_description(desc));
        }
        if let Some(permission) = self.permission {
            changes.permission = Set(permission);
        }
        changes
    }
}

/// The complete member set a group should end up with.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct GroupMembersRequest {
    pub user_ids: Vec<Uuid>,
}

pub fn validate_group_members(payload: &GroupMembersRequest) -> Result<(), AppError> {
    validate_id_selection(&payload.user_ids, "user", MAX_SELECTION)
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct GroupResponse {
    pub id: Uuid,
    #[schema(example = "engineering")]
    pub group_name: String,
    pub group_desc: Option<String>,
    pub permission: Option<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<group::Model> for GroupResponse {
    fn from(m: group::Model) -> Self {
        Self {
            id: m.id,
            group_name: m.group_name,
            group_desc: m.group_desc,
            permission: m.permission,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// A group with its members.
#[derive(Serialize, utoipa::ToSchema)]
pub struct GroupDetailResponse {
    #[serde(flatten)]
    pub group: GroupResponse,
    pub users: Vec<UserSummary>,
}

impl TryFrom<Loaded<group::Model>> for GroupDetailResponse {
    type Error = AppError;

    fn try_from(loaded: Loaded<group::Model>) -> Result<Self, AppError> {
        let users: Vec<user::Model> = loaded.related_as("users")?.unwrap_or_default();
        Ok(Self {
            group: loaded.into_inner().into(),
            users: users.into_iter().map(UserSummary::from).collect(),
        })
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct GroupListResponse {
    pub groups: Vec<GroupDetailResponse>,
}
