use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::role;
use crate::error::AppError;
use crate::models::shared::{
    double_option, normalize_description, sanitize_optional, sanitize_text, validate_description,
    validate_length,
};

/// Request body for creating a role.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateRoleRequest {
    /// Unique role name (3-50 characters, compared case-insensitively).
    #[schema(example = "editor")]
    pub role_name: String,
    /// Optional description (5-200 characters).
    #[schema(example = "Can edit content")]
    pub role_desc: Option<String>,
}

pub fn validate_create_role(payload: &CreateRoleRequest) -> Result<(), AppError> {
    validate_length("Role name", &payload.role_name, 3, 50)?;
    validate_description("Role description", payload.role_desc.as_deref())
}

impl CreateRoleRequest {
    pub fn sanitized(self) -> Self {
        Self {
            role_name: sanitize_text(&self.role_name),
            role_desc: sanitize_optional(self.role_desc),
        }
    }

    pub fn into_active_model(self) -> role::ActiveModel {
        role::ActiveModel {
            role_name: Set(self.role_name.trim().to_string()),
            role_desc: Set(normalize_description(self.role_desc)),
            ..Default::default()
        }
    }
}

/// Request body for updating a role. Absent fields are left unchanged.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateRoleRequest {
    #[schema(example = "senior-editor")]
    pub role_name: Option<String>,
    /// Send `null` to clear the description.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub role_desc: Option<Option<String>>,
}

pub fn validate_update_role(payload: &UpdateRoleRequest) -> Result<(), AppError> {
    if let Some(name) = &payload.role_name {
        validate_length("Role name", name, 3, 50)?;
    }
    if let Some(desc) = &payload.role_desc {
        validate_description("Role description", desc.as_deref())?;
    }
    Ok(())
}

impl UpdateRoleRequest {
    pub fn sanitized(self) -> Self {
        Self {
            role_name: sanitize_optional(self.role_name),
            role_desc: self.role_desc.map(sanitize_optional),
        }
    }

    pub fn into_active_model(self) -> role::ActiveModel {
        let mut changes = role::ActiveModel::default();
        if let Some(name) = self.role_name {
            changes.role_name = Set(name.trim().to_string());
        }
        if let Some(desc) = self.role_desc {
            changes.role_desc = Set(normalize_description(desc));
        }
        changes
    }
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct RoleResponse {
    pub id: Uuid,
    #[schema(example = "editor")]
    pub role_name: String,
    #[schema(example = "Can edit content")]
    pub role_desc: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<role::Model> for RoleResponse {
    fn from(m: role::Model) -> Self {
        Self {
            id: m.id,
            role_name: m.role_name,
            role_desc: m.role_desc,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RoleListResponse {
    pub roles: Vec<RoleResponse>,
}
