use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string. Never serialized to clients.
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_superuser: bool,

    pub role_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "role_id", to = "id", on_delete = "SetNull")]
    pub role: HasOne<super::role::Entity>,

    /// Set once, when the user first saves a profile.
    pub profile_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "profile_id", to = "id")]
    pub profile: HasOne<super::user_profile::Entity>,

    #[sea_orm(has_many)]
    pub uploads: HasMany<super::upload::Entity>,

    #[sea_orm(has_many)]
    pub group_links: HasMany<super::user_group_link::Entity>,

    #[sea_orm(has_many, via = "user_group_link")]
    pub groups: HasMany<super::group::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
