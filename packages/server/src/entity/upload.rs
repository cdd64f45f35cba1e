use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Largest accepted upload, in bytes.
pub const MAX_FILE_SIZE: i64 = 10_000_000;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "upload")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Original client filename.
    pub name: String,
    /// Object store key, `<uuid>.<ext>`.
    #[sea_orm(unique)]
    pub unique_name: String,
    /// MIME type.
    pub file_type: String,
    /// Free-form tag naming where the upload came from.
    pub source: String,
    pub file_size: i64,

    pub user_id: Uuid,
    #[sea_orm(belongs_to, from = "user_id", to = "id", on_delete = "Cascade")]
    pub user: HasOne<super::user::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
