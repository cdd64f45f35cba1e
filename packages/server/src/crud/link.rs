use sea_orm::*;
use uuid::Uuid;

use super::CrudError;
use crate::entity::user_group_link;

/// An association entity joining two others by a pair of key columns.
pub trait Link: EntityTrait {
    /// The two key columns, in the order `check_associated_records` takes them.
    fn key_columns() -> (Self::Column, Self::Column);
}

impl Link for user_group_link::Entity {
    fn key_columns() -> (Self::Column, Self::Column) {
        (
            user_group_link::Column::GroupId,
            user_group_link::Column::UserId,
        )
    }
}

/// Find the link row joining `first` and `second`, if any.
pub async fn check_associated_records<L, C>(
    db: &C,
    first: Uuid,
    second: Uuid,
) -> Result<Option<L::Model>, CrudError>
where
    L: Link,
    C: ConnectionTrait,
{
    let (first_column, second_column) = L::key_columns();
    Ok(L::find()
        .filter(first_column.eq(first))
        .filter(second_column.eq(second))
        .one(db)
        .await?)
}
