use sea_orm::*;
use uuid::Uuid;

use crate::crud::{Crud, CrudError};
use crate::entity::{user, user_profile};

/// Create or update the profile of `user_id`.
///
/// The first save creates the profile and points the user at it; later saves
/// edit that same profile in place.
pub async fn save_profile<C>(
    db: &C,
    user_id: Uuid,
    changes: user_profile::ActiveModel,
) -> Result<user_profile::Model, CrudError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let users = Crud::<user::Entity>::new();
    let profiles = Crud::<user_profile::Entity>::new();

    let txn = db.begin().await?;
    let owner = users.read_by_primary_key(&txn, user_id, false).await?;

    let profile = match owner.profile_id {
        Some(profile_id) => profiles.update(&txn, profile_id, changes).await?,
        None => {
            let profile = profiles.create(&txn, changes).await?;
            users
                .update(
                    &txn,
                    user_id,
                    user::ActiveModel {
                        profile_id: Set(Some(profile.id)),
                        ..Default::default()
                    },
                )
                .await?;
            profile
        }
    };

    txn.commit().await?;
    Ok(profile)
}
