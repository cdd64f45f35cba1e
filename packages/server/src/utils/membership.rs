use std::collections::BTreeSet;

use sea_orm::*;
use serde::Serialize;
use uuid::Uuid;

use crate::crud::{Crud, CrudError, check_associated_records};
use crate::entity::{group, user, user_group_link};

/// Link rows created and removed by one reconciliation.
#[derive(Debug, Default, Serialize, utoipa::ToSchema)]
pub struct Reconciled {
    /// Ids that gained a link.
    pub added: Vec<Uuid>,
    /// Ids that lost their link.
    pub removed: Vec<Uuid>,
}

/// Which end of the link is held fixed.
#[derive(Clone, Copy)]
enum Anchor {
    Group(Uuid),
    User(Uuid),
}

impl Anchor {
    fn column(self) -> user_group_link::Column {
        match self {
            Anchor::Group(_) => user_group_link::Column::GroupId,
            Anchor::User(_) => user_group_link::Column::UserId,
        }
    }

    fn id(self) -> Uuid {
        match self {
            Anchor::Group(id) | Anchor::User(id) => id,
        }
    }

    /// The id on the far side of `link`.
    fn other_end(self, link: &user_group_link::Model) -> Uuid {
        match self {
            Anchor::Group(_) => link.user_id,
            Anchor::User(_) => link.group_id,
        }
    }

    fn pair(self, other: Uuid) -> (Uuid, Uuid) {
        match self {
            Anchor::Group(group_id) => (group_id, other),
            Anchor::User(user_id) => (other, user_id),
        }
    }
}

/// Make `desired_user_ids` the exact member set of a group.
pub async fn reconcile_group_members<C>(
    db: &C,
    group_id: Uuid,
    desired_user_ids: &[Uuid],
) -> Result<Reconciled, CrudError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    Crud::<group::Entity>::new()
        .read_by_primary_key(&txn, group_id, false)
        .await?;
    let desired: BTreeSet<Uuid> = desired_user_ids.iter().copied().collect();
    require_all_exist::<user::Entity, _>(&txn, user::Column::Id, &desired).await?;

    let result = reconcile(&txn, Anchor::Group(group_id), desired).await?;
    txn.commit().await?;
    Ok(result)
}

/// Make `desired_group_ids` the exact group set of a user.
pub async fn reconcile_user_groups<C>(
    db: &C,
    user_id: Uuid,
    desired_group_ids: &[Uuid],
) -> Result<Reconciled, CrudError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    Crud::<user::Entity>::new()
        .read_by_primary_key(&txn, user_id, false)
        .await?;
    let desired: BTreeSet<Uuid> = desired_group_ids.iter().copied().collect();
    require_all_exist::<group::Entity, _>(&txn, group::Column::Id, &desired).await?;

    let result = reconcile(&txn, Anchor::User(user_id), desired).await?;
    txn.commit().await?;
    Ok(result)
}

async fn require_all_exist<E, C>(
    db: &C,
    id_column: E::Column,
    ids: &BTreeSet<Uuid>,
) -> Result<(), CrudError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(());
    }
    let found: BTreeSet<Uuid> = E::find()
        .filter(id_column.is_in(ids.iter().copied()))
        .select_only()
        .column(id_column)
        .into_tuple::<Uuid>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    match ids.difference(&found).next() {
        Some(missing) => Err(CrudError::NotFound(format!(
            "{} {missing}",
            E::default().table_name()
        ))),
        None => Ok(()),
    }
}

async fn reconcile<C>(
    txn: &C,
    anchor: Anchor,
    desired: BTreeSet<Uuid>,
) -> Result<Reconciled, CrudError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let current = user_group_link::Entity::find()
        .filter(anchor.column().eq(anchor.id()))
        .all(txn)
        .await?;

    let mut result = Reconciled::default();

    let stale: Vec<&user_group_link::Model> = current
        .iter()
        .filter(|link| !desired.contains(&anchor.other_end(link)))
        .collect();
    if !stale.is_empty() {
        user_group_link::Entity::delete_many()
            .filter(user_group_link::Column::Id.is_in(stale.iter().map(|l| l.id)))
            .exec(txn)
            .await?;
        result.removed = stale.iter().map(|l| anchor.other_end(l)).collect();
    }

    let links = Crud::<user_group_link::Entity>::new();
    for other in desired {
        let (group_id, user_id) = anchor.pair(other);
        if check_associated_records::<user_group_link::Entity, _>(txn, group_id, user_id)
            .await?
            .is_some()
        {
            continue;
        }
        links
            .create(
                txn,
                user_group_link::ActiveModel {
                    group_id: Set(group_id),
                    user_id: Set(user_id),
                    ..Default::default()
                },
            )
            .await?;
        result.added.push(other);
    }

    tracing::info!(
        anchor = %anchor.id(),
        added = result.added.len(),
        removed = result.removed.len(),
        "Reconciled group membership"
    );
    Ok(result)
}
