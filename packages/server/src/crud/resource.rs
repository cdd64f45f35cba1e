use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sea_orm::*;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::entity::{group, role, upload, user, user_group_link, user_profile};

/// An entity the generic CRUD helper can manage.
///
/// `RELATIONSHIPS` names what `load_related` can attach to a batch of
/// records. Loaded values are JSON so a single read can mix to-one (object
/// or null) and to-many (array) relationships.
#[async_trait]
pub trait Resource: EntityTrait {
    const RELATIONSHIPS: &'static [&'static str];

    fn identity(model: &Self::Model) -> Uuid;

    /// Load `relationship` for every record, returning one value per record
    /// in the same order.
    async fn load_related<C: ConnectionTrait>(
        relationship: &str,
        db: &C,
        records: &[Self::Model],
    ) -> Result<Vec<Value>, DbErr>;
}

fn to_json<T: Serialize>(items: Vec<T>) -> Result<Vec<Value>, DbErr> {
    items
        .into_iter()
        .map(|item| serde_json::to_value(item).map_err(|e| DbErr::Json(e.to_string())))
        .collect()
}

fn undeclared(entity: &str, relationship: &str) -> DbErr {
    DbErr::Custom(format!("{entity} has no relationship '{relationship}'"))
}

/// Resolve per-record link rows to the groups they point at.
async fn groups_behind<C: ConnectionTrait>(
    db: &C,
    links: Vec<Vec<user_group_link::Model>>,
) -> Result<Vec<Value>, DbErr> {
    let ids: HashSet<Uuid> = links.iter().flatten().map(|l| l.group_id).collect();
    let groups: HashMap<Uuid, group::Model> = if ids.is_empty() {
        HashMap::new()
    } else {
        group::Entity::find()
            .filter(group::Column::Id.is_in(ids))
            .all(db)
            .await?
            .into_iter()
            .map(|g| (g.id, g))
            .collect()
    };

    to_json(
        links
            .into_iter()
            .map(|row| {
                row.iter()
                    .filter_map(|l| groups.get(&l.group_id))
                    .collect::<Vec<_>>()
            })
            .collect(),
    )
}

/// Resolve per-record link rows to the users they point at.
async fn users_behind<C: ConnectionTrait>(
    db: &C,
    links: Vec<Vec<user_group_link::Model>>,
) -> Result<Vec<Value>, DbErr> {
    let ids: HashSet<Uuid> = links.iter().flatten().map(|l| l.user_id).collect();
    let users: HashMap<Uuid, user::Model> = if ids.is_empty() {
        HashMap::new()
    } else {
        user::Entity::find()
            .filter(user::Column::Id.is_in(ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect()
    };

    to_json(
        links
            .into_iter()
            .map(|row| {
                row.iter()
                    .filter_map(|l| users.get(&l.user_id))
                    .collect::<Vec<_>>()
            })
            .collect(),
    )
}

#[async_trait]
impl Resource for user::Entity {
    const RELATIONSHIPS: &'static [&'static str] = &["role", "profile", "groups", "uploads"];

    fn identity(model: &user::Model) -> Uuid {
        model.id
    }

    async fn load_related<C: ConnectionTrait>(
        relationship: &str,
        db: &C,
        records: &[user::Model],
    ) -> Result<Vec<Value>, DbErr> {
        match relationship {
            "role" => to_json(records.load_one(role::Entity, db).await?),
            "profile" => to_json(records.load_one(user_profile::Entity, db).await?),
            "uploads" => to_json(records.load_many(upload::Entity, db).await?),
            "groups" => {
                let links = records.load_many(user_group_link::Entity, db).await?;
                groups_behind(db, links).await
            }
            other => Err(undeclared("user", other)),
        }
    }
}

#[async_trait]
impl Resource for role::Entity {
    const RELATIONSHIPS: &'static [&'static str] = &["users"];

    fn identity(model: &role::Model) -> Uuid {
        model.id
    }

    async fn load_related<C: ConnectionTrait>(
        relationship: &str,
        db: &C,
        records: &[role::Model],
    ) -> Result<Vec<Value>, DbErr> {
        match relationship {
            "users" => to_json(records.load_many(user::Entity, db).await?),
            other => Err(undeclared("role", other)),
        }
    }
}

#[async_trait]
impl Resource for user_profile::Entity {
    const RELATIONSHIPS: &'static [&'static str] = &["user"];

    fn identity(model: &user_profile::Model) -> Uuid {
        model.id
    }

    async fn load_related<C: ConnectionTrait>(
        relationship: &str,
        db: &C,
        records: &[user_profile::Model],
    ) -> Result<Vec<Value>, DbErr> {
        match relationship {
            "user" => to_json(records.load_one(user::Entity, db).await?),
            other => Err(undeclared("user_profile", other)),
        }
    }
}

#[async_trait]
impl Resource for group::Entity {
    const RELATIONSHIPS: &'static [&'static str] = &["users"];

    fn identity(model: &group::Model) -> Uuid {
        model.id
    }

    async fn load_related<C: ConnectionTrait>(
        relationship: &str,
        db: &C,
        records: &[group::Model],
    ) -> Result<Vec<Value>, DbErr> {
        match relationship {
            "users" => {
                let links = records.load_many(user_group_link::Entity, db).await?;
                users_behind(db, links).await
            }
            other => Err(undeclared("group", other)),
        }
    }
}

#[async_trait]
impl Resource for user_group_link::Entity {
    const RELATIONSHIPS: &'static [&'static str] = &["user", "group"];

    fn identity(model: &user_group_link::Model) -> Uuid {
        model.id
    }

    async fn load_related<C: ConnectionTrait>(
        relationship: &str,
        db: &C,
        records: &[user_group_link::Model],
    ) -> Result<Vec<Value>, DbErr> {
        match relationship {
            "user" => to_json(records.load_one(user::Entity, db).await?),
            "group" => to_json(records.load_one(group::Entity, db).await?),
            other => Err(undeclared("user_group_link", other)),
        }
    }
}

#[async_trait]
impl Resource for upload::Entity {
    const RELATIONSHIPS: &'static [&'static str] = &["user"];

    fn identity(model: &upload::Model) -> Uuid {
        model.id
    }

    async fn load_related<C: ConnectionTrait>(
        relationship: &str,
        db: &C,
        records: &[upload::Model],
    ) -> Result<Vec<Value>, DbErr> {
        match relationship {
            "user" => to_json(records.load_one(user::Entity, db).await?),
            other => Err(undeclared("upload", other)),
        }
    }
}
