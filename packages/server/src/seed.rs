use anyhow::{Context, Result};
use sea_orm::sea_query::{Index, MysqlQueryBuilder, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::config::AuthConfig;
use crate::crud::Crud;
use crate::entity::{user, user_group_link};
use crate::utils::hash;

const LINK_PAIR_INDEX: &str = "idx_user_group_link_pair";

/// Ensure indexes that schema sync cannot express exist.
///
/// Schema sync only handles single-column uniqueness, so the composite
/// `(group_id, user_id)` constraint on links is created here.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name(LINK_PAIR_INDEX)
        .table(user_group_link::Entity)
        .col(user_group_link::Column::GroupId)
        .col(user_group_link::Column::UserId)
        .to_owned();

    let sql = match db.get_database_backend() {
        DbBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
        DbBackend::MySql => stmt.to_string(MysqlQueryBuilder),
        _ => stmt.to_string(PostgresQueryBuilder),
    };

    // Link-pair uniqueness depends on this index; startup fails without it.
    if let Err(e) = db.execute_unprepared(&sql).await {
        tracing::error!("Failed to create index {LINK_PAIR_INDEX}: {e}");
        return Err(e);
    }
    info!("Ensured index {LINK_PAIR_INDEX} exists");
    Ok(())
}

/// Create the configured superuser unless an account with that email exists.
///
/// Does nothing when either `superuser_email` or `superuser_password` is unset.
pub async fn seed_superuser(db: &DatabaseConnection, auth: &AuthConfig) -> Result<()> {
    let (Some(email), Some(password)) = (&auth.superuser_email, &auth.superuser_password) else {
        return Ok(());
    };
    let email = email.trim().to_lowercase();

    let users = Crud::<user::Entity>::new();
    if !users
        .read_by_column(db, "email", email.as_str(), 0, 1)
        .await?
        .is_none()
    {
        info!(%email, "Superuser already present");
        return Ok(());
    }

    let hashed = hash::hash_password(password).context("hashing superuser password")?;
    let created = users
        .create(
            db,
            user::ActiveModel {
                email: Set(email.clone()),
                hashed_password: Set(hashed),
                is_active: Set(true),
                is_verified: Set(true),
                is_superuser: Set(true),
                role_id: Set(None),
                profile_id: Set(None),
                ..Default::default()
            },
        )
        .await;

    match created {
        Ok(user) => info!(user_id = %user.id, %email, "Seeded superuser"),
        // Another instance won the race.
        Err(e) if e.is_unique_violation() => info!(%email, "Superuser already present"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
