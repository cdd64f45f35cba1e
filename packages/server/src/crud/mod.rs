//! Entity-parameterized data access.
//!
//! [`Crud<E>`] wraps the create/read/update/delete cycle for one entity and
//! runs against anything implementing [`ConnectionTrait`], so the same helper
//! works on the pool or inside an open [`DatabaseTransaction`]. Relationship
//! names are checked once, when the helper is built.

mod error;
mod link;
mod resource;

use std::collections::{BTreeMap, HashSet};
use std::marker::PhantomData;
use std::ops::Deref;
use std::str::FromStr;

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

pub use error::CrudError;
pub use link::{Link, check_associated_records};
pub use resource::Resource;

/// A record together with the relationships that were eager-loaded for it.
#[derive(Debug, Clone, Serialize)]
pub struct Loaded<M> {
    #[serde(flatten)]
    pub record: M,
    #[serde(flatten)]
    pub related: BTreeMap<&'static str, serde_json::Value>,
}

impl<M> Loaded<M> {
    fn bare(record: M) -> Self {
        Self {
            record,
            related: BTreeMap::new(),
        }
    }

    /// Decode one loaded relationship. `None` when it was not loaded or is null.
    pub fn related_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CrudError> {
        match self.related.get(name) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| CrudError::Db(DbErr::Json(e.to_string()))),
        }
    }

    pub fn into_inner(self) -> M {
        self.record
    }
}

impl<M> Deref for Loaded<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.record
    }
}

/// Outcome of a column lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Found<M> {
    None,
    One(M),
    Many(Vec<M>),
}

impl<M> Found<M> {
    pub fn is_none(&self) -> bool {
        matches!(self, Found::None)
    }

    pub fn into_vec(self) -> Vec<M> {
        match self {
            Found::None => Vec::new(),
            Found::One(m) => vec![m],
            Found::Many(v) => v,
        }
    }
}

/// Value to match in [`Crud::read_by_column`].
///
/// Text compares case-insensitively; everything else by equality.
#[derive(Debug, Clone)]
pub enum ColumnValue {
    Text(String),
    Exact(Value),
}

impl From<&str> for ColumnValue {
    fn from(s: &str) -> Self {
        ColumnValue::Text(s.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(s: String) -> Self {
        ColumnValue::Text(s)
    }
}

impl From<Uuid> for ColumnValue {
    fn from(id: Uuid) -> Self {
        ColumnValue::Exact(id.into())
    }
}

impl From<bool> for ColumnValue {
    fn from(b: bool) -> Self {
        ColumnValue::Exact(b.into())
    }
}

impl From<i64> for ColumnValue {
    fn from(n: i64) -> Self {
        ColumnValue::Exact(n.into())
    }
}

impl From<Value> for ColumnValue {
    fn from(v: Value) -> Self {
        ColumnValue::Exact(v)
    }
}

pub struct Crud<E: Resource> {
    relationships: Vec<&'static str>,
    _entity: PhantomData<E>,
}

impl<E: Resource> Default for Crud<E> {
    fn default() -> Self {
        Self {
            relationships: Vec::new(),
            _entity: PhantomData,
        }
    }
}

impl<E> Crud<E>
where
    E: Resource,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = Uuid>,
    E::Model: IntoActiveModel<E::ActiveModel> + Serialize + Sync,
    E::ActiveModel: Send,
{
    /// A helper that never eager-loads.
    pub fn new() -> Self {
        Self::default()
    }

    /// A helper that eager-loads `names` when a read asks for joins.
    ///
    /// Every name must be one of `E::RELATIONSHIPS`.
    pub fn with_relationships(names: &[&str]) -> Result<Self, CrudError> {
        let mut relationships = Vec::with_capacity(names.len());
        for name in names {
            let declared = E::RELATIONSHIPS
                .iter()
                .find(|declared| **declared == *name)
                .ok_or_else(|| CrudError::UnknownRelationship {
                    entity: entity_name::<E>(),
                    relationship: ToString::to_string(*name),
                })?;
            relationships.push(*declared);
        }
        Ok(Self {
            relationships,
            _entity: PhantomData,
        })
    }

    pub fn relationships(&self) -> &[&'static str] {
        &self.relationships
    }

    /// Insert a new record, assigning its id and timestamps.
    pub async fn create<C>(&self, db: &C, mut record: E::ActiveModel) -> Result<E::Model, CrudError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        stamp::<E>(&mut record, true);

        let txn = db.begin().await?;
        let model = record.insert(&txn).await?;
        txn.commit().await?;

        tracing::debug!(entity = entity_name::<E>(), id = %E::identity(&model), "Created record");
        Ok(model)
    }

    /// Build an active model from a flat JSON object of column values.
    ///
    /// Keys that are not columns of `E` are rejected. Absent keys stay unset.
    pub fn from_attributes(&self, attributes: serde_json::Value) -> Result<E::ActiveModel, CrudError>
    where
        E::Model: DeserializeOwned,
        E::ActiveModel: TryIntoModel<E::Model>,
    {
        let Some(map) = attributes.as_object() else {
            return Err(CrudError::UnknownAttribute {
                entity: entity_name::<E>(),
                attribute: "<not an object>".into(),
            });
        };
        if let Some(unknown) = map.keys().find(|key| E::Column::from_str(key).is_err()) {
            return Err(CrudError::UnknownAttribute {
                entity: entity_name::<E>(),
                attribute: unknown.clone(),
            });
        }
        Ok(E::ActiveModel::from_json(attributes)?)
    }

    /// Page through all records in store order.
    ///
    /// `limit == 0` means no cap. With `join_relationships`, each record
    /// carries every relationship this helper was built with.
    pub async fn read_all<C: ConnectionTrait>(
        &self,
        db: &C,
        skip: u64,
        limit: u64,
        join_relationships: bool,
    ) -> Result<Vec<Loaded<E::Model>>, CrudError> {
        let records = paged(E::find(), skip, limit).all(db).await?;
        self.attach(db, dedupe::<E>(records), join_relationships)
            .await
    }

    pub async fn read_by_primary_key<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
        join_relationships: bool,
    ) -> Result<Loaded<E::Model>, CrudError> {
        let record = find_existing::<E, _>(db, id).await?;
        let mut loaded = self.attach(db, vec![record], join_relationships).await?;
        loaded
            .pop()
            .ok_or_else(|| CrudError::NotFound(format!("{} {id}", entity_name::<E>())))
    }

    /// Look records up by an arbitrary column, named at runtime.
    pub async fn read_by_column<C: ConnectionTrait>(
        &self,
        db: &C,
        column_name: &str,
        value: impl Into<ColumnValue>,
        skip: u64,
        limit: u64,
    ) -> Result<Found<E::Model>, CrudError> {
        let column = E::Column::from_str(column_name).map_err(|_| CrudError::UnknownColumn {
            entity: entity_name::<E>(),
            column: column_name.to_string(),
        })?;

        let condition = match value.into() {
            ColumnValue::Text(text) => Expr::expr(Func::lower(Expr::col(column)))
                .eq(Func::lower(Expr::val(text))),
            ColumnValue::Exact(value) => column.eq(value),
        };

        let mut records = dedupe::<E>(
            paged(E::find().filter(condition), skip, limit)
                .all(db)
                .await?,
        );
        Ok(match records.len() {
            0 => Found::None,
            1 => Found::One(records.remove(0)),
            _ => Found::Many(records),
        })
    }

    /// Overwrite the fields that are `Set` in `changes`; everything else keeps
    /// its stored value. The identity column is never touched.
    pub async fn update<C>(&self, db: &C, id: Uuid, changes: E::ActiveModel) -> Result<E::Model, CrudError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let txn = db.begin().await?;
        let existing = find_existing::<E, _>(&txn, id).await?;

        let mut record = existing.into_active_model();
        for column in E::Column::iter() {
            if column.as_str() == "id" {
                continue;
            }
            if let ActiveValue::Set(value) = changes.get(column) {
                record.set(column, value);
            }
        }
        stamp::<E>(&mut record, false);

        let model = record.update(&txn).await?;
        txn.commit().await?;
        Ok(model)
    }

    /// Returns `true` when a row was removed.
    pub async fn delete<C>(&self, db: &C, id: Uuid) -> Result<bool, CrudError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let txn = db.begin().await?;
        find_existing::<E, _>(&txn, id).await?;
        let result = E::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        tracing::debug!(entity = entity_name::<E>(), %id, "Deleted record");
        Ok(result.rows_affected > 0)
    }

    async fn attach<C: ConnectionTrait>(
        &self,
        db: &C,
        records: Vec<E::Model>,
        join_relationships: bool,
    ) -> Result<Vec<Loaded<E::Model>>, CrudError> {
        if !join_relationships || self.relationships.is_empty() || records.is_empty() {
            return Ok(records.into_iter().map(Loaded::bare).collect());
        }

        let mut related = vec![BTreeMap::new(); records.len()];
        for &name in &self.relationships {
            let values = E::load_related(name, db, &records).await?;
            for (slot, value) in related.iter_mut().zip(values) {
                slot.insert(name, value);
            }
        }

        Ok(records
            .into_iter()
            .zip(related)
            .map(|(record, related)| Loaded { record, related })
            .collect())
    }
}

fn entity_name<E: EntityTrait>() -> &'static str {
    E::default().table_name()
}

async fn find_existing<E, C>(db: &C, id: Uuid) -> Result<E::Model, CrudError>
where
    E: EntityTrait,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = Uuid>,
    C: ConnectionTrait,
{
    E::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| CrudError::NotFound(format!("{} {id}", entity_name::<E>())))
}

fn paged<E: EntityTrait>(query: Select<E>, skip: u64, limit: u64) -> Select<E> {
    match (skip, limit) {
        (0, 0) => query,
        // SQLite rejects OFFSET without LIMIT.
        (skip, 0) => query.offset(skip).limit(i64::MAX as u64),
        (skip, limit) => query.offset(skip).limit(limit),
    }
}

fn dedupe<E: Resource>(records: Vec<E::Model>) -> Vec<E::Model> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(E::identity(record)))
        .collect()
}

/// Fill `id` (when unset) and the timestamp columns.
fn stamp<E: EntityTrait>(record: &mut E::ActiveModel, fresh: bool) {
    let now = Utc::now();
    for column in E::Column::iter() {
        match column.as_str() {
            "id" if fresh && record.get(column).is_not_set() => {
                record.set(column, Uuid::now_v7().into());
            }
            "created_at" if fresh => record.set(column, now.into()),
            "updated_at" => record.set(column, now.into()),
            _ => {}
        }
    }
}
