//! Key-value store collaborator.
//!
//! The engine never reaches for ambient storage: a [`KeyValueStore`] is
//! injected through [`EngineBuilder::store`](crate::EngineBuilder::store).
//! Every stored value carries a revision so writers can detect that somebody
//! else wrote in between their read and their write.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Mutex, PoisonError},
};

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseConnection, DbErr, QueryFilter, SqlErr, prelude::*, sea_query::Expr,
};
use serde_json::Value;

use crate::{StorageError, kv_entries};

type ResultStorage<T> = Result<T, StorageError>;

/// A stored value and the revision it was read at.
#[derive(Clone, Debug, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub revision: u64,
}

/// Asynchronous get/set/remove store with compare-and-swap writes.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = ResultStorage<Option<Versioned<Value>>>> + Send;

    /// Writes `value` and returns its new revision.
    ///
    /// `expected_revision` is the revision the caller read: `None` means the
    /// key must not exist yet. Any mismatch fails with
    /// [`StorageError::Conflict`] and leaves the stored value untouched.
    fn set(
        &self,
        key: &str,
        value: Value,
        expected_revision: Option<u64>,
    ) -> impl Future<Output = ResultStorage<u64>> + Send;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = ResultStorage<()>> + Send;
}

fn conflict(key: &str, expected: Option<u64>, found: Option<u64>) -> StorageError {
    StorageError::Conflict {
        key: key.to_string(),
        expected,
        found,
    }
}

/// In-process store, lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Versioned<Value>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> ResultStorage<Option<Versioned<Value>>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value, expected_revision: Option<u64>) -> ResultStorage<u64> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let found = entries.get(key).map(|entry| entry.revision);
        if found != expected_revision {
            return Err(conflict(key, expected_revision, found));
        }
        let revision = found.map_or(1, |r| r + 1);
        entries.insert(key.to_string(), Versioned { value, revision });
        Ok(revision)
    }

    async fn remove(&self, key: &str) -> ResultStorage<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Store backed by the `kv_entries` table.
#[derive(Debug, Clone)]
pub struct SqlStore {
    database: DatabaseConnection,
}

impl SqlStore {
    #[must_use]
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }

    async fn current_revision(&self, key: &str) -> ResultStorage<Option<u64>> {
        let model = kv_entries::Entity::find_by_id(key.to_string())
            .one(&self.database)
            .await?;
        model.map(|m| revision_from_db(m.revision)).transpose()
    }
}

fn revision_from_db(revision: i64) -> ResultStorage<u64> {
    u64::try_from(revision)
        .map_err(|_| DbErr::Custom(format!("negative revision {revision}")).into())
}

fn revision_to_db(revision: u64) -> ResultStorage<i64> {
    i64::try_from(revision)
        .map_err(|_| DbErr::Custom(format!("revision {revision} out of range")).into())
}

impl KeyValueStore for SqlStore {
    async fn get(&self, key: &str) -> ResultStorage<Option<Versioned<Value>>> {
        let Some(model) = kv_entries::Entity::find_by_id(key.to_string())
            .one(&self.database)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(Versioned {
            value: serde_json::from_str(&model.value)?,
            revision: revision_from_db(model.revision)?,
        }))
    }

    async fn set(&self, key: &str, value: Value, expected_revision: Option<u64>) -> ResultStorage<u64> {
        let payload = serde_json::to_string(&value)?;

        match expected_revision {
            None => {
                let entry = kv_entries::ActiveModel {
                    key: ActiveValue::Set(key.to_string()),
                    value: ActiveValue::Set(payload),
                    revision: ActiveValue::Set(1),
                    updated_at: ActiveValue::Set(Utc::now()),
                };
                match entry.insert(&self.database).await {
                    Ok(_) => Ok(1),
                    Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                        let found = self.current_revision(key).await?;
                        Err(conflict(key, None, found))
                    }
                    Err(err) => Err(err.into()),
                }
            }
            Some(expected) => {
                let next = expected + 1;
                // Single conditional UPDATE: the revision check and the write
                // cannot interleave with another writer.
                let result = kv_entries::Entity::update_many()
                    .col_expr(kv_entries::Column::Value, Expr::value(payload))
                    .col_expr(kv_entries::Column::Revision, Expr::value(revision_to_db(next)?))
                    .col_expr(kv_entries::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(kv_entries::Column::Key.eq(key))
                    .filter(kv_entries::Column::Revision.eq(revision_to_db(expected)?))
                    .exec(&self.database)
                    .await?;
                if result.rows_affected == 0 {
                    let found = self.current_revision(key).await?;
                    return Err(conflict(key, Some(expected), found));
                }
                Ok(next)
            }
        }
    }

    async fn remove(&self, key: &str) -> ResultStorage<()> {
        kv_entries::Entity::delete_by_id(key.to_string())
            .exec(&self.database)
            .await?;
        Ok(())
    }
}
