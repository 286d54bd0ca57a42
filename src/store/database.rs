use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{Record, RecordStore};
use crate::entities::record;
use crate::errors::StoreError;

/// Rows per INSERT; keeps bound parameters under SQLite's limit.
const INSERT_BATCH: usize = 100;

/// Stores each record as one row of the shared `records` table, partitioned
/// by collection name. The `(collection, unique_key)` index enforces product
/// code uniqueness at the database level as well.
pub struct DatabaseRecordStore<T> {
    db: Arc<DatabaseConnection>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> DatabaseRecordStore<T> {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            _record: PhantomData,
        }
    }

    fn to_row(position: usize, record: &T) -> Result<record::ActiveModel, StoreError> {
        Ok(record::ActiveModel {
            collection: Set(T::COLLECTION.to_string()),
            id: Set(record.id()),
            position: Set(position as i64),
            unique_key: Set(record.unique_key().map(str::to_string)),
            body: Set(serde_json::to_value(record)?),
        })
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for DatabaseRecordStore<T> {
    async fn load_all(&self) -> Vec<T> {
        let rows = match record::Entity::find()
            .filter(record::Column::Collection.eq(T::COLLECTION))
            .order_by_asc(record::Column::Position)
            .all(&*self.db)
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                warn!(
                    collection = T::COLLECTION,
                    error = %err,
                    "Failed to load collection from database; starting empty"
                );
                return Vec::new();
            }
        };

        rows.into_iter()
            .filter_map(|row| match serde_json::from_value::<T>(row.body) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(
                        collection = T::COLLECTION,
                        id = %row.id,
                        error = %err,
                        "Skipping undecodable record"
                    );
                    None
                }
            })
            .collect()
    }

    async fn persist(&self, records: &[T]) -> Result<(), StoreError> {
        let rows = records
            .iter()
            .enumerate()
            .map(|(position, record)| Self::to_row(position, record))
            .collect::<Result<Vec<_>, _>>()?;

        let txn = self.db.begin().await?;

        record::Entity::delete_many()
            .filter(record::Column::Collection.eq(T::COLLECTION))
            .exec(&txn)
            .await?;

        for batch in rows.chunks(INSERT_BATCH) {
            record::Entity::insert_many(batch.to_vec())
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;

        debug!(
            collection = T::COLLECTION,
            count = records.len(),
            "Persisted collection"
        );
        Ok(())
    }
}
