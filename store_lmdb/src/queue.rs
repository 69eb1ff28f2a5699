//! LMDB implementation of QueueStore.
//!
//! Two databases: `queue` holds the items by id, `queue_index` holds
//! `submitted_at_be(8) ++ item_be(8)` keys whose plain byte order is the
//! oldest-first submission order. Both are always mutated in the same write
//! transaction (see `WriteBatch`), so an index entry exists iff its item does.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use merit_store::queue::QueueStore;
use merit_store::StoreError;
use merit_types::{AccountId, ItemId, QueueItem};

use crate::keys::{item_id_from_index_key, item_key};
use crate::LmdbError;

pub struct LmdbQueueStore {
    pub(crate) env: Arc<Env>,
    pub(crate) queue_db: Database<Bytes, Bytes>,
    pub(crate) queue_index_db: Database<Bytes, Bytes>,
}

impl QueueStore for LmdbQueueStore {
    fn get_item(&self, id: ItemId) -> Result<QueueItem, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .queue_db
            .get(&rtxn, &item_key(id)[..])
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("queue item {}", id)))?;
        let item: QueueItem = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(item)
    }

    fn queue_len(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.queue_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }

    fn iter_oldest_first(&self) -> Result<Vec<QueueItem>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.queue_index_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for result in iter {
            let (key, _) = result.map_err(LmdbError::from)?;
            let id = item_id_from_index_key(key).ok_or_else(|| {
                LmdbError::Serialization("malformed queue index key".to_string())
            })?;
            let val = self
                .queue_db
                .get(&rtxn, &item_key(id)[..])
                .map_err(LmdbError::from)?
                .ok_or_else(|| {
                    LmdbError::NotFound(format!("queue item {} behind index entry", id))
                })?;
            let item: QueueItem = bincode::deserialize(val).map_err(LmdbError::from)?;
            results.push(item);
        }
        Ok(results)
    }

    fn count_for_account(&self, account: AccountId) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.queue_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut count = 0u64;
        for result in iter {
            let (_key, val) = result.map_err(LmdbError::from)?;
            let item: QueueItem = bincode::deserialize(val).map_err(LmdbError::from)?;
            if item.account == account {
                count += 1;
            }
        }
        Ok(count)
    }
}
