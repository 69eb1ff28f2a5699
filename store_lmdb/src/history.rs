//! LMDB implementation of HistoryStore.
//!
//! `history` holds records by id; `history_index` holds
//! `account_be(8) ++ history_be(8)` keys so one account's records form a
//! contiguous, id-ordered range. Ids are allocated monotonically, so walking
//! the range backwards yields newest-first.

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use merit_store::history::HistoryStore;
use merit_store::StoreError;
use merit_types::{AccountId, HistoryId, HistoryRecord, ReviewStatus};

use crate::keys::{history_id_from_index_key, history_index_key, history_key};
use crate::LmdbError;

pub struct LmdbHistoryStore {
    pub(crate) env: Arc<Env>,
    pub(crate) history_db: Database<Bytes, Bytes>,
    pub(crate) history_index_db: Database<Bytes, Bytes>,
}

impl LmdbHistoryStore {
    /// Ids of an account's records, oldest first.
    fn ids_for_account(&self, account: AccountId) -> Result<Vec<HistoryId>, StoreError> {
        let lower = history_index_key(account, HistoryId::new(0));
        let upper = history_index_key(account, HistoryId::new(u64::MAX));
        let bounds = (Bound::Included(&lower[..]), Bound::Included(&upper[..]));

        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .history_index_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;
        let mut ids = Vec::new();
        for result in iter {
            let (key, _) = result.map_err(LmdbError::from)?;
            let id = history_id_from_index_key(key).ok_or_else(|| {
                LmdbError::Serialization("malformed history index key".to_string())
            })?;
            ids.push(id);
        }
        Ok(ids)
    }
}

impl HistoryStore for LmdbHistoryStore {
    fn get_record(&self, id: HistoryId) -> Result<HistoryRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .history_db
            .get(&rtxn, &history_key(id)[..])
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("history record {}", id)))?;
        let record: HistoryRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(record)
    }

    fn history_for_account(
        &self,
        account: AccountId,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, StoreError> {
        let ids = self.ids_for_account(account)?;
        let mut records = Vec::new();
        for id in ids.into_iter().rev().take(limit) {
            records.push(self.get_record(id)?);
        }
        Ok(records)
    }

    fn count_for_account(
        &self,
        account: AccountId,
        status: ReviewStatus,
    ) -> Result<u64, StoreError> {
        let ids = self.ids_for_account(account)?;
        let mut count = 0u64;
        for id in ids {
            if self.get_record(id)?.status == status {
                count += 1;
            }
        }
        Ok(count)
    }
}
