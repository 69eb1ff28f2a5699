//! Write batching: groups multiple store operations into a single LMDB write
//! transaction, amortising the cost of the fsync that each commit performs.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = env.write_batch()?;
//! let id = batch.next_item_id()?;
//! batch.put_queue_item(&item)?;
//! batch.put_account(&account)?;
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).
//!
//! Reads through the batch observe its own uncommitted writes, which is what
//! every read-modify-write ledger operation builds on. LMDB serializes write
//! transactions, so two racing batches never interleave: the second begins
//! only after the first committed or rolled back.

use heed::RwTxn;

use merit_store::meta::counters;
use merit_store::StoreError;
use merit_types::{
    Account, AccountId, Amount, HistoryId, HistoryRecord, ItemId, PayoutId, PayoutRequest,
    QueueItem,
};

use crate::environment::LmdbEnvironment;
use crate::keys::{
    account_key, history_index_key, history_key, item_id_from_index_key, item_key, payout_key,
    queue_index_key,
};
use crate::LmdbError;

/// A write batch that groups multiple store operations into a single LMDB
/// write transaction, amortising the cost of the fsync.
pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    env: &'a LmdbEnvironment,
}

impl<'a> WriteBatch<'a> {
    /// Begin a new write batch.
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().write_txn().map_err(LmdbError::from)?;
        Ok(Self { txn, env })
    }

    // ── Account operations ──────────────────────────────────────────────

    /// Read an account inside this batch (sees uncommitted writes).
    pub fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let val = self
            .env
            .accounts_db
            .get(&self.txn, &account_key(id)[..])
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }

    /// Put an account into the batch, serialising it automatically.
    pub fn put_account(&mut self, account: &Account) -> Result<(), StoreError> {
        let bytes = bincode::serialize(account).map_err(LmdbError::from)?;
        self.env
            .accounts_db
            .put(&mut self.txn, &account_key(account.id)[..], &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Queue operations ────────────────────────────────────────────────

    /// Read a queue item inside this batch.
    pub fn get_queue_item(&self, id: ItemId) -> Result<Option<QueueItem>, StoreError> {
        let val = self
            .env
            .queue_db
            .get(&self.txn, &item_key(id)[..])
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }

    /// All queued item ids in oldest-first submission order, as seen by this
    /// batch. The claim scan walks this.
    pub fn queued_item_ids(&self) -> Result<Vec<ItemId>, StoreError> {
        let iter = self
            .env
            .queue_index_db
            .iter(&self.txn)
            .map_err(LmdbError::from)?;
        let mut ids = Vec::new();
        for result in iter {
            let (key, _) = result.map_err(LmdbError::from)?;
            let id = item_id_from_index_key(key).ok_or_else(|| {
                LmdbError::Serialization("malformed queue index key".to_string())
            })?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Insert a new queue item and its FIFO index entry.
    pub fn put_queue_item(&mut self, item: &QueueItem) -> Result<(), StoreError> {
        let bytes = bincode::serialize(item).map_err(LmdbError::from)?;
        self.env
            .queue_db
            .put(&mut self.txn, &item_key(item.id)[..], &bytes)
            .map_err(LmdbError::from)?;
        self.env
            .queue_index_db
            .put(
                &mut self.txn,
                &queue_index_key(item.submitted_at, item.id)[..],
                &[],
            )
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Rewrite an existing queue item (claim changes). The index entry is
    /// keyed by `(submitted_at, id)`, both immutable, so it stays put.
    pub fn update_queue_item(&mut self, item: &QueueItem) -> Result<(), StoreError> {
        let bytes = bincode::serialize(item).map_err(LmdbError::from)?;
        self.env
            .queue_db
            .put(&mut self.txn, &item_key(item.id)[..], &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Remove a queue item and its FIFO index entry.
    pub fn delete_queue_item(&mut self, item: &QueueItem) -> Result<(), StoreError> {
        self.env
            .queue_db
            .delete(&mut self.txn, &item_key(item.id)[..])
            .map_err(LmdbError::from)?;
        self.env
            .queue_index_db
            .delete(
                &mut self.txn,
                &queue_index_key(item.submitted_at, item.id)[..],
            )
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── History operations ──────────────────────────────────────────────

    /// Append a history record and its per-account index entry.
    pub fn put_history(&mut self, record: &HistoryRecord) -> Result<(), StoreError> {
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        self.env
            .history_db
            .put(&mut self.txn, &history_key(record.id)[..], &bytes)
            .map_err(LmdbError::from)?;
        self.env
            .history_index_db
            .put(
                &mut self.txn,
                &history_index_key(record.account, record.id)[..],
                &[],
            )
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Payout operations ───────────────────────────────────────────────

    /// Read a payout request inside this batch.
    pub fn get_payout(&self, id: PayoutId) -> Result<Option<PayoutRequest>, StoreError> {
        let val = self
            .env
            .payouts_db
            .get(&self.txn, &payout_key(id)[..])
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }

    /// The account's PENDING payout id as seen by this batch, if any.
    pub fn pending_payout_for(
        &self,
        account: AccountId,
    ) -> Result<Option<PayoutId>, StoreError> {
        let val = self
            .env
            .pending_payouts_db
            .get(&self.txn, &account_key(account)[..])
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.try_into().map_err(|_| {
                    LmdbError::Serialization("malformed pending payout entry".to_string())
                })?;
                Ok(Some(PayoutId::new(u64::from_be_bytes(arr))))
            }
            None => Ok(None),
        }
    }

    /// Put a payout request into the batch.
    pub fn put_payout(&mut self, request: &PayoutRequest) -> Result<(), StoreError> {
        let bytes = bincode::serialize(request).map_err(LmdbError::from)?;
        self.env
            .payouts_db
            .put(&mut self.txn, &payout_key(request.id)[..], &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Mark `account` as having the PENDING request `payout`.
    pub fn set_pending_payout(
        &mut self,
        account: AccountId,
        payout: PayoutId,
    ) -> Result<(), StoreError> {
        self.env
            .pending_payouts_db
            .put(
                &mut self.txn,
                &account_key(account)[..],
                &payout.raw().to_be_bytes(),
            )
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Clear the account's pending-payout marker.
    pub fn clear_pending_payout(&mut self, account: AccountId) -> Result<(), StoreError> {
        self.env
            .pending_payouts_db
            .delete(&mut self.txn, &account_key(account)[..])
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Meta operations ─────────────────────────────────────────────────

    fn read_counter(&self, key: &str) -> Result<u64, StoreError> {
        let val = self
            .env
            .meta_db
            .get(&self.txn, key.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(val
            .and_then(|b| b.try_into().ok().map(u64::from_be_bytes))
            .unwrap_or(0))
    }

    fn write_counter(&mut self, key: &str, value: u64) -> Result<(), StoreError> {
        self.env
            .meta_db
            .put(&mut self.txn, key.as_bytes(), &value.to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn allocate_id(&mut self, key: &str) -> Result<u64, StoreError> {
        let next = self.read_counter(key)?.saturating_add(1);
        self.write_counter(key, next)?;
        Ok(next)
    }

    /// Allocate the next queue item id. Committed together with the insert
    /// that uses it, so ids are dense and never reused.
    pub fn next_item_id(&mut self) -> Result<ItemId, StoreError> {
        self.allocate_id(counters::NEXT_ITEM_ID).map(ItemId::new)
    }

    /// Allocate the next payout request id.
    pub fn next_payout_id(&mut self) -> Result<PayoutId, StoreError> {
        self.allocate_id(counters::NEXT_PAYOUT_ID).map(PayoutId::new)
    }

    /// Allocate the next history record id.
    pub fn next_history_id(&mut self) -> Result<HistoryId, StoreError> {
        self.allocate_id(counters::NEXT_HISTORY_ID)
            .map(HistoryId::new)
    }

    /// Add `delta` to a running counter (saturating).
    pub fn bump_counter(&mut self, key: &str, delta: u64) -> Result<(), StoreError> {
        let value = self.read_counter(key)?.saturating_add(delta);
        self.write_counter(key, value)
    }

    /// Add a PAID amount to the paid-total counter.
    pub fn add_paid_total(&mut self, amount: Amount) -> Result<(), StoreError> {
        self.bump_counter(counters::PAID_MICROS_TOTAL, amount.micros())
    }

    // ── Commit / rollback ───────────────────────────────────────────────

    /// Commit all batched operations in a single write transaction.
    ///
    /// This is the only fsync in the entire batch.
    pub fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
