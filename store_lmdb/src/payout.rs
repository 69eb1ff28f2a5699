//! LMDB implementation of PayoutStore.
//!
//! `payouts` holds requests by id. `pending_payouts` maps `account_be(8)` to
//! `payout_be(8)` and carries at most one entry per account: it is written
//! when a request is created and removed when the request finalizes, always
//! in the same transaction, which is what makes the duplicate-pending check
//! race-free.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use merit_store::payout::PayoutStore;
use merit_store::{meta::counters, StoreError};
use merit_types::{AccountId, Amount, PayoutId, PayoutRequest};

use crate::keys::{account_key, payout_key};
use crate::LmdbError;

pub struct LmdbPayoutStore {
    pub(crate) env: Arc<Env>,
    pub(crate) payouts_db: Database<Bytes, Bytes>,
    pub(crate) pending_payouts_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl PayoutStore for LmdbPayoutStore {
    fn get_payout(&self, id: PayoutId) -> Result<PayoutRequest, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .payouts_db
            .get(&rtxn, &payout_key(id)[..])
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("payout request {}", id)))?;
        let request: PayoutRequest = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(request)
    }

    fn pending_for_account(&self, account: AccountId) -> Result<Option<PayoutId>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .pending_payouts_db
            .get(&rtxn, &account_key(account)[..])
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

    fn oldest_pending(&self) -> Result<Option<PayoutRequest>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .pending_payouts_db
            .iter(&rtxn)
            .map_err(LmdbError::from)?;

        let mut oldest: Option<PayoutRequest> = None;
        for result in iter {
            let (_key, val) = result.map_err(LmdbError::from)?;
            let arr: [u8; 8] = val.try_into().map_err(|_| {
                LmdbError::Serialization("malformed pending payout entry".to_string())
            })?;
            let id = PayoutId::new(u64::from_be_bytes(arr));

            let bytes = self
                .payouts_db
                .get(&rtxn, &payout_key(id)[..])
                .map_err(LmdbError::from)?
                .ok_or_else(|| {
                    LmdbError::NotFound(format!("payout {} behind pending entry", id))
                })?;
            let request: PayoutRequest = bincode::deserialize(bytes).map_err(LmdbError::from)?;

            let is_older = match &oldest {
                None => true,
                Some(prev) => {
                    (request.created_at, request.id) < (prev.created_at, prev.id)
                }
            };
            if is_older {
                oldest = Some(request);
            }
        }
        Ok(oldest)
    }

    fn pending_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self
            .pending_payouts_db
            .len(&rtxn)
            .map_err(LmdbError::from)?;
        Ok(count)
    }

    fn total_paid(&self) -> Result<Amount, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, counters::PAID_MICROS_TOTAL.as_bytes())
            .map_err(LmdbError::from)?;
        let micros = val
            .and_then(|b| b.try_into().ok().map(u64::from_be_bytes))
            .unwrap_or(0);
        Ok(Amount::from_micros(micros))
    }
}
