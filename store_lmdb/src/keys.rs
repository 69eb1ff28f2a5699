//! Binary key encodings.
//!
//! Every numeric key component is big-endian so LMDB's lexicographic byte
//! order equals numeric order. Database layouts:
//!
//! - `accounts`:        `account_be(8)` → bincode [`merit_types::Account`]
//! - `queue`:           `item_be(8)` → bincode [`merit_types::QueueItem`]
//! - `queue_index`:     `submitted_at_be(8) ++ item_be(8)` → empty.
//!   Plain iteration order is oldest-first FIFO; the id suffix makes
//!   same-second submissions deterministic.
//! - `history`:         `history_be(8)` → bincode [`merit_types::HistoryRecord`]
//! - `history_index`:   `account_be(8) ++ history_be(8)` → empty
//! - `payouts`:         `payout_be(8)` → bincode [`merit_types::PayoutRequest`]
//! - `pending_payouts`: `account_be(8)` → `payout_be(8)`, at most one entry
//!   per account
//! - `meta`:            utf8 key → `u64_be(8)` counters (plus the schema
//!   version)

use merit_types::{AccountId, HistoryId, ItemId, PayoutId, Timestamp};

pub(crate) fn account_key(id: AccountId) -> [u8; 8] {
    id.raw().to_be_bytes()
}

pub(crate) fn item_key(id: ItemId) -> [u8; 8] {
    id.raw().to_be_bytes()
}

pub(crate) fn payout_key(id: PayoutId) -> [u8; 8] {
    id.raw().to_be_bytes()
}

pub(crate) fn history_key(id: HistoryId) -> [u8; 8] {
    id.raw().to_be_bytes()
}

/// `submitted_at_be(8) ++ item_be(8)` for `queue_index`.
pub(crate) fn queue_index_key(submitted_at: Timestamp, id: ItemId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&submitted_at.as_secs().to_be_bytes());
    key[8..].copy_from_slice(&id.raw().to_be_bytes());
    key
}

/// Item id recovered from a `queue_index` key.
pub(crate) fn item_id_from_index_key(key: &[u8]) -> Option<ItemId> {
    if key.len() != 16 {
        return None;
    }
    let arr: [u8; 8] = key[8..].try_into().ok()?;
    Some(ItemId::new(u64::from_be_bytes(arr)))
}

/// `account_be(8) ++ history_be(8)` for `history_index`.
pub(crate) fn history_index_key(account: AccountId, id: HistoryId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&account.raw().to_be_bytes());
    key[8..].copy_from_slice(&id.raw().to_be_bytes());
    key
}

/// History id recovered from a `history_index` key.
pub(crate) fn history_id_from_index_key(key: &[u8]) -> Option<HistoryId> {
    if key.len() != 16 {
        return None;
    }
    let arr: [u8; 8] = key[8..].try_into().ok()?;
    Some(HistoryId::new(u64::from_be_bytes(arr)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_index_orders_by_time_then_id() {
        let a = queue_index_key(Timestamp::new(100), ItemId::new(9));
        let b = queue_index_key(Timestamp::new(100), ItemId::new(10));
        let c = queue_index_key(Timestamp::new(101), ItemId::new(1));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn index_key_roundtrip() {
        let key = queue_index_key(Timestamp::new(42), ItemId::new(7));
        assert_eq!(item_id_from_index_key(&key), Some(ItemId::new(7)));
        assert_eq!(item_id_from_index_key(&key[..10]), None);

        let key = history_index_key(AccountId::new(3), HistoryId::new(11));
        assert_eq!(history_id_from_index_key(&key), Some(HistoryId::new(11)));
    }
}
