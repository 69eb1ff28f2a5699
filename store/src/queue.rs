//! Review queue storage trait.

use crate::StoreError;
use merit_types::{AccountId, ItemId, QueueItem};

/// Trait for the review queue.
///
/// Iteration order is the queue's defining property: `iter_oldest_first`
/// returns items strictly ordered by `(submitted_at, id)`, which is what the
/// claim scan and every fairness guarantee build on.
pub trait QueueStore {
    fn get_item(&self, id: ItemId) -> Result<QueueItem, StoreError>;
    fn queue_len(&self) -> Result<u64, StoreError>;

    /// All queued items, oldest submission first, ties broken by item id.
    fn iter_oldest_first(&self) -> Result<Vec<QueueItem>, StoreError>;

    /// Items a single account currently has awaiting review.
    fn count_for_account(&self, account: AccountId) -> Result<u64, StoreError> {
        let items = self.iter_oldest_first()?;
        Ok(items.iter().filter(|i| i.account == account).count() as u64)
    }
}
