//! Review history storage trait.

use crate::StoreError;
use merit_types::{AccountId, HistoryId, HistoryRecord, ReviewStatus};

/// Trait for the append-only review history.
///
/// Records are immutable once written; there is deliberately no update or
/// delete operation here.
pub trait HistoryStore {
    fn get_record(&self, id: HistoryId) -> Result<HistoryRecord, StoreError>;

    /// Records for one account, newest first, at most `limit`.
    fn history_for_account(
        &self,
        account: AccountId,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, StoreError>;

    /// How many of an account's records carry the given status.
    fn count_for_account(
        &self,
        account: AccountId,
        status: ReviewStatus,
    ) -> Result<u64, StoreError> {
        let records = self.history_for_account(account, usize::MAX)?;
        Ok(records.iter().filter(|r| r.status == status).count() as u64)
    }
}
