//! Payout request storage trait.

use crate::StoreError;
use merit_types::{AccountId, Amount, PayoutId, PayoutRequest};

/// Trait for payout request storage.
///
/// The pending index (`pending_for_account`) is the structural guarantee
/// behind the one-pending-request-per-account rule: backends keep at most one
/// entry per account and maintain it in the same transaction as the request
/// record itself.
pub trait PayoutStore {
    fn get_payout(&self, id: PayoutId) -> Result<PayoutRequest, StoreError>;

    /// The account's PENDING request id, if one exists.
    fn pending_for_account(&self, account: AccountId) -> Result<Option<PayoutId>, StoreError>;

    /// The PENDING request that has waited longest, if any.
    fn oldest_pending(&self) -> Result<Option<PayoutRequest>, StoreError>;

    fn pending_count(&self) -> Result<u64, StoreError>;

    /// Sum of all PAID request amounts, maintained as a running counter.
    fn total_paid(&self) -> Result<Amount, StoreError>;
}
